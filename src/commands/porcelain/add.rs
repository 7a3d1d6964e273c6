use crate::areas::repository::Repository;
use anyhow::Context;
use std::path::PathBuf;

impl Repository {
    pub fn add(&self, paths: &[PathBuf]) -> anyhow::Result<()> {
        for path in paths {
            self.stage_path(path)
                .with_context(|| format!("pathspec '{}' did not match any files", path.display()))?;
        }

        Ok(())
    }
}
