use crate::areas::repository::Repository;
use anyhow::Context;
use std::io::Write;
use std::path::PathBuf;

impl Repository {
    /// Unstage `paths`; without `cached` the working files are deleted too.
    pub fn rm(&self, paths: &[PathBuf], cached: bool) -> anyhow::Result<()> {
        for path in paths {
            let removed = self
                .unstage_path(path)
                .with_context(|| format!("pathspec '{}' did not match any files", path.display()))?;

            for removed_path in removed {
                if !cached {
                    self.workspace().remove_file(&removed_path)?;
                }
                writeln!(self.writer(), "rm '{}'", removed_path.display())?;
            }
        }

        Ok(())
    }
}
