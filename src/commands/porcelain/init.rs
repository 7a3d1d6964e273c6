use crate::areas::repository::Repository;
use anyhow::Context;
use std::io::Write;
use std::path::Path;

impl Repository {
    /// Create (or re-initialize) a repository at `path` and report where.
    pub fn initialize(path: &Path, writer: Box<dyn Write>) -> anyhow::Result<Self> {
        let repository = Repository::init(path, writer).with_context(|| {
            format!("failed to initialize a repository in {}", path.display())
        })?;

        writeln!(
            repository.writer(),
            "Initialized empty arbor repository in {}",
            repository.metadata_path().display()
        )?;

        Ok(repository)
    }
}
