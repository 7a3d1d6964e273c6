use crate::areas::repository::Repository;
use crate::artifacts::branch::HEAD_REF_NAME;
use std::io::Write;

impl Repository {
    /// Move the current ref to `revision` (HEAD by default) and reload the
    /// index from it, keeping working files.
    pub fn reset_revision(&self, revision: Option<&str>) -> anyhow::Result<()> {
        let revision = revision.unwrap_or(HEAD_REF_NAME);
        let oid = self
            .resolve_revision(revision)?
            .ok_or_else(|| anyhow::anyhow!("unknown revision: {revision}"))?;

        self.reset(&oid)?;

        let status_info = self.status()?;
        let unstaged = status_info.unstaged().collect::<Vec<_>>();
        if !unstaged.is_empty() {
            writeln!(self.writer(), "Unstaged changes after reset:")?;
            for (path, change) in unstaged {
                writeln!(self.writer(), "{}\t{}", change.code(), path.display())?;
            }
        }

        Ok(())
    }
}
