use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use std::io::Write;

impl Repository {
    /// Switch to a branch (HEAD follows it) or to any other revision
    /// (HEAD detaches).
    pub fn checkout_revision(&self, target: &str) -> anyhow::Result<()> {
        if let Ok(branch) = BranchName::try_parse(target)
            && self.refs().branch_exists(&branch)
        {
            if self.refs().current_branch()?.as_ref() == Some(&branch) {
                writeln!(self.writer(), "Already on '{branch}'")?;
                return Ok(());
            }

            let oid = self
                .refs()
                .read_branch(&branch)?
                .ok_or_else(|| anyhow::anyhow!("branch {branch} has no commits"))?;
            self.checkout(&oid)?;
            self.refs().set_head_symbolic(&branch)?;
            tracing::info!(%branch, %oid, "switched branch");

            writeln!(self.writer(), "Switched to branch '{branch}'")?;
            return Ok(());
        }

        let oid = self
            .resolve_revision(target)?
            .ok_or_else(|| anyhow::anyhow!("pathspec '{target}' did not match any revision"))?;
        let commit = self.read_commit(&oid)?;

        self.checkout(&oid)?;
        self.refs().set_head_detached(&oid)?;
        tracing::info!(%oid, "detached HEAD");

        writeln!(
            self.writer(),
            "HEAD is now at {} {}",
            oid.to_short_oid(),
            commit.short_message()
        )?;

        Ok(())
    }
}
