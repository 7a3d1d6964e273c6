use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use colored::Colorize;
use std::io::Write;

impl Repository {
    /// Create `name` at `start_point` (HEAD by default).
    pub fn branch_create(&self, name: &str, start_point: Option<&str>) -> anyhow::Result<()> {
        let branch = BranchName::try_parse(name)?;

        let start = match start_point {
            Some(revision) => Some(
                self.resolve_revision(revision)?
                    .ok_or_else(|| anyhow::anyhow!("not a valid start point: {revision}"))?,
            ),
            None => None,
        };
        if let Some(oid) = &start {
            // branches may only point at commits
            self.read_commit(oid)?;
        }

        self.refs().create_branch(&branch, start)?;

        Ok(())
    }

    pub fn branch_delete(&self, name: &str) -> anyhow::Result<()> {
        let branch = BranchName::try_parse(name)?;
        let oid = self.refs().delete_branch(&branch)?;

        writeln!(
            self.writer(),
            "Deleted branch {branch} (was {}).",
            oid.to_short_oid()
        )?;

        Ok(())
    }

    pub fn branch_list(&self) -> anyhow::Result<()> {
        let current = self.refs().current_branch()?;

        for branch in self.refs().list_branches()? {
            if current.as_ref() == Some(&branch) {
                writeln!(self.writer(), "* {}", branch.to_string().green())?;
            } else {
                writeln!(self.writer(), "  {branch}")?;
            }
        }

        Ok(())
    }
}
