use crate::areas::refs::Head;
use crate::areas::repository::Repository;
use crate::artifacts::status::status_info::StatusInfo;
use colored::Colorize;
use std::io::Write;

impl Repository {
    pub fn print_status(&self, porcelain: bool) -> anyhow::Result<()> {
        let status_info = self.status()?;

        if porcelain {
            self.print_porcelain_status(&status_info)
        } else {
            self.print_long_status(&status_info)
        }
    }

    fn print_porcelain_status(&self, status_info: &StatusInfo) -> anyhow::Result<()> {
        for (path, change) in &status_info.changes {
            writeln!(self.writer(), "{change} {}", path.display())?;
        }
        for path in &status_info.untracked {
            writeln!(self.writer(), "?? {}", path.display())?;
        }

        Ok(())
    }

    fn print_long_status(&self, status_info: &StatusInfo) -> anyhow::Result<()> {
        match self.refs().head()? {
            Head::Symbolic(branch) => writeln!(self.writer(), "On branch {branch}")?,
            Head::Detached(oid) => {
                writeln!(self.writer(), "HEAD detached at {}", oid.to_short_oid())?
            }
        }

        if self.pending_merge()?.is_some() {
            writeln!(self.writer(), "You have unmerged paths.")?;
            writeln!(
                self.writer(),
                "  (fix conflicts and run \"arbor commit\" to conclude the merge)"
            )?;
        }

        let staged = status_info.staged().collect::<Vec<_>>();
        if !staged.is_empty() {
            writeln!(self.writer(), "\nChanges to be committed:")?;
            for (path, change) in staged {
                writeln!(self.writer(), "\t{}{}", change.label(), path.display())?;
            }
        }

        let unstaged = status_info.unstaged().collect::<Vec<_>>();
        if !unstaged.is_empty() {
            writeln!(self.writer(), "\nChanges not staged for commit:")?;
            for (path, change) in unstaged {
                writeln!(self.writer(), "\t{}{}", change.label(), path.display())?;
            }
        }

        if !status_info.untracked.is_empty() {
            writeln!(self.writer(), "\nUntracked files:")?;
            for path in &status_info.untracked {
                writeln!(self.writer(), "\t{}", path.display().to_string().red())?;
            }
        }

        if status_info.is_clean() {
            writeln!(self.writer(), "nothing to commit, working tree clean")?;
        } else if status_info.staged().next().is_none() {
            writeln!(self.writer(), "\nno changes added to commit")?;
        }

        Ok(())
    }
}
