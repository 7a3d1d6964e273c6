use crate::areas::repository::Repository;
use crate::artifacts::branch::HEAD_REF_NAME;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::error::Error;
use colored::Colorize;
use std::io::Write;

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub revision: Option<String>,
    pub oneline: bool,
}

impl Repository {
    /// First-parent history from a revision (HEAD by default).
    pub fn log(&self, opts: &LogOptions) -> anyhow::Result<()> {
        let revision = opts.revision.as_deref().unwrap_or(HEAD_REF_NAME);

        let start = match self.resolve_revision(revision)? {
            Some(oid) => oid,
            None if opts.revision.is_none() => {
                let branch = self
                    .refs()
                    .current_branch()?
                    .map(|branch| branch.to_string())
                    .unwrap_or_else(|| HEAD_REF_NAME.to_string());
                return Err(Error::NoCommits(branch).into());
            }
            None => anyhow::bail!("unknown revision: {revision}"),
        };

        for (index, entry) in self.history(Some(start)).enumerate() {
            let (oid, commit) = entry?;

            if opts.oneline {
                self.show_commit_oneline(&oid, &commit)?;
            } else {
                if index > 0 {
                    writeln!(self.writer())?;
                }
                self.show_commit_medium(&oid, &commit)?;
            }
        }

        Ok(())
    }

    fn show_commit_oneline(&self, oid: &ObjectId, commit: &Commit) -> anyhow::Result<()> {
        writeln!(
            self.writer(),
            "{} {}",
            oid.to_short_oid().yellow(),
            commit.short_message()
        )?;

        Ok(())
    }

    fn show_commit_medium(&self, oid: &ObjectId, commit: &Commit) -> anyhow::Result<()> {
        writeln!(self.writer(), "{}", format!("commit {oid}").yellow())?;
        if commit.is_merge() {
            let parents = commit
                .parents()
                .iter()
                .map(ObjectId::to_short_oid)
                .collect::<Vec<_>>();
            writeln!(self.writer(), "Merge: {}", parents.join(" "))?;
        }
        writeln!(self.writer(), "Author: {}", commit.author().name())?;
        writeln!(
            self.writer(),
            "Date:   {}",
            commit.author().readable_timestamp()
        )?;
        writeln!(self.writer())?;
        for message_line in commit.message().lines() {
            writeln!(self.writer(), "    {message_line}")?;
        }

        Ok(())
    }
}
