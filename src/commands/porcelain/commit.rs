use crate::areas::refs::Head;
use crate::areas::repository::Repository;
use crate::artifacts::core::clock;
use crate::artifacts::objects::commit::Author;
use std::io::Write;

impl Repository {
    /// Commit the index. Without a message, a pending merge's prepared
    /// message is used.
    pub fn commit(&self, message: Option<&str>) -> anyhow::Result<()> {
        let message = match message {
            Some(message) => message.trim().to_string(),
            None => self
                .pending_merge_message()?
                .map(|message| message.trim().to_string())
                .ok_or_else(|| anyhow::anyhow!("a commit message is required (-m)"))?,
        };

        let author = Author::load_name_from_env()?;
        let clock = clock::load_from_env();
        let is_root = self.refs().read_head()?.is_none();

        let oid = self.commit_index(&author, &message, clock.as_ref())?;
        let commit = self.read_commit(&oid)?;

        let location = match self.refs().head()? {
            Head::Symbolic(branch) => branch.to_string(),
            Head::Detached(_) => "detached HEAD".to_string(),
        };
        let root_marker = if is_root { " (root-commit)" } else { "" };

        writeln!(
            self.writer(),
            "[{location}{root_marker} {}] {}",
            oid.to_short_oid(),
            commit.short_message()
        )?;

        Ok(())
    }
}
