use crate::areas::repository::Repository;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree_codec::TreeCodec;
use std::io::Write;

impl Repository {
    /// List a tree, or the tree of a commit. `recursive` descends into
    /// subtrees and prints only blobs, with full paths.
    pub fn ls_tree(&self, object: &str, recursive: bool) -> anyhow::Result<()> {
        let oid = self
            .resolve_revision(object)?
            .ok_or_else(|| anyhow::anyhow!("not a valid object name: {object}"))?;

        let tree_oid = match self.database().get_object_type(&oid)? {
            ObjectType::Commit => self.database().load_commit(&oid)?.tree_oid().clone(),
            ObjectType::Tree => oid,
            ObjectType::Blob => anyhow::bail!("not a tree object: {object}"),
        };

        if recursive {
            let entries = TreeCodec::new(self.database()).flatten(&tree_oid)?;
            for (path, entry) in entries {
                writeln!(
                    self.writer(),
                    "{} {} {}\t{}",
                    entry.mode,
                    entry.mode.object_type(),
                    entry.oid,
                    path.display()
                )?;
            }
        } else {
            for (name, entry) in self.database().load_tree(&tree_oid)?.entries() {
                writeln!(
                    self.writer(),
                    "{} {} {}\t{}",
                    entry.mode,
                    entry.mode.object_type(),
                    entry.oid,
                    name
                )?;
            }
        }

        Ok(())
    }
}
