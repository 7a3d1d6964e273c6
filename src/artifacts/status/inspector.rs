use crate::areas::workspace::Workspace;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::{EntryMetadata, IndexEntry};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::status::file_change::{IndexChangeType, WorkspaceChangeType};
use crate::error::Result;
use derive_new::new;

#[derive(new)]
pub struct Inspector<'r> {
    workspace: &'r Workspace,
}

impl Inspector<'_> {
    /// Whether the working copy of `index_entry` hashes to something else.
    pub fn is_content_changed(&self, index_entry: &IndexEntry) -> Result<bool> {
        let content = self.workspace.read_file(&index_entry.name)?;
        let oid = ObjectId::for_payload(ObjectType::Blob, &content);

        Ok(oid != index_entry.oid)
    }

    /// Size or mode differences are conclusive; equal size with a different
    /// mtime falls back to hashing the file.
    pub fn check_index_against_workspace(
        &self,
        entry: &IndexEntry,
        stat: Option<&EntryMetadata>,
    ) -> Result<WorkspaceChangeType> {
        match stat {
            None => Ok(WorkspaceChangeType::Deleted),
            Some(stat) if !entry.stat_match(stat) => Ok(WorkspaceChangeType::Modified),
            Some(stat) if entry.times_match(stat) => Ok(WorkspaceChangeType::None),
            Some(_) if self.is_content_changed(entry)? => Ok(WorkspaceChangeType::Modified),
            Some(_) => Ok(WorkspaceChangeType::None),
        }
    }

    pub fn check_index_against_head_tree(
        &self,
        index_entry: Option<&IndexEntry>,
        head_entry: Option<&DatabaseEntry>,
    ) -> IndexChangeType {
        match (index_entry, head_entry) {
            (Some(index_entry), Some(head_entry))
                if head_entry.mode != index_entry.metadata.mode
                    || head_entry.oid != index_entry.oid =>
            {
                IndexChangeType::Modified
            }
            (Some(_), None) => IndexChangeType::Added,
            (None, Some(_)) => IndexChangeType::Deleted,
            _ => IndexChangeType::None,
        }
    }
}
