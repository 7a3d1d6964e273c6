use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::index::index_entry::EntryMetadata;
use crate::artifacts::objects::tree_codec::FlatTree;
use crate::artifacts::status::file_change::{FileChange, IndexChangeType, WorkspaceChangeType};
use crate::artifacts::status::inspector::Inspector;
use crate::error::Result;
use derive_new::new;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub type ChangeSet = BTreeMap<PathBuf, FileChange>;

/// Result of one status scan.
///
/// Untracked directories holding no tracked file are reported once, with a
/// trailing separator, instead of file by file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusInfo {
    pub changes: ChangeSet,
    pub untracked: BTreeSet<PathBuf>,
}

impl StatusInfo {
    pub fn staged(&self) -> impl Iterator<Item = (&PathBuf, IndexChangeType)> {
        self.changes
            .iter()
            .filter(|(_, change)| change.index_change != IndexChangeType::None)
            .map(|(path, change)| (path, change.index_change))
    }

    pub fn unstaged(&self) -> impl Iterator<Item = (&PathBuf, WorkspaceChangeType)> {
        self.changes
            .iter()
            .filter(|(_, change)| change.workspace_change != WorkspaceChangeType::None)
            .map(|(path, change)| (path, change.workspace_change))
    }

    pub fn is_clean(&self) -> bool {
        self.changes.is_empty() && self.untracked.is_empty()
    }
}

#[derive(new)]
pub struct Status<'r> {
    repository: &'r Repository,
}

impl Status<'_> {
    /// Scan HEAD, the index and the working directory.
    ///
    /// Entries whose content turns out unchanged despite a moved mtime get
    /// their stat refreshed, and the index is written back if that happened.
    pub fn initialize(&self) -> Result<StatusInfo> {
        let workspace = self.repository.workspace();
        let inspector = Inspector::new(workspace);
        let head_tree = self.repository.head_tree()?;

        let mut index = self.repository.index();
        let mut changes = ChangeSet::new();

        let workspace_files = workspace.list_files()?;
        let file_stats = workspace_files
            .iter()
            .filter(|path| index.entry_by_path(path).is_some())
            .map(|path| Ok((path.clone(), workspace.stat_file(path)?)))
            .collect::<Result<BTreeMap<PathBuf, Option<EntryMetadata>>>>()?;

        self.check_index_entries(&mut index, &inspector, &head_tree, &file_stats, &mut changes)?;
        Self::collect_deleted_head_files(&index, &head_tree, &mut changes);
        let untracked = Self::collect_untracked(&index, &workspace_files);

        if index.is_changed() {
            index.write_updates()?;
        }

        Ok(StatusInfo { changes, untracked })
    }

    fn check_index_entries(
        &self,
        index: &mut Index,
        inspector: &Inspector<'_>,
        head_tree: &FlatTree,
        file_stats: &BTreeMap<PathBuf, Option<EntryMetadata>>,
        changes: &mut ChangeSet,
    ) -> Result<()> {
        let index_entries = index.entries().cloned().collect::<Vec<_>>();

        for entry in index_entries {
            let stat = file_stats.get(&entry.name).and_then(Option::as_ref);
            let workspace_change = inspector.check_index_against_workspace(&entry, stat)?;

            if workspace_change == WorkspaceChangeType::None
                && let Some(stat) = stat
            {
                index.update_entry_stat(&entry.name, stat.clone());
            }

            let index_change =
                inspector.check_index_against_head_tree(Some(&entry), head_tree.get(&entry.name));

            let change = FileChange {
                index_change,
                workspace_change,
            };
            if !change.is_unchanged() {
                changes.insert(entry.name.clone(), change);
            }
        }

        Ok(())
    }

    fn collect_deleted_head_files(index: &Index, head_tree: &FlatTree, changes: &mut ChangeSet) {
        for path in head_tree.keys() {
            if index.entry_by_path(path).is_none() {
                changes.entry(path.clone()).or_default().index_change = IndexChangeType::Deleted;
            }
        }
    }

    /// Untracked files, collapsed to their outermost directory that holds no
    /// tracked file.
    fn collect_untracked(index: &Index, workspace_files: &[PathBuf]) -> BTreeSet<PathBuf> {
        workspace_files
            .iter()
            .filter(|path| index.entry_by_path(path).is_none())
            .map(|path| {
                let mut dirs = path
                    .ancestors()
                    .skip(1)
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .collect::<Vec<&Path>>();
                dirs.reverse();

                match dirs.into_iter().find(|dir| !index.is_tracked_dir(dir)) {
                    Some(dir) => {
                        // trailing separator marks a directory
                        let mut dir = dir.to_path_buf();
                        dir.push("");
                        dir
                    }
                    None => path.clone(),
                }
            })
            .collect()
    }
}
