use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::{EntryMetadata, IndexEntry};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree_codec::FlatTree;
use crate::error::Result;
use derive_new::new;
use std::path::{Path, PathBuf};

/// Counts of what a materialization touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeSummary {
    pub written: usize,
    pub unchanged: usize,
    pub removed: usize,
}

#[derive(new)]
pub struct Materializer<'r> {
    repository: &'r Repository,
}

impl Materializer<'_> {
    /// Make the working directory and the index mirror `tree` exactly.
    ///
    /// Files tracked by the current index but absent from `tree` are deleted
    /// (with any directories they leave empty). Files whose index entry
    /// already matches both the target digest and the file on disk are left
    /// alone.
    pub fn checkout_tree(&self, tree: &FlatTree) -> Result<MaterializeSummary> {
        let workspace = self.repository.workspace();
        let database = self.repository.database();
        let mut index = self.repository.index();
        let mut summary = MaterializeSummary::default();

        let stale_paths = index
            .paths()
            .filter(|path| !tree.contains_key(*path))
            .map(Path::to_path_buf)
            .collect::<Vec<PathBuf>>();
        for path in stale_paths {
            workspace.remove_file(&path)?;
            summary.removed += 1;
        }

        let mut entries = Vec::with_capacity(tree.len());
        for (path, entry) in tree {
            let on_disk = workspace.stat_file(path)?;

            let stat = match (index.entry_by_path(path), on_disk) {
                (Some(current), Some(stat))
                    if current.oid == entry.oid
                        && current.stat_match(&stat)
                        && current.times_match(&stat) =>
                {
                    summary.unchanged += 1;
                    stat
                }
                _ => {
                    let blob = database.load_blob(&entry.oid)?;
                    workspace.write_file(path, blob.content(), entry.mode)?;
                    summary.written += 1;

                    workspace
                        .stat_file(path)?
                        .unwrap_or_else(|| placeholder_stat(entry, blob.content().len()))
                }
            };

            entries.push(IndexEntry::new(path.clone(), entry.oid.clone(), stat));
        }

        replace_index(&mut index, entries)?;
        tracing::info!(
            written = summary.written,
            unchanged = summary.unchanged,
            removed = summary.removed,
            "materialized tree"
        );

        Ok(summary)
    }

    /// Rebuild only the index from `tree`, leaving working files untouched.
    ///
    /// A working file whose content differs from the tree keeps a zeroed
    /// mtime in its entry, so the next status re-hashes it instead of trusting
    /// a matching size.
    pub fn reset_index(&self, tree: &FlatTree) -> Result<()> {
        let workspace = self.repository.workspace();
        let mut index = self.repository.index();

        let mut entries = Vec::with_capacity(tree.len());
        for (path, entry) in tree {
            let stat = match workspace.stat_file(path)? {
                Some(stat) => {
                    let content = workspace.read_file(path)?;
                    if ObjectId::for_payload(ObjectType::Blob, &content) == entry.oid {
                        stat
                    } else {
                        EntryMetadata {
                            mtime: 0,
                            mtime_nsec: 0,
                            ..stat
                        }
                    }
                }
                None => placeholder_stat(entry, 0),
            };

            entries.push(IndexEntry::new(path.clone(), entry.oid.clone(), stat));
        }

        replace_index(&mut index, entries)
    }
}

fn placeholder_stat(entry: &DatabaseEntry, size: usize) -> EntryMetadata {
    EntryMetadata {
        size: size as u64,
        mode: entry.mode,
        ..EntryMetadata::default()
    }
}

fn replace_index(index: &mut Index, entries: Vec<IndexEntry>) -> Result<()> {
    index.clear();
    for entry in entries {
        index.add(entry);
    }

    index.write_updates()
}
