use crate::areas::repository::Repository;
use crate::artifacts::checkout::materialize::Materializer;
use crate::artifacts::core::clock::Clock;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::EntryMetadata;
use crate::artifacts::merge::{ConflictKind, MergeConflict, MergeOutcome};
use crate::artifacts::merge::common_ancestor::AncestorFinder;
use crate::artifacts::merge::resolution::{Resolution, conflict_markers, resolve_path};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree_codec::{FlatTree, TreeCodec};
use crate::error::{Error, Result};
use bytes::Bytes;
use derive_new::new;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// A path both sides changed differently.
struct ConflictedPath {
    path: PathBuf,
    current: Option<DatabaseEntry>,
    target: Option<DatabaseEntry>,
}

/// Target entries set aside because the current side has the opposite shape
/// at the keyed path.
type Displaced = BTreeMap<PathBuf, Vec<(PathBuf, DatabaseEntry)>>;

/// Merges a target commit into whatever HEAD resolves to.
#[derive(new)]
pub struct MergeEngine<'r> {
    repository: &'r Repository,
}

impl MergeEngine<'_> {
    /// Merge `target` (displayed as `target_name` in markers and the default
    /// message) into HEAD.
    ///
    /// 1. HEAD has no commit: fast-forward to `target`.
    /// 2. HEAD is `target`, or `target` is one of its ancestors: up to date.
    /// 3. HEAD is an ancestor of `target`: fast-forward.
    /// 4. Otherwise merge three-way against a common ancestor. Conflicts
    ///    are left in the working tree with a pending merge state; a clean
    ///    result is committed with both tips as parents.
    pub fn run(
        &self,
        target: &ObjectId,
        target_name: &str,
        author: &str,
        message: Option<&str>,
        clock: &dyn Clock,
    ) -> Result<MergeOutcome> {
        if self.repository.pending_merge()?.is_some() {
            return Err(Error::MergeInProgress);
        }

        let Some(current) = self.repository.refs().read_head()? else {
            return self.fast_forward(None, target);
        };

        if &current == target {
            tracing::info!(%target, "already up to date");
            return Ok(MergeOutcome::UpToDate);
        }

        let database = self.repository.database();
        let finder = AncestorFinder::new(|oid: &ObjectId| {
            Ok(database.load_commit(oid)?.parents().to_vec())
        });

        if finder.is_ancestor(target, &current)? {
            tracing::info!(%current, %target, "target already merged");
            return Ok(MergeOutcome::UpToDate);
        }
        if finder.is_ancestor(&current, target)? {
            return self.fast_forward(Some(&current), target);
        }

        let base = finder
            .find_common_ancestor(&current, target)?
            .ok_or_else(|| Error::NoCommonAncestor {
                current: current.clone(),
                target: target.clone(),
            })?;

        let message = message
            .map(str::to_string)
            .unwrap_or_else(|| format!("Merge {target_name}"));
        self.three_way(&base, &current, target, target_name, author, &message, clock)
    }

    /// The working tree is materialized before HEAD moves, so a failure while
    /// writing files leaves the ref on the commit it was on.
    fn fast_forward(&self, current: Option<&ObjectId>, target: &ObjectId) -> Result<MergeOutcome> {
        let tree = self.repository.commit_tree(target)?;

        Materializer::new(self.repository).checkout_tree(&tree)?;
        self.repository.refs().compare_and_swap_head(current, target)?;
        tracing::info!(from = ?current, to = %target, "fast-forward");

        Ok(MergeOutcome::FastForward(target.clone()))
    }

    #[allow(clippy::too_many_arguments)]
    fn three_way(
        &self,
        base: &ObjectId,
        current: &ObjectId,
        target: &ObjectId,
        target_name: &str,
        author: &str,
        message: &str,
        clock: &dyn Clock,
    ) -> Result<MergeOutcome> {
        let base_tree = self.repository.commit_tree(base)?;
        let current_tree = self.repository.commit_tree(current)?;
        let target_tree = self.repository.commit_tree(target)?;

        let paths = base_tree
            .keys()
            .chain(current_tree.keys())
            .chain(target_tree.keys())
            .collect::<BTreeSet<_>>();

        let mut merged = FlatTree::new();
        let mut conflicts = Vec::new();
        for path in paths {
            match resolve_path(
                base_tree.get(path),
                current_tree.get(path),
                target_tree.get(path),
            ) {
                Resolution::Clean(Some(entry)) => {
                    merged.insert(path.clone(), entry);
                }
                Resolution::Clean(None) => {}
                Resolution::Conflict { current, target } => {
                    if let Some(entry) = &current {
                        merged.insert(path.clone(), entry.clone());
                    }
                    conflicts.push(ConflictedPath {
                        path: path.clone(),
                        current,
                        target,
                    });
                }
            }
        }

        let displaced = displace_clashes(&current_tree, &mut merged, &mut conflicts);
        if !conflicts.is_empty() || !displaced.is_empty() {
            return self.halt_on_conflicts(
                base,
                target,
                target_name,
                message,
                &merged,
                conflicts,
                displaced,
            );
        }

        let tree_oid = TreeCodec::new(self.repository.database()).build(&merged)?;
        let merge_oid = self.repository.create_commit(
            tree_oid,
            vec![current.clone(), target.clone()],
            author,
            message,
            clock,
        )?;

        Materializer::new(self.repository).checkout_tree(&merged)?;
        self.repository
            .refs()
            .compare_and_swap_head(Some(current), &merge_oid)?;
        tracing::info!(%base, %current, %target, commit = %merge_oid, "merged");

        Ok(MergeOutcome::Merged(merge_oid))
    }

    /// Check out the cleanly merged paths, then write marker files for the
    /// conflicted ones. The index keeps the current side's blob for each
    /// conflicted path, with a stat that forces the next status to re-hash.
    /// Displaced target entries are written untracked next to the path they
    /// clash with.
    #[allow(clippy::too_many_arguments)]
    fn halt_on_conflicts(
        &self,
        base: &ObjectId,
        target: &ObjectId,
        target_name: &str,
        message: &str,
        merged: &FlatTree,
        conflicts: Vec<ConflictedPath>,
        displaced: Displaced,
    ) -> Result<MergeOutcome> {
        Materializer::new(self.repository).checkout_tree(merged)?;

        let workspace = self.repository.workspace();
        let mut index = self.repository.index();
        let mut reported = Vec::with_capacity(conflicts.len() + displaced.len());

        for conflict in conflicts {
            let current_content = self.blob_content(conflict.current.as_ref())?;
            let target_content = self.blob_content(conflict.target.as_ref())?;
            let content = conflict_markers(&current_content, &target_content, target_name);

            let mode = conflict
                .current
                .as_ref()
                .or(conflict.target.as_ref())
                .map(|entry| entry.mode)
                .unwrap_or_default();
            workspace.write_file(&conflict.path, &content, mode)?;

            if conflict.current.is_some() {
                index.update_entry_stat(
                    &conflict.path,
                    EntryMetadata {
                        size: content.len() as u64,
                        mode,
                        ..EntryMetadata::default()
                    },
                );
            } else {
                index.unstage(&conflict.path);
            }

            tracing::warn!(path = %conflict.path.display(), "merge conflict");
            reported.push(MergeConflict {
                path: conflict.path,
                kind: ConflictKind::Content,
            });
        }

        for (root, entries) in displaced {
            let aside = aside_path(&root, target_name);
            for (path, entry) in entries {
                let content = self.blob_content(Some(&entry))?;
                let destination = match path.strip_prefix(&root) {
                    Ok(relative) if !relative.as_os_str().is_empty() => aside.join(relative),
                    _ => aside.clone(),
                };
                workspace.write_file(&destination, &content, entry.mode)?;
            }

            tracing::warn!(
                path = %root.display(),
                aside = %aside.display(),
                "file/directory conflict"
            );
            reported.push(MergeConflict {
                path: root,
                kind: ConflictKind::FileDirectory,
            });
        }

        index.write_updates()?;
        drop(index);
        self.repository.write_merge_state(target, message)?;

        reported.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(MergeOutcome::Conflicted {
            base: base.clone(),
            conflicts: reported,
        })
    }

    fn blob_content(&self, entry: Option<&DatabaseEntry>) -> Result<Bytes> {
        match entry {
            Some(entry) => Ok(self.repository.database().load_blob(&entry.oid)?.into_content()),
            None => Ok(Bytes::new()),
        }
    }
}

/// Take out of `merged` and `conflicts` every target entry that would make a
/// path a file on one side and a directory on the other. The current side's
/// shape is kept.
fn displace_clashes(
    current_tree: &FlatTree,
    merged: &mut FlatTree,
    conflicts: &mut Vec<ConflictedPath>,
) -> Displaced {
    let mut displaced = Displaced::new();

    // a path's descendants sort right after it
    let roots = merged
        .keys()
        .zip(merged.keys().skip(1))
        .filter(|(path, next)| next.starts_with(path))
        .map(|(path, _)| path.clone())
        .collect::<Vec<_>>();

    for root in roots {
        let current_has_file = current_tree
            .get(&root)
            .is_some_and(|entry| merged.get(&root) == Some(entry));
        let taken = if current_has_file {
            merged
                .keys()
                .filter(|path| *path != &root && path.starts_with(&root))
                .cloned()
                .collect::<Vec<_>>()
        } else {
            vec![root.clone()]
        };

        let slot = displaced.entry(root).or_default();
        for path in taken {
            if let Some(entry) = merged.remove(&path) {
                slot.push((path, entry));
            }
        }
    }

    // target-only conflicts that would land inside a current file, or on top
    // of a current directory
    conflicts.retain(|conflict| {
        let (None, Some(target)) = (&conflict.current, &conflict.target) else {
            return true;
        };

        let file_above = conflict
            .path
            .ancestors()
            .skip(1)
            .find(|ancestor| merged.contains_key(*ancestor))
            .map(Path::to_path_buf);
        let directory_below = merged
            .range(conflict.path.clone()..)
            .next()
            .is_some_and(|(next, _)| next.starts_with(&conflict.path));

        let root = match file_above {
            Some(root) => root,
            None if directory_below => conflict.path.clone(),
            None => return true,
        };
        displaced
            .entry(root)
            .or_default()
            .push((conflict.path.clone(), target.clone()));
        false
    });

    displaced
}

/// `d` merged from `topic/x` is set aside as `d~topic_x`.
fn aside_path(root: &Path, target_name: &str) -> PathBuf {
    let mut name = root.as_os_str().to_os_string();
    name.push("~");
    name.push(target_name.replace('/', "_"));
    PathBuf::from(name)
}
