//! Repository handle
//!
//! A [`Repository`] owns every on-disk area of one repository and is passed
//! explicitly to each operation, so several repositories can live side by
//! side in one process. The staging index sits behind a `RefCell`: engine
//! operations take `&self` and borrow it for as long as they mutate it.

use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::refs::Refs;
use crate::areas::workspace::Workspace;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::checkout::materialize::{MaterializeSummary, Materializer};
use crate::artifacts::core::clock::Clock;
use crate::artifacts::log::history::History;
use crate::artifacts::log::reachable::collect_reachable;
use crate::artifacts::merge::MergeOutcome;
use crate::artifacts::merge::merge_engine::MergeEngine;
use crate::artifacts::objects::commit::{Author, Commit};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree_codec::{FlatTree, TreeCodec};
use crate::artifacts::status::status_info::{Status, StatusInfo};
use crate::error::{Error, Result};
use std::cell::{RefCell, RefMut};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Name of the metadata directory at the repository root
pub const METADATA_DIR: &str = ".arbor";

const OBJECTS_DIR: &str = "objects";
const INDEX_FILE: &str = "index";
const MERGE_HEAD_FILE: &str = "MERGE_HEAD";
const MERGE_MSG_FILE: &str = "MERGE_MSG";

pub struct Repository {
    path: Box<Path>,
    writer: RefCell<Box<dyn Write>>,
    database: Database,
    index: RefCell<Index>,
    workspace: Workspace,
    refs: Refs,
}

impl Repository {
    /// Create the metadata layout under `path` (objects, `refs/heads`, a
    /// `HEAD` following the default branch) and open it. Re-initializing
    /// keeps an existing `HEAD`.
    pub fn init(path: &Path, writer: Box<dyn Write>) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        let root = path.canonicalize()?;
        let metadata_path = root.join(METADATA_DIR);

        std::fs::create_dir_all(metadata_path.join(OBJECTS_DIR))?;
        let refs = Refs::new(metadata_path.clone().into_boxed_path());
        std::fs::create_dir_all(refs.heads_path())?;

        if !refs.head_path().exists() {
            refs.set_head_symbolic(&BranchName::default_branch())?;
        }
        tracing::info!(path = %root.display(), "initialized repository");

        Self::assemble(root, writer)
    }

    /// Open the repository containing `path`, looking upwards for the
    /// metadata directory.
    pub fn open(path: &Path, writer: Box<dyn Write>) -> Result<Self> {
        let start = path.canonicalize()?;
        let root = start
            .ancestors()
            .find(|dir| dir.join(METADATA_DIR).is_dir())
            .ok_or_else(|| Error::NotARepository(start.clone()))?
            .to_path_buf();

        Self::assemble(root, writer)
    }

    fn assemble(root: PathBuf, writer: Box<dyn Write>) -> Result<Self> {
        let metadata_path = root.join(METADATA_DIR);

        let mut index = Index::new(metadata_path.join(INDEX_FILE).into_boxed_path());
        index.rehydrate()?;

        Ok(Repository {
            database: Database::new(metadata_path.join(OBJECTS_DIR).into_boxed_path()),
            index: RefCell::new(index),
            workspace: Workspace::new(root.clone().into_boxed_path()),
            refs: Refs::new(metadata_path.into_boxed_path()),
            writer: RefCell::new(writer),
            path: root.into_boxed_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.path.join(METADATA_DIR)
    }

    pub fn writer(&self) -> RefMut<'_, Box<dyn Write>> {
        self.writer.borrow_mut()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn index(&self) -> RefMut<'_, Index> {
        self.index.borrow_mut()
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    /// Resolve a revision expression (`HEAD`, a branch, a digest or prefix,
    /// with `^` and `~n` suffixes).
    pub fn resolve_revision(&self, revision: &str) -> Result<Option<ObjectId>> {
        Revision::try_parse(revision)?.resolve(&self.refs, &self.database)
    }

    pub fn read_commit(&self, oid: &ObjectId) -> Result<Commit> {
        self.database.load_commit(oid)
    }

    /// Flattened tree of a commit.
    pub fn commit_tree(&self, oid: &ObjectId) -> Result<FlatTree> {
        let commit = self.database.load_commit(oid)?;
        TreeCodec::new(&self.database).flatten(commit.tree_oid())
    }

    /// Flattened tree of HEAD's commit, empty when nothing is committed yet.
    pub fn head_tree(&self) -> Result<FlatTree> {
        match self.refs.read_head()? {
            Some(oid) => self.commit_tree(&oid),
            None => Ok(FlatTree::new()),
        }
    }

    /// Store a commit object. The message is kept byte for byte.
    pub fn create_commit(
        &self,
        tree_oid: ObjectId,
        parents: Vec<ObjectId>,
        author: &str,
        message: &str,
        clock: &dyn Clock,
    ) -> Result<ObjectId> {
        let author = Author::now(author.to_string(), clock);
        let commit = Commit::new(parents, tree_oid, author, message.to_string());
        let oid = self.database.store(&commit)?;
        tracing::debug!(%oid, parents = commit.parents().len(), "stored commit");

        Ok(oid)
    }

    /// First-parent history starting at `start`.
    pub fn history(&self, start: Option<ObjectId>) -> History<'_> {
        History::new(&self.database, start)
    }

    pub fn collect_reachable(&self, oid: &ObjectId) -> Result<BTreeSet<ObjectId>> {
        collect_reachable(&self.database, oid)
    }

    /// Stage the file at `path`, or every file below it if it is a
    /// directory. Tracked files under `path` that vanished from the working
    /// directory are unstaged. Returns the staged paths.
    pub fn stage_path(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let relative_path = self.relative_path(path)?;
        let mut index = self.index();

        let files = if self.workspace.exists(&relative_path) {
            self.workspace.list_files_under(&relative_path)?
        } else if index.entries_under_path(&relative_path).is_empty() {
            return Err(Error::InvalidPath(relative_path));
        } else {
            Vec::new()
        };

        let mut staged = Vec::with_capacity(files.len());
        for file in files {
            let Some(stat) = self.workspace.stat_file(&file)? else {
                continue;
            };
            let content = self.workspace.read_file(&file)?;
            let oid = index.stage(&self.database, &file, &content, stat)?;
            tracing::debug!(path = %file.display(), %oid, "staged");
            staged.push(file);
        }

        for tracked in index.entries_under_path(&relative_path) {
            if !self.workspace.exists(&tracked) {
                index.unstage(&tracked);
                tracing::debug!(path = %tracked.display(), "unstaged deleted file");
            }
        }

        index.write_updates()?;
        Ok(staged)
    }

    /// Drop `path` (or everything staged below it) from the index, leaving
    /// the working files alone. Returns the unstaged paths.
    pub fn unstage_path(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let relative_path = self.relative_path(path)?;
        let mut index = self.index();

        let tracked = index.entries_under_path(&relative_path);
        if tracked.is_empty() {
            return Err(Error::InvalidPath(relative_path));
        }

        for path in &tracked {
            index.unstage(path);
        }
        index.write_updates()?;

        Ok(tracked)
    }

    /// Commit the staged snapshot on top of HEAD. A pending merge adds its
    /// target as second parent and is cleared.
    pub fn commit_index(&self, author: &str, message: &str, clock: &dyn Clock) -> Result<ObjectId> {
        let tree = {
            let index = self.index();
            if index.is_empty() {
                return Err(Error::NothingToCommit);
            }
            index.to_flat_tree()
        };
        let tree_oid = TreeCodec::new(&self.database).build(&tree)?;

        let parent = self.refs.read_head()?;
        let merge_head = self.pending_merge()?;
        let parents = parent.iter().chain(merge_head.iter()).cloned().collect();

        let oid = self.create_commit(tree_oid, parents, author, message, clock)?;
        self.refs.compare_and_swap_head(parent.as_ref(), &oid)?;
        self.clear_merge_state()?;
        tracing::info!(%oid, merge = merge_head.is_some(), "committed");

        Ok(oid)
    }

    pub fn status(&self) -> Result<StatusInfo> {
        Status::new(self).initialize()
    }

    /// Make the working directory and index mirror the tree of `oid`.
    /// Moving HEAD is up to the caller.
    pub fn checkout(&self, oid: &ObjectId) -> Result<MaterializeSummary> {
        if self.pending_merge()?.is_some() {
            return Err(Error::MergeInProgress);
        }

        let tree = self.commit_tree(oid)?;
        Materializer::new(self).checkout_tree(&tree)
    }

    /// Move the current ref (or detached HEAD) to `oid` and replace the
    /// index with its tree. Working files are not touched.
    pub fn reset(&self, oid: &ObjectId) -> Result<()> {
        let tree = self.commit_tree(oid)?;
        let current = self.refs.read_head()?;

        Materializer::new(self).reset_index(&tree)?;
        self.refs.compare_and_swap_head(current.as_ref(), oid)?;
        self.clear_merge_state()?;
        tracing::info!(from = ?current, to = %oid, "reset");

        Ok(())
    }

    pub fn merge(
        &self,
        target: &ObjectId,
        target_name: &str,
        author: &str,
        message: Option<&str>,
        clock: &dyn Clock,
    ) -> Result<MergeOutcome> {
        MergeEngine::new(self).run(target, target_name, author, message, clock)
    }

    /// Target of a conflicted merge awaiting its resolution commit.
    pub fn pending_merge(&self) -> Result<Option<ObjectId>> {
        let merge_head_path = self.metadata_path().join(MERGE_HEAD_FILE);
        if !merge_head_path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(merge_head_path)?;
        ObjectId::try_parse(content.trim().to_string()).map(Some)
    }

    pub fn pending_merge_message(&self) -> Result<Option<String>> {
        let merge_msg_path = self.metadata_path().join(MERGE_MSG_FILE);
        if !merge_msg_path.is_file() {
            return Ok(None);
        }

        Ok(Some(std::fs::read_to_string(merge_msg_path)?))
    }

    pub fn write_merge_state(&self, target: &ObjectId, message: &str) -> Result<()> {
        let metadata_path = self.metadata_path();
        std::fs::write(metadata_path.join(MERGE_HEAD_FILE), format!("{target}\n"))?;
        std::fs::write(metadata_path.join(MERGE_MSG_FILE), format!("{message}\n"))?;

        Ok(())
    }

    pub fn clear_merge_state(&self) -> Result<()> {
        for name in [MERGE_HEAD_FILE, MERGE_MSG_FILE] {
            match std::fs::remove_file(self.metadata_path().join(name)) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }

        Ok(())
    }

    /// Relative paths are taken from the repository root.
    fn relative_path(&self, path: &Path) -> Result<PathBuf> {
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.path)
                .map_err(|_| Error::InvalidPath(path.to_path_buf()))?
        } else {
            path
        };

        Ok(relative
            .components()
            .filter(|component| !matches!(component, Component::CurDir))
            .collect())
    }
}
