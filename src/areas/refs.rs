//! Ref store (branches and HEAD)
//!
//! Branches are files under `refs/heads/` holding a bare digest. `HEAD` holds
//! either `ref: refs/heads/<branch>` (symbolic) or a bare digest (detached).
//!
//! Every write takes an exclusive `file-guard` lock on the ref file.
//! `compare_and_swap` reads the stored value under that lock and refuses to
//! write when it no longer matches what the caller expects.

use crate::areas::database::Database;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::{HEAD_REF_NAME, HEADS_PREFIX};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::{OBJECT_ID_LENGTH, OBJECT_ID_MIN_PREFIX};
use crate::error::{Error, Result};
use file_guard::Lock;
use std::io::{Read, Seek, SeekFrom, Write};
use std::ops::DerefMut;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SYMREF_PREFIX: &str = "ref: ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// HEAD follows a branch, which may not have commits yet
    Symbolic(BranchName),
    /// HEAD pins a commit directly
    Detached(ObjectId),
}

#[derive(Debug)]
pub struct Refs {
    /// Path to the metadata directory (typically `.arbor`)
    path: Box<Path>,
}

impl Refs {
    pub fn new(path: Box<Path>) -> Self {
        Refs { path }
    }

    pub fn head(&self) -> Result<Head> {
        let content = std::fs::read_to_string(self.head_path())?;
        let content = content.trim();

        match content.strip_prefix(SYMREF_PREFIX) {
            Some(ref_path) => Ok(Head::Symbolic(BranchName::try_parse_ref_path(ref_path)?)),
            None => ObjectId::try_parse(content.to_string())
                .map(Head::Detached)
                .map_err(|_| Error::malformed("HEAD", format!("unexpected content {content:?}"))),
        }
    }

    /// Commit HEAD currently resolves to, if any.
    pub fn read_head(&self) -> Result<Option<ObjectId>> {
        match self.head()? {
            Head::Symbolic(branch) => self.read_branch(&branch),
            Head::Detached(oid) => Ok(Some(oid)),
        }
    }

    pub fn current_branch(&self) -> Result<Option<BranchName>> {
        match self.head()? {
            Head::Symbolic(branch) => Ok(Some(branch)),
            Head::Detached(_) => Ok(None),
        }
    }

    pub fn branch_exists(&self, branch: &BranchName) -> bool {
        self.branch_path(branch).is_file()
    }

    pub fn read_branch(&self, branch: &BranchName) -> Result<Option<ObjectId>> {
        Self::read_ref_file(&self.branch_path(branch))
    }

    /// Resolve `HEAD`, a branch name, or a digest to a commit digest.
    ///
    /// Order: `HEAD` through [`Refs::head`], then an exact branch match, then
    /// a full digest (returned as is, without checking the store), then a
    /// unique abbreviated digest of at least four hex characters.
    pub fn resolve(&self, name: &str, database: &Database) -> Result<Option<ObjectId>> {
        if name == HEAD_REF_NAME {
            return self.read_head();
        }

        if let Ok(branch) = BranchName::try_parse(name)
            && self.branch_exists(&branch)
        {
            return self.read_branch(&branch);
        }

        if !name.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(None);
        }

        match name.len() {
            OBJECT_ID_LENGTH => Ok(Some(ObjectId::try_parse(name.to_string())?)),
            len if len >= OBJECT_ID_MIN_PREFIX && len < OBJECT_ID_LENGTH => {
                let mut candidates = database.find_objects_by_prefix(name)?;
                match candidates.len() {
                    0 => Ok(None),
                    1 => Ok(candidates.pop()),
                    count => Err(Error::AmbiguousObjectId {
                        prefix: name.to_string(),
                        count,
                    }),
                }
            }
            _ => Ok(None),
        }
    }

    /// Point `branch` at `oid` regardless of its current value.
    pub fn update(&self, branch: &BranchName, oid: &ObjectId) -> Result<()> {
        self.write_locked(&self.branch_path(branch), branch.as_ref(), None, oid)
    }

    /// Point `branch` at `new` only if it still holds `expected`
    /// (`None` meaning the branch has no commits yet).
    pub fn compare_and_swap(
        &self,
        branch: &BranchName,
        expected: Option<&ObjectId>,
        new: &ObjectId,
    ) -> Result<()> {
        self.write_locked(
            &self.branch_path(branch),
            branch.as_ref(),
            Some(expected),
            new,
        )
    }

    /// Advance whatever HEAD refers to: the current branch, or HEAD itself
    /// when detached.
    pub fn update_head(&self, oid: &ObjectId) -> Result<()> {
        match self.head()? {
            Head::Symbolic(branch) => self.update(&branch, oid),
            Head::Detached(_) => self.set_head_detached(oid),
        }
    }

    pub fn compare_and_swap_head(&self, expected: Option<&ObjectId>, new: &ObjectId) -> Result<()> {
        match self.head()? {
            Head::Symbolic(branch) => self.compare_and_swap(&branch, expected, new),
            Head::Detached(_) => {
                let head_path = self.head_path();
                self.write_locked(&head_path, HEAD_REF_NAME, Some(expected), new)
            }
        }
    }

    pub fn set_head_symbolic(&self, branch: &BranchName) -> Result<()> {
        self.write_ref_file(
            &self.head_path(),
            &format!("{SYMREF_PREFIX}{}\n", branch.to_ref_path()),
        )?;
        tracing::debug!(%branch, "HEAD now follows branch");

        Ok(())
    }

    pub fn set_head_detached(&self, oid: &ObjectId) -> Result<()> {
        self.write_ref_file(&self.head_path(), &format!("{oid}\n"))?;
        tracing::debug!(%oid, "HEAD detached");

        Ok(())
    }

    /// Create `branch` at `start`, or at HEAD's commit when `start` is `None`.
    pub fn create_branch(&self, branch: &BranchName, start: Option<ObjectId>) -> Result<ObjectId> {
        if self.branch_exists(branch) {
            return Err(Error::AlreadyExists(branch.to_string()));
        }

        let oid = match start {
            Some(oid) => oid,
            None => self.read_head()?.ok_or_else(|| {
                let head_name = self
                    .current_branch()
                    .ok()
                    .flatten()
                    .map(|current| current.to_string())
                    .unwrap_or_else(|| HEAD_REF_NAME.to_string());
                Error::NoCommits(head_name)
            })?,
        };

        self.compare_and_swap(branch, None, &oid)?;
        Ok(oid)
    }

    /// Delete `branch` and return the commit it pointed at.
    pub fn delete_branch(&self, branch: &BranchName) -> Result<ObjectId> {
        if self.current_branch()?.as_ref() == Some(branch) {
            return Err(Error::CurrentBranch(branch.to_string()));
        }

        let branch_path = self.branch_path(branch);
        let oid = self
            .read_branch(branch)?
            .ok_or_else(|| Error::BranchNotFound(branch.to_string()))?;

        std::fs::remove_file(&branch_path)?;
        self.prune_branch_empty_parent_dirs(&branch_path)?;
        tracing::debug!(%branch, %oid, "deleted branch");

        Ok(oid)
    }

    pub fn list_branches(&self) -> Result<Vec<BranchName>> {
        let heads_path = self.heads_path();

        let mut branches = WalkDir::new(&heads_path)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let relative_path = entry.path().strip_prefix(&heads_path).ok()?;
                BranchName::try_parse(relative_path.to_string_lossy().replace('\\', "/")).ok()
            })
            .collect::<Vec<_>>();
        branches.sort();

        Ok(branches)
    }

    pub fn head_path(&self) -> PathBuf {
        self.path.join(HEAD_REF_NAME)
    }

    pub fn heads_path(&self) -> PathBuf {
        self.path.join(HEADS_PREFIX)
    }

    fn branch_path(&self, branch: &BranchName) -> PathBuf {
        self.path.join(branch.to_ref_path())
    }

    fn read_ref_file(path: &Path) -> Result<Option<ObjectId>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Self::parse_ref_content(&content)
    }

    fn parse_ref_content(content: &str) -> Result<Option<ObjectId>> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }

        Ok(Some(ObjectId::try_parse(content.to_string())?))
    }

    fn write_ref_file(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut ref_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let mut lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)?;
        lock.deref_mut().write_all(content.as_bytes())?;

        Ok(())
    }

    /// Write `new` into the ref file at `path` under an exclusive lock.
    ///
    /// With `expected` set, the stored value is checked against it after the
    /// lock is taken and a mismatch fails with `StaleRef`.
    fn write_locked(
        &self,
        path: &Path,
        name: &str,
        expected: Option<Option<&ObjectId>>,
        new: &ObjectId,
    ) -> Result<()> {
        if let Some(Some(expected)) = expected
            && !path.exists()
        {
            return Err(stale_ref(name, Some(expected), None));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut ref_file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let mut lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)?;
        let file = lock.deref_mut();

        let mut current = String::new();
        file.read_to_string(&mut current)?;
        let current = if current.trim().starts_with(SYMREF_PREFIX) {
            None
        } else {
            Self::parse_ref_content(&current)?
        };

        if let Some(expected) = expected
            && expected != current.as_ref()
        {
            return Err(stale_ref(name, expected, current.as_ref()));
        }

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(format!("{new}\n").as_bytes())?;
        file.flush()?;

        tracing::debug!(name, old = ?current, %new, "updated ref");
        Ok(())
    }

    fn prune_branch_empty_parent_dirs(&self, path: &Path) -> Result<()> {
        let heads_path = self.heads_path();

        let mut current = path.parent();
        while let Some(parent) = current {
            if parent == heads_path || !parent.starts_with(&heads_path) {
                break;
            }
            if parent.read_dir()?.next().is_some() {
                break;
            }

            std::fs::remove_dir(parent)?;
            current = parent.parent();
        }

        Ok(())
    }
}

fn stale_ref(name: &str, expected: Option<&ObjectId>, actual: Option<&ObjectId>) -> Error {
    let describe = |oid: Option<&ObjectId>| {
        oid.map(ToString::to_string)
            .unwrap_or_else(|| "nothing".to_string())
    };

    Error::StaleRef {
        name: name.to_string(),
        expected: describe(expected),
        actual: describe(actual),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::object_type::ObjectType;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    struct Fixture {
        _dir: TempDir,
        refs: Refs,
        database: Database,
    }

    #[fixture]
    fn store() -> Fixture {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let refs = Refs::new(dir.path().to_path_buf().into_boxed_path());
        let database = Database::new(dir.path().join("objects").into_boxed_path());
        refs.set_head_symbolic(&BranchName::default_branch()).unwrap();

        Fixture {
            _dir: dir,
            refs,
            database,
        }
    }

    fn branch(name: &str) -> BranchName {
        BranchName::try_parse(name).unwrap()
    }

    fn commit_like(database: &Database, seed: &str) -> ObjectId {
        database.put(ObjectType::Commit, seed.as_bytes()).unwrap()
    }

    #[rstest]
    fn fresh_head_is_symbolic_and_unborn(store: Fixture) {
        assert_eq!(store.refs.head().unwrap(), Head::Symbolic(branch("main")));
        assert_eq!(store.refs.read_head().unwrap(), None);
        assert_eq!(store.refs.resolve("HEAD", &store.database).unwrap(), None);
    }

    #[rstest]
    fn update_head_advances_the_current_branch(store: Fixture) {
        let oid = commit_like(&store.database, "a");
        store.refs.update_head(&oid).unwrap();

        assert_eq!(store.refs.read_branch(&branch("main")).unwrap(), Some(oid.clone()));
        assert_eq!(store.refs.resolve("main", &store.database).unwrap(), Some(oid));
    }

    #[rstest]
    fn compare_and_swap_rejects_stale_expectations(store: Fixture) {
        let first = commit_like(&store.database, "first");
        let second = commit_like(&store.database, "second");
        let main = branch("main");

        store.refs.compare_and_swap(&main, None, &first).unwrap();
        assert!(matches!(
            store.refs.compare_and_swap(&main, None, &second),
            Err(Error::StaleRef { .. })
        ));

        store.refs.compare_and_swap(&main, Some(&first), &second).unwrap();
        assert_eq!(store.refs.read_branch(&main).unwrap(), Some(second));
    }

    #[rstest]
    fn create_branch_requires_a_commit(store: Fixture) {
        assert!(matches!(
            store.refs.create_branch(&branch("feature"), None),
            Err(Error::NoCommits(_))
        ));

        let oid = commit_like(&store.database, "a");
        store.refs.update_head(&oid).unwrap();
        assert_eq!(store.refs.create_branch(&branch("feature"), None).unwrap(), oid);
        assert!(matches!(
            store.refs.create_branch(&branch("feature"), None),
            Err(Error::AlreadyExists(_))
        ));
    }

    #[rstest]
    fn delete_branch_refuses_current_and_prunes_dirs(store: Fixture) {
        let oid = commit_like(&store.database, "a");
        store.refs.update_head(&oid).unwrap();
        store.refs.create_branch(&branch("topic/deep"), None).unwrap();

        assert!(matches!(
            store.refs.delete_branch(&branch("main")),
            Err(Error::CurrentBranch(_))
        ));
        assert_eq!(store.refs.delete_branch(&branch("topic/deep")).unwrap(), oid);
        assert!(!store.refs.heads_path().join("topic").exists());
        assert!(matches!(
            store.refs.delete_branch(&branch("topic/deep")),
            Err(Error::BranchNotFound(_))
        ));
    }

    #[rstest]
    fn lists_branches_in_name_order(store: Fixture) {
        let oid = commit_like(&store.database, "a");
        store.refs.update_head(&oid).unwrap();
        store.refs.create_branch(&branch("zeta"), None).unwrap();
        store.refs.create_branch(&branch("alpha/one"), None).unwrap();

        assert_eq!(
            store.refs.list_branches().unwrap(),
            vec![branch("alpha/one"), branch("main"), branch("zeta")]
        );
    }

    #[rstest]
    fn resolves_digests_and_prefixes(store: Fixture) {
        let oid = commit_like(&store.database, "a");

        assert_eq!(
            store.refs.resolve(oid.as_ref(), &store.database).unwrap(),
            Some(oid.clone())
        );
        assert_eq!(
            store.refs.resolve(&oid.as_ref()[..8], &store.database).unwrap(),
            Some(oid)
        );

        let unknown = "f".repeat(OBJECT_ID_LENGTH);
        assert_eq!(
            store.refs.resolve(&unknown, &store.database).unwrap(),
            Some(ObjectId::try_parse(unknown).unwrap())
        );
        assert_eq!(store.refs.resolve("nope", &store.database).unwrap(), None);
    }

    #[rstest]
    fn branch_names_win_over_digest_prefixes(store: Fixture) {
        let a = commit_like(&store.database, "a");
        let b = commit_like(&store.database, "b");
        let prefix = &a.as_ref()[..6];
        store.refs.update(&branch(prefix), &b).unwrap();

        assert_eq!(store.refs.resolve(prefix, &store.database).unwrap(), Some(b));
    }

    #[rstest]
    fn detached_head_moves_itself(store: Fixture) {
        let a = commit_like(&store.database, "a");
        let b = commit_like(&store.database, "b");
        store.refs.set_head_detached(&a).unwrap();

        store.refs.compare_and_swap_head(Some(&a), &b).unwrap();

        assert_eq!(store.refs.head().unwrap(), Head::Detached(b));
        assert_eq!(store.refs.read_branch(&branch("main")).unwrap(), None);
    }
}
