//! Staging index
//!
//! The index is the proposed next tree snapshot: a flat map from
//! repository-relative path to (blob digest, size, mtime, mode). It has no
//! history of its own and is rewritten wholesale by checkout and reset.
//!
//! ## Data Structures
//!
//! - `entries`: Maps file paths to their index entries
//! - `children`: Maps directory paths to the staged files below them, so a
//!   file can replace a directory (and vice versa) in one step

use crate::areas::database::Database;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::index_entry::{ENTRY_FIXED_SIZE, EntryMetadata, IndexEntry};
use crate::artifacts::index::{HEADER_SIZE, SIGNATURE, VERSION};
use crate::artifacts::objects::object::{Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree_codec::FlatTree;
use crate::error::{Error, Result};
use byteorder::{ByteOrder, NetworkEndian};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;
use std::ops::DerefMut;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Index {
    /// Path to the index file (typically `.arbor/index`)
    path: Box<Path>,
    entries: BTreeMap<Box<Path>, IndexEntry>,
    children: BTreeMap<Box<Path>, BTreeSet<Box<Path>>>,
    /// Set when the in-memory entries diverge from the file on disk
    changed: bool,
}

impl Index {
    pub fn new(path: Box<Path>) -> Self {
        Index {
            path,
            entries: BTreeMap::new(),
            children: BTreeMap::new(),
            changed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry_by_path(&self, path: &Path) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Drop every entry. Stored objects are left alone.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.children.clear();
        self.changed = true;
    }

    /// Load the index from disk under a shared lock.
    ///
    /// A missing or empty file is an empty index.
    pub fn rehydrate(&mut self) -> Result<()> {
        self.entries.clear();
        self.children.clear();
        self.changed = false;

        if !self.path.exists() {
            return Ok(());
        }

        let mut index_file = std::fs::OpenOptions::new().read(true).open(&self.path)?;
        let mut lock = file_guard::lock(&mut index_file, file_guard::Lock::Shared, 0, 1)?;

        if lock.deref_mut().metadata()?.len() == 0 {
            return Ok(());
        }

        let mut reader = Checksum::new(lock);
        let entries_count = Self::parse_header(&mut reader)?;
        self.parse_entries(entries_count, &mut reader)?;

        reader.verify()
    }

    fn parse_header(reader: &mut Checksum) -> Result<u32> {
        let header = reader.read(HEADER_SIZE)?;

        if &header[0..4] != SIGNATURE {
            return Err(Error::malformed("index", "invalid signature"));
        }

        let version = NetworkEndian::read_u32(&header[4..8]);
        if version != VERSION {
            return Err(Error::malformed(
                "index",
                format!("unsupported version {version}"),
            ));
        }

        Ok(NetworkEndian::read_u32(&header[8..12]))
    }

    fn parse_entries(&mut self, entries_count: u32, reader: &mut Checksum) -> Result<()> {
        for _ in 0..entries_count {
            let fixed = reader.read(ENTRY_FIXED_SIZE)?;
            let name_len = NetworkEndian::read_u16(&fixed[ENTRY_FIXED_SIZE - 2..]) as usize;
            let name = reader.read(name_len)?;

            let entry_bytes = [fixed.as_ref(), name.as_ref()].concat();
            let entry = IndexEntry::deserialize(Cursor::new(entry_bytes))?;

            self.store_entry(entry);
        }

        Ok(())
    }

    /// Persist the index under an exclusive lock.
    pub fn write_updates(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // truncated under the lock, never before it
        let mut index_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        let mut lock = file_guard::lock(&mut index_file, file_guard::Lock::Exclusive, 0, 1)?;
        lock.deref_mut().set_len(0)?;

        let mut writer = Checksum::new(lock);

        let mut header = Vec::with_capacity(HEADER_SIZE);
        header.extend_from_slice(SIGNATURE);
        header.extend_from_slice(&VERSION.to_be_bytes());
        header.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        writer.write(&header)?;

        for entry in self.entries.values() {
            writer.write(&entry.serialize()?)?;
        }

        writer.write_checksum()?;
        self.changed = false;
        tracing::debug!(entries = self.entries.len(), "wrote index");

        Ok(())
    }

    /// Store `content` as a blob and stage it at `path`, replacing any prior entry.
    pub fn stage(
        &mut self,
        database: &Database,
        path: &Path,
        content: &[u8],
        metadata: EntryMetadata,
    ) -> Result<ObjectId> {
        let oid = database.put(ObjectType::Blob, content)?;
        self.add(IndexEntry::new(path.to_path_buf(), oid.clone(), metadata));

        Ok(oid)
    }

    /// Remove one staged path, or every staged path below it if it is a directory.
    pub fn unstage(&mut self, path: &Path) {
        self.remove_entry(path);
        self.remove_children(path);
        self.changed = true;
    }

    pub fn add(&mut self, entry: IndexEntry) {
        self.discard_conflicts(&entry);
        self.store_entry(entry);
        self.changed = true;
    }

    /// Refresh the recorded metadata of an entry whose content is unchanged.
    pub fn update_entry_stat(&mut self, path: &Path, stat: EntryMetadata) {
        if let Some(existing_entry) = self.entries.get_mut(path)
            && existing_entry.metadata != stat
        {
            existing_entry.metadata = stat;
            self.changed = true;
        }
    }

    pub fn is_tracked_dir(&self, path: &Path) -> bool {
        self.children.contains_key(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(|path| path.as_ref())
    }

    /// The staged snapshot in the shape the tree codec consumes.
    pub fn to_flat_tree(&self) -> FlatTree {
        self.entries
            .values()
            .map(|entry| {
                (
                    entry.name.clone(),
                    DatabaseEntry::new(entry.oid.clone(), entry.metadata.mode),
                )
            })
            .collect()
    }

    /// Staged paths at or below `path`; `.` selects everything.
    pub fn entries_under_path(&self, path: &Path) -> Vec<PathBuf> {
        self.entries
            .keys()
            .filter(|entry_path| path == Path::new(".") || entry_path.starts_with(path))
            .map(|p| p.to_path_buf())
            .collect()
    }

    /// Remove any entries that cannot coexist with `entry`: files standing
    /// where its parent directories go, and files below it if it replaces a
    /// directory.
    fn discard_conflicts(&mut self, entry: &IndexEntry) {
        for parent in entry.parent_dirs() {
            self.remove_entry(parent);
        }
        self.remove_children(&entry.name);
    }

    fn store_entry(&mut self, entry: IndexEntry) {
        let name = entry.name.clone().into_boxed_path();

        for parent in entry.parent_dirs() {
            self.children
                .entry(parent.to_path_buf().into_boxed_path())
                .or_default()
                .insert(name.clone());
        }

        self.entries.insert(name, entry);
    }

    fn remove_children(&mut self, path: &Path) {
        if let Some(children) = self.children.remove(path) {
            for child in children {
                self.remove_entry(&child);
            }
        }
    }

    fn remove_entry(&mut self, path: &Path) {
        let Some(entry) = self.entries.remove(path) else {
            return;
        };

        for parent in entry.parent_dirs() {
            if let Some(children) = self.children.get_mut(parent) {
                children.remove(path);
                if children.is_empty() {
                    self.children.remove(parent);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::entry_mode::EntryMode;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn repo_dir() -> TempDir {
        TempDir::new().expect("Failed to create temp dir")
    }

    fn setup(dir: &TempDir) -> (Database, Index) {
        let database = Database::new(dir.path().join("objects").into_boxed_path());
        let index = Index::new(dir.path().join("index").into_boxed_path());
        (database, index)
    }

    fn stat(size: u64) -> EntryMetadata {
        EntryMetadata {
            mtime: 1_700_000_000,
            mtime_nsec: 0,
            size,
            mode: EntryMode::default(),
        }
    }

    fn staged_paths(index: &Index) -> Vec<PathBuf> {
        index.paths().map(Path::to_path_buf).collect()
    }

    #[rstest]
    fn stage_overwrites_prior_entry(repo_dir: TempDir) {
        let (database, mut index) = setup(&repo_dir);

        index.stage(&database, Path::new("a.txt"), b"one", stat(3)).unwrap();
        let second = index.stage(&database, Path::new("a.txt"), b"two!", stat(4)).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.entry_by_path(Path::new("a.txt")).unwrap().oid, second);
        assert!(database.exists(&second));
    }

    #[rstest]
    fn file_replaces_directory_and_back(repo_dir: TempDir) {
        let (database, mut index) = setup(&repo_dir);

        index.stage(&database, Path::new("a/b/c.txt"), b"c", stat(1)).unwrap();
        index.stage(&database, Path::new("a/d.txt"), b"d", stat(1)).unwrap();
        index.stage(&database, Path::new("a"), b"file now", stat(8)).unwrap();
        assert_eq!(staged_paths(&index), vec![PathBuf::from("a")]);

        index.stage(&database, Path::new("a/e.txt"), b"e", stat(1)).unwrap();
        assert_eq!(staged_paths(&index), vec![PathBuf::from("a/e.txt")]);
    }

    #[rstest]
    fn unstage_removes_directories_recursively(repo_dir: TempDir) {
        let (database, mut index) = setup(&repo_dir);

        index.stage(&database, Path::new("keep.txt"), b"k", stat(1)).unwrap();
        index.stage(&database, Path::new("dir/x.txt"), b"x", stat(1)).unwrap();
        index.stage(&database, Path::new("dir/sub/y.txt"), b"y", stat(1)).unwrap();

        index.unstage(Path::new("dir"));

        assert_eq!(staged_paths(&index), vec![PathBuf::from("keep.txt")]);
        assert!(!index.is_tracked_dir(Path::new("dir")));
    }

    #[rstest]
    fn persists_and_reloads(repo_dir: TempDir) {
        let (database, mut index) = setup(&repo_dir);
        index.stage(&database, Path::new("1.txt"), b"one", stat(3)).unwrap();
        index.stage(&database, Path::new("a/b/3.txt"), b"three", stat(5)).unwrap();
        index.write_updates().unwrap();

        let mut reloaded = Index::new(index.path().to_path_buf().into_boxed_path());
        reloaded.rehydrate().unwrap();

        assert_eq!(
            reloaded.entries().cloned().collect::<Vec<_>>(),
            index.entries().cloned().collect::<Vec<_>>()
        );
        assert!(reloaded.is_tracked_dir(Path::new("a/b")));
    }

    #[rstest]
    fn shrinking_rewrite_leaves_no_stale_bytes(repo_dir: TempDir) {
        let (database, mut index) = setup(&repo_dir);
        index.stage(&database, Path::new("1.txt"), b"one", stat(3)).unwrap();
        index.stage(&database, Path::new("a/long/path/2.txt"), b"two", stat(3)).unwrap();
        index.stage(&database, Path::new("a/long/path/3.txt"), b"three", stat(5)).unwrap();
        index.write_updates().unwrap();
        let full_size = std::fs::metadata(index.path()).unwrap().len();

        index.unstage(Path::new("a"));
        index.write_updates().unwrap();
        assert!(std::fs::metadata(index.path()).unwrap().len() < full_size);

        let mut reloaded = Index::new(index.path().to_path_buf().into_boxed_path());
        reloaded.rehydrate().unwrap();
        assert_eq!(staged_paths(&reloaded), vec![PathBuf::from("1.txt")]);
    }

    #[rstest]
    fn trailing_bytes_fail_to_load(repo_dir: TempDir) {
        let (database, mut index) = setup(&repo_dir);
        index.stage(&database, Path::new("1.txt"), b"one", stat(3)).unwrap();
        index.write_updates().unwrap();

        let mut raw = std::fs::read(index.path()).unwrap();
        raw.extend_from_slice(b"stale");
        std::fs::write(index.path(), raw).unwrap();

        assert!(matches!(index.rehydrate(), Err(Error::Malformed { .. })));
    }

    #[rstest]
    fn tampered_index_fails_checksum(repo_dir: TempDir) {
        let (database, mut index) = setup(&repo_dir);
        index.stage(&database, Path::new("1.txt"), b"one", stat(3)).unwrap();
        index.write_updates().unwrap();

        let mut raw = std::fs::read(index.path()).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        std::fs::write(index.path(), raw).unwrap();

        assert!(matches!(index.rehydrate(), Err(Error::Malformed { .. })));
    }

    #[rstest]
    fn missing_file_is_an_empty_index(repo_dir: TempDir) {
        let (_, mut index) = setup(&repo_dir);

        index.rehydrate().unwrap();
        assert!(index.is_empty());
    }
}
