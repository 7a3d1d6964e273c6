//! Conversion between flat path maps and nested tree objects
//!
//! `build` groups `/`-separated paths by directory and stores every directory
//! level bottom-up, since a parent's entry for a child needs the child's
//! digest. `flatten` walks a stored tree back into a flat map. Both use an
//! explicit work list instead of recursion, so directory depth is bounded by
//! memory rather than by the call stack.

use crate::areas::database::Database;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use crate::error::{Error, Result};
use derive_new::new;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Repository-relative file path mapped to the blob it holds.
pub type FlatTree = BTreeMap<PathBuf, DatabaseEntry>;

#[derive(new)]
pub struct TreeCodec<'d> {
    database: &'d Database,
}

impl TreeCodec<'_> {
    /// Store the nested trees for `entries` and return the root tree's digest.
    pub fn build(&self, entries: &FlatTree) -> Result<ObjectId> {
        let mut levels = BTreeMap::<PathBuf, Tree>::new();
        levels.insert(PathBuf::new(), Tree::default());

        for (path, entry) in entries {
            let (parent, name) = split_path(path)?;
            for ancestor in parent.ancestors() {
                levels.entry(ancestor.to_path_buf()).or_default();
            }

            levels
                .get_mut(&parent)
                .ok_or_else(|| Error::InvalidPath(path.clone()))?
                .insert(name, entry.clone())?;
        }

        // deepest directories first, so every child digest exists before its parent is written
        let mut directories = levels.keys().cloned().collect::<Vec<_>>();
        directories.sort_by_key(|dir| Reverse(dir.components().count()));

        for directory in directories {
            if directory.as_os_str().is_empty() {
                continue;
            }

            let tree = levels
                .remove(&directory)
                .ok_or_else(|| Error::InvalidPath(directory.clone()))?;
            let oid = self.database.store(&tree)?;

            let (parent, name) = split_path(&directory)?;
            let parent_tree = levels
                .get_mut(&parent)
                .ok_or_else(|| Error::InvalidPath(directory.clone()))?;
            // a file already holds this name
            if parent_tree.contains(&name) {
                return Err(Error::InvalidPath(directory));
            }
            parent_tree.insert(name, DatabaseEntry::new(oid, EntryMode::Directory))?;
        }

        let root = levels.remove(Path::new("")).unwrap_or_default();
        self.database.store(&root)
    }

    /// Expand a stored tree into a flat path map of its blobs.
    pub fn flatten(&self, tree_oid: &ObjectId) -> Result<FlatTree> {
        let mut flat = FlatTree::new();
        let mut pending = vec![(PathBuf::new(), tree_oid.clone())];

        while let Some((prefix, oid)) = pending.pop() {
            let tree = self.database.load_tree(&oid)?;

            for (name, entry) in tree.into_entries() {
                let path = prefix.join(name);
                if entry.is_tree() {
                    pending.push((path, entry.oid));
                } else {
                    flat.insert(path, entry);
                }
            }
        }

        Ok(flat)
    }
}

/// Split `a/b/c` into (`a/b`, `"c"`), rejecting anything that is not a plain
/// relative path.
fn split_path(path: &Path) -> Result<(PathBuf, String)> {
    if path
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        return Err(Error::InvalidPath(path.to_path_buf()));
    }

    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::InvalidPath(path.to_path_buf()))?;
    let parent = path.parent().unwrap_or(Path::new("")).to_path_buf();

    Ok((parent, name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::entry_mode::FileMode;
    use crate::artifacts::objects::object_type::ObjectType;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn objects_dir() -> TempDir {
        TempDir::new().expect("Failed to create temp dir")
    }

    fn database(dir: &TempDir) -> Database {
        Database::new(dir.path().join("objects").into_boxed_path())
    }

    fn blob_entry(database: &Database, content: &str) -> DatabaseEntry {
        let oid = database.put(ObjectType::Blob, content.as_bytes()).unwrap();
        DatabaseEntry::new(oid, EntryMode::File(FileMode::Regular))
    }

    #[rstest]
    fn nested_paths_become_nested_trees(objects_dir: TempDir) {
        let database = database(&objects_dir);
        let codec = TreeCodec::new(&database);

        let mut entries = FlatTree::new();
        entries.insert("1.txt".into(), blob_entry(&database, "one"));
        entries.insert("a/2.txt".into(), blob_entry(&database, "two"));
        entries.insert("a/b/3.txt".into(), blob_entry(&database, "three"));

        let root_oid = codec.build(&entries).unwrap();
        let root = database.load_tree(&root_oid).unwrap();
        let names = root.entries().map(|(name, _)| name.clone()).collect::<Vec<_>>();
        assert_eq!(names, vec!["1.txt".to_string(), "a".to_string()]);

        let (_, subtree) = root.entries().nth(1).unwrap();
        assert!(subtree.is_tree());

        assert_eq!(codec.flatten(&root_oid).unwrap(), entries);
    }

    #[rstest]
    fn empty_map_builds_the_empty_tree(objects_dir: TempDir) {
        let database = database(&objects_dir);
        let codec = TreeCodec::new(&database);

        let root_oid = codec.build(&FlatTree::new()).unwrap();

        assert_eq!(root_oid, ObjectId::for_payload(ObjectType::Tree, b""));
        assert!(codec.flatten(&root_oid).unwrap().is_empty());
    }

    #[rstest]
    fn flattening_a_blob_is_a_kind_error(objects_dir: TempDir) {
        let database = database(&objects_dir);
        let codec = TreeCodec::new(&database);
        let entry = blob_entry(&database, "not a tree");

        assert!(matches!(
            codec.flatten(&entry.oid),
            Err(Error::WrongKind { .. })
        ));
    }

    #[rstest]
    fn rejects_parent_directory_components(objects_dir: TempDir) {
        let database = database(&objects_dir);
        let codec = TreeCodec::new(&database);

        let mut entries = FlatTree::new();
        entries.insert("../escape.txt".into(), blob_entry(&database, "x"));

        assert!(matches!(codec.build(&entries), Err(Error::InvalidPath(_))));
    }

    #[rstest]
    fn rejects_a_path_that_is_both_file_and_directory(objects_dir: TempDir) {
        let database = database(&objects_dir);
        let codec = TreeCodec::new(&database);

        let mut entries = FlatTree::new();
        entries.insert("d".into(), blob_entry(&database, "file"));
        entries.insert("d/f".into(), blob_entry(&database, "nested"));

        assert!(matches!(
            codec.build(&entries),
            Err(Error::InvalidPath(path)) if path == Path::new("d")
        ));
    }

    fn path_map() -> impl Strategy<Value = BTreeMap<PathBuf, String>> {
        let segment = "[a-z\r ]{1,3}";
        let path = proptest::collection::vec(segment, 1..4)
            .prop_map(|segments| segments.join("/"));
        proptest::collection::btree_map(path, "[a-z0-9]{0,8}", 0..12).prop_map(|map| {
            // drop paths that would make a file and a directory share a name
            let keys = map.keys().cloned().collect::<Vec<_>>();
            map.into_iter()
                .filter(|(path, _)| {
                    !keys
                        .iter()
                        .any(|other| other != path && other.starts_with(&format!("{path}/")))
                })
                .map(|(path, content)| (PathBuf::from(path), content))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn flatten_inverts_build(contents in path_map()) {
            let dir = TempDir::new().unwrap();
            let database = database(&dir);
            let codec = TreeCodec::new(&database);

            let entries = contents
                .iter()
                .map(|(path, content)| (path.clone(), blob_entry(&database, content)))
                .collect::<FlatTree>();

            let root_oid = codec.build(&entries).unwrap();
            prop_assert_eq!(codec.flatten(&root_oid).unwrap(), entries);
        }

        #[test]
        fn build_ignores_insertion_order(contents in path_map()) {
            let dir = TempDir::new().unwrap();
            let database = database(&dir);
            let codec = TreeCodec::new(&database);

            let forward = contents
                .iter()
                .map(|(path, content)| (path.clone(), blob_entry(&database, content)))
                .collect::<FlatTree>();
            let mut backward = FlatTree::new();
            for (path, entry) in forward.iter().rev() {
                backward.insert(path.clone(), entry.clone());
            }

            prop_assert_eq!(codec.build(&forward).unwrap(), codec.build(&backward).unwrap());
        }
    }
}
