use crate::areas::database::Database;
use crate::artifacts::objects::object_id::ObjectId;
use crate::error::Result;
use std::collections::BTreeSet;

/// Every digest reachable from `commit_oid`: the commit, all of its ancestors
/// (through every parent), and their trees, subtrees and blobs.
///
/// Blobs are not loaded, only their presence in a tree is recorded.
pub fn collect_reachable(database: &Database, commit_oid: &ObjectId) -> Result<BTreeSet<ObjectId>> {
    let mut reachable = BTreeSet::new();
    let mut pending_commits = vec![commit_oid.clone()];
    let mut pending_trees = Vec::new();

    while let Some(oid) = pending_commits.pop() {
        if !reachable.insert(oid.clone()) {
            continue;
        }

        let commit = database.load_commit(&oid)?;
        pending_trees.push(commit.tree_oid().clone());
        pending_commits.extend(commit.parents().iter().cloned());
    }

    while let Some(tree_oid) = pending_trees.pop() {
        if !reachable.insert(tree_oid.clone()) {
            continue;
        }

        for (_, entry) in database.load_tree(&tree_oid)?.into_entries() {
            if entry.is_tree() {
                pending_trees.push(entry.oid);
            } else {
                reachable.insert(entry.oid);
            }
        }
    }

    tracing::debug!(%commit_oid, objects = reachable.len(), "collected reachable objects");
    Ok(reachable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::database::database_entry::DatabaseEntry;
    use crate::artifacts::index::entry_mode::EntryMode;
    use crate::artifacts::objects::commit::{Author, Commit};
    use crate::artifacts::objects::object_type::ObjectType;
    use crate::artifacts::objects::tree_codec::{FlatTree, TreeCodec};
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;

    #[test]
    fn includes_ancestors_trees_and_blobs() {
        let dir = TempDir::new().unwrap();
        let database = Database::new(dir.path().join("objects").into_boxed_path());
        let codec = TreeCodec::new(&database);
        let author = Author::new("A U Thor".to_string(), 0);

        let one = database.put(ObjectType::Blob, b"1").unwrap();
        let two = database.put(ObjectType::Blob, b"2").unwrap();
        let unrelated = database.put(ObjectType::Blob, b"unrelated").unwrap();

        let mut files = FlatTree::new();
        files.insert("a.txt".into(), DatabaseEntry::new(one.clone(), EntryMode::default()));
        let first_tree = codec.build(&files).unwrap();
        let first = database
            .store(&Commit::new(vec![], first_tree.clone(), author.clone(), "A".into()))
            .unwrap();

        files.insert("dir/b.txt".into(), DatabaseEntry::new(two.clone(), EntryMode::default()));
        let second_tree = codec.build(&files).unwrap();
        let second = database
            .store(&Commit::new(vec![first.clone()], second_tree.clone(), author, "B".into()))
            .unwrap();
        let subtree = database
            .load_tree(&second_tree)
            .unwrap()
            .entries()
            .find(|(name, _)| name.as_str() == "dir")
            .map(|(_, entry)| entry.oid.clone())
            .unwrap();

        let reachable = collect_reachable(&database, &second).unwrap();

        let expected = BTreeSet::from([second, first, second_tree, first_tree, subtree, one, two]);
        assert_eq!(reachable, expected);
        assert!(!reachable.contains(&unrelated));
    }
}
