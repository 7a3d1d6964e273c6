//! Tree object
//!
//! Trees represent directory snapshots. They hold one entry per immediate child:
//! files (blobs) and subdirectories (other trees), keyed by name.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`
//! Each entry: `<mode> <kind> <hex-digest> <name>\n`
//!
//! Entries are kept in a `BTreeMap`, so serialization always emits them in
//! lexicographic name order and equal directory contents hash identically
//! regardless of insertion order.

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::BufRead;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: BTreeMap<String, DatabaseEntry>,
}

impl Tree {
    pub fn insert(&mut self, name: String, entry: DatabaseEntry) -> Result<()> {
        if name.is_empty() || name.contains(['/', '\n', '\0']) {
            return Err(Error::InvalidPath(name.into()));
        }
        self.entries.insert(name, entry);

        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &DatabaseEntry)> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> impl Iterator<Item = (String, DatabaseEntry)> {
        self.entries.into_iter()
    }
}

impl Packable for Tree {
    fn serialize(&self) -> Result<Bytes> {
        let content = self
            .entries
            .iter()
            .map(|(name, entry)| {
                format!(
                    "{} {} {} {}\n",
                    entry.mode.as_str(),
                    entry.mode.object_type().as_str(),
                    entry.oid.as_ref(),
                    name
                )
            })
            .collect::<String>();

        Ok(Bytes::from(content))
    }
}

impl Unpackable for Tree {
    fn deserialize(mut reader: impl BufRead) -> Result<Self> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|_| Error::malformed("tree", "entries are not utf-8"))?;

        // names may end in `\r`, so only `\n` terminates an entry
        let mut tree = Tree::default();
        for line in content.split_terminator('\n') {
            let mut fields = line.splitn(4, ' ');
            let (Some(mode), Some(kind), Some(oid), Some(name)) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                return Err(Error::malformed("tree", format!("bad entry {line:?}")));
            };

            let mode = EntryMode::try_from(mode)?;
            let kind = ObjectType::try_from(kind)?;
            if kind != mode.object_type() {
                return Err(Error::malformed(
                    "tree",
                    format!("entry {name:?} has mode {mode} but kind {kind}"),
                ));
            }
            let oid = ObjectId::try_parse(oid.to_string())?;

            tree.insert(name.to_string(), DatabaseEntry::new(oid, mode))?;
        }

        Ok(tree)
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn display(&self) -> String {
        self.entries
            .iter()
            .map(|(name, entry)| {
                format!(
                    "{} {} {}\t{}",
                    entry.mode.as_str(),
                    entry.mode.object_type().as_str(),
                    entry.oid.as_ref(),
                    name
                )
            })
            .collect::<Vec<String>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::entry_mode::FileMode;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn blob_oid() -> ObjectId {
        ObjectId::for_payload(ObjectType::Blob, b"content")
    }

    #[rstest]
    fn serializes_entries_in_name_order(blob_oid: ObjectId) {
        let mut tree = Tree::default();
        let entry = DatabaseEntry::new(blob_oid.clone(), EntryMode::File(FileMode::Regular));
        tree.insert("zeta.txt".to_string(), entry.clone()).unwrap();
        tree.insert("alpha.txt".to_string(), entry).unwrap();

        let payload = tree.serialize().unwrap();
        let expected = format!(
            "100644 blob {blob_oid} alpha.txt\n100644 blob {blob_oid} zeta.txt\n"
        );
        assert_eq!(std::str::from_utf8(&payload).unwrap(), expected);
    }

    #[rstest]
    fn parses_names_containing_spaces(blob_oid: ObjectId) {
        let payload = format!("100755 blob {blob_oid} run me.sh\n");
        let tree = Tree::deserialize(payload.as_bytes()).unwrap();

        let (name, entry) = tree.entries().next().unwrap();
        assert_eq!(name, "run me.sh");
        assert_eq!(entry.mode, EntryMode::File(FileMode::Executable));
    }

    #[rstest]
    fn keeps_carriage_returns_in_names(blob_oid: ObjectId) {
        let mut tree = Tree::default();
        let entry = DatabaseEntry::new(blob_oid, EntryMode::default());
        tree.insert("notes\r".to_string(), entry.clone()).unwrap();
        tree.insert("\r".to_string(), entry).unwrap();

        let parsed = Tree::deserialize(&tree.serialize().unwrap()[..]).unwrap();

        assert_eq!(parsed, tree);
    }

    #[rstest]
    fn rejects_kind_that_disagrees_with_mode(blob_oid: ObjectId) {
        let payload = format!("040000 blob {blob_oid} dir\n");
        assert!(matches!(
            Tree::deserialize(payload.as_bytes()),
            Err(Error::Malformed { .. })
        ));
    }

    #[rstest]
    fn rejects_names_with_separators(blob_oid: ObjectId) {
        let mut tree = Tree::default();
        let entry = DatabaseEntry::new(blob_oid, EntryMode::default());
        assert!(tree.insert("a/b".to_string(), entry).is_err());
    }

    #[test]
    fn empty_tree_has_empty_payload() {
        assert!(Tree::default().serialize().unwrap().is_empty());
    }
}
