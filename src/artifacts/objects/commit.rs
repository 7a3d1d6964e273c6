//! Commit object
//!
//! Commits link a tree snapshot to history. They contain:
//! - A tree object ID (directory snapshot)
//! - Parent commit ID(s): none for a root commit, two for a merge commit
//! - Author and committer information
//! - Commit message
//!
//! ## Format
//!
//! On disk:
//! ```text
//! commit <size>\0
//! tree <tree-hex>
//! parent <parent-hex>
//! author <name> <unix-timestamp>
//! committer <name> <unix-timestamp>
//!
//! <commit message>
//! ```

use crate::artifacts::core::clock::Clock;
use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::io::BufRead;

/// Author or committer: a free-form name (by convention `Name <email>`) and a
/// Unix timestamp in seconds.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Author {
    name: String,
    timestamp: i64,
}

impl Author {
    pub fn new(name: String, timestamp: i64) -> Self {
        Author { name, timestamp }
    }

    /// Stamp `name` with the current reading of `clock`.
    pub fn now(name: String, clock: &dyn Clock) -> Self {
        Author::new(name, clock.now().timestamp())
    }

    /// Load the author name from `ARBOR_AUTHOR_NAME` and `ARBOR_AUTHOR_EMAIL`.
    pub fn load_name_from_env() -> anyhow::Result<String> {
        use anyhow::Context;

        let name = std::env::var("ARBOR_AUTHOR_NAME").context("ARBOR_AUTHOR_NAME not set")?;
        let email = std::env::var("ARBOR_AUTHOR_EMAIL").context("ARBOR_AUTHOR_EMAIL not set")?;

        Ok(format!("{name} <{email}>"))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Header form: `<name> <unix-timestamp>`
    pub fn display(&self) -> String {
        format!("{} {}", self.name, self.timestamp)
    }

    /// String like "Mon Jan 1 12:34:56 2024 +0000"
    pub fn readable_timestamp(&self) -> String {
        chrono::DateTime::from_timestamp(self.timestamp, 0)
            .map(|datetime| datetime.format("%a %b %-d %H:%M:%S %Y %z").to_string())
            .unwrap_or_else(|| self.timestamp.to_string())
    }
}

impl TryFrom<&str> for Author {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        // the name may contain spaces, the timestamp is always the last field
        let (name, timestamp) = value
            .rsplit_once(' ')
            .ok_or_else(|| Error::malformed("commit", "author line lacks a timestamp"))?;
        let timestamp = timestamp
            .parse::<i64>()
            .map_err(|_| Error::malformed("commit", format!("invalid timestamp {timestamp:?}")))?;

        Ok(Author::new(name.to_string(), timestamp))
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    parents: Vec<ObjectId>,
    tree_oid: ObjectId,
    author: Author,
    committer: Author,
    message: String,
}

impl Commit {
    pub fn new(parents: Vec<ObjectId>, tree_oid: ObjectId, author: Author, message: String) -> Self {
        Commit {
            parents,
            tree_oid,
            author: author.clone(),
            committer: author,
            message,
        }
    }

    /// First line of the message, for one-line displays.
    pub fn short_message(&self) -> String {
        self.message.lines().next().unwrap_or("").to_string()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    /// First parent; history walks follow this pointer.
    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn committer(&self) -> &Author {
        &self.committer
    }

    fn header_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("tree {}", self.tree_oid)];
        for parent in &self.parents {
            lines.push(format!("parent {parent}"));
        }
        lines.push(format!("author {}", self.author.display()));
        lines.push(format!("committer {}", self.committer.display()));

        lines
    }
}

impl Packable for Commit {
    fn serialize(&self) -> Result<Bytes> {
        let mut lines = self.header_lines();
        lines.push(String::new());
        lines.push(self.message.clone());

        Ok(Bytes::from(lines.join("\n")))
    }
}

impl Unpackable for Commit {
    fn deserialize(mut reader: impl BufRead) -> Result<Self> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|_| Error::malformed("commit", "content is not utf-8"))?;

        let (header, message) = content
            .split_once("\n\n")
            .ok_or_else(|| Error::malformed("commit", "missing blank line before message"))?;

        let mut tree_oid = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;

        for line in header.lines() {
            let (key, value) = line
                .split_once(' ')
                .ok_or_else(|| Error::malformed("commit", format!("bad header {line:?}")))?;

            match key {
                "tree" => tree_oid = Some(ObjectId::try_parse(value.to_string())?),
                "parent" => parents.push(ObjectId::try_parse(value.to_string())?),
                "author" => author = Some(Author::try_from(value)?),
                "committer" => committer = Some(Author::try_from(value)?),
                _ => {
                    return Err(Error::malformed(
                        "commit",
                        format!("unknown header field {key:?}"),
                    ));
                }
            }
        }

        let tree_oid = tree_oid.ok_or_else(|| Error::malformed("commit", "missing tree line"))?;
        let author = author.ok_or_else(|| Error::malformed("commit", "missing author line"))?;
        let committer = committer.unwrap_or_else(|| author.clone());

        Ok(Commit {
            parents,
            tree_oid,
            author,
            committer,
            message: message.to_string(),
        })
    }
}

impl Object for Commit {
    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }

    fn display(&self) -> String {
        let mut lines = self.header_lines();
        lines.push(String::new());
        lines.push(self.message.clone());

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn tree_oid() -> ObjectId {
        ObjectId::for_payload(ObjectType::Tree, b"")
    }

    #[fixture]
    fn author() -> Author {
        Author::new("Ada Lovelace <ada@example.com>".to_string(), 1_700_000_000)
    }

    #[rstest]
    fn root_commit_omits_parent_line(tree_oid: ObjectId, author: Author) {
        let commit = Commit::new(vec![], tree_oid.clone(), author, "first".to_string());
        let payload = commit.serialize().unwrap();

        let expected = format!(
            "tree {tree_oid}\nauthor Ada Lovelace <ada@example.com> 1700000000\n\
             committer Ada Lovelace <ada@example.com> 1700000000\n\nfirst"
        );
        assert_eq!(std::str::from_utf8(&payload).unwrap(), expected);
    }

    #[rstest]
    fn parses_multiline_message_and_parents(tree_oid: ObjectId, author: Author) {
        let parent = ObjectId::for_payload(ObjectType::Commit, b"parent");
        let other = ObjectId::for_payload(ObjectType::Commit, b"other");
        let commit = Commit::new(
            vec![parent.clone(), other.clone()],
            tree_oid,
            author.clone(),
            "subject\n\nbody line\n".to_string(),
        );

        let parsed = Commit::deserialize(commit.serialize().unwrap().as_ref()).unwrap();

        assert_eq!(parsed, commit);
        assert_eq!(parsed.parent(), Some(&parent));
        assert!(parsed.is_merge());
        assert_eq!(parsed.short_message(), "subject");
        assert_eq!(parsed.author(), &author);
    }

    #[rstest]
    fn missing_tree_is_malformed(author: Author) {
        let payload = format!("author {}\n\nmsg", author.display());
        assert!(matches!(
            Commit::deserialize(payload.as_bytes()),
            Err(Error::Malformed { .. })
        ));
    }

    #[rstest]
    fn missing_author_is_malformed(tree_oid: ObjectId) {
        let payload = format!("tree {tree_oid}\n\nmsg");
        assert!(matches!(
            Commit::deserialize(payload.as_bytes()),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn author_name_may_contain_spaces() {
        let author = Author::try_from("Grace B. Hopper <grace@navy.mil> 42").unwrap();
        assert_eq!(author.name(), "Grace B. Hopper <grace@navy.mil>");
        assert_eq!(author.timestamp(), 42);
    }
}
