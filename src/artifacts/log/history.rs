use crate::areas::database::Database;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::error::Result;

/// Forward-only walk from a commit through its first parents.
///
/// The walk is finite: a commit can only name parents that already existed
/// when it was written, so the chain has no cycles. A load failure is yielded
/// once and ends the walk.
#[derive(Debug, Clone)]
pub struct History<'d> {
    database: &'d Database,
    next_commit_oid: Option<ObjectId>,
}

impl<'d> History<'d> {
    pub fn new(database: &'d Database, start: Option<ObjectId>) -> Self {
        History {
            database,
            next_commit_oid: start,
        }
    }
}

impl Iterator for History<'_> {
    type Item = Result<(ObjectId, Commit)>;

    fn next(&mut self) -> Option<Self::Item> {
        let commit_oid = self.next_commit_oid.take()?;

        match self.database.load_commit(&commit_oid) {
            Ok(commit) => {
                self.next_commit_oid = commit.parent().cloned();
                Some(Ok((commit_oid, commit)))
            }
            Err(err) => Some(Err(err)),
        }
    }
}
