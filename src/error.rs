//! Engine error types
//!
//! Every engine operation reports failures through [`Error`]. Errors are raised
//! at the point of detection and never retried internally; retry policy belongs
//! to whatever drives the engine (a transport, the CLI, a test).

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("object {0} not found")]
    ObjectNotFound(ObjectId),

    #[error("object {oid} is corrupt: {reason}")]
    Corrupt { oid: ObjectId, reason: String },

    #[error("malformed {kind}: {reason}")]
    Malformed { kind: &'static str, reason: String },

    #[error("object {oid} is a {actual}, expected a {expected}")]
    WrongKind {
        oid: ObjectId,
        expected: ObjectType,
        actual: ObjectType,
    },

    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("short object id {prefix} is ambiguous ({count} candidates)")]
    AmbiguousObjectId { prefix: String, count: usize },

    #[error("nothing to commit")]
    NothingToCommit,

    #[error("no commits yet on {0}")]
    NoCommits(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("branch {0} not found")]
    BranchNotFound(String),

    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("cannot delete the checked-out branch {0}")]
    CurrentBranch(String),

    #[error("a merge is already in progress; commit the resolution first")]
    MergeInProgress,

    #[error("no common ancestor between {current} and {target}")]
    NoCommonAncestor { current: ObjectId, target: ObjectId },

    #[error("ref {name} moved: expected {expected}, found {actual}")]
    StaleRef {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("not an arbor repository (or any parent directory): {0}")]
    NotARepository(PathBuf),

    #[error("invalid path: {0}")]
    InvalidPath(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(kind: &'static str, reason: impl Into<String>) -> Self {
        Error::Malformed {
            kind,
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(oid: &ObjectId, reason: impl Into<String>) -> Self {
        Error::Corrupt {
            oid: oid.clone(),
            reason: reason.into(),
        }
    }
}
