//! Merging two branch tips
//!
//! - `common_ancestor`: ancestry checks and the merge-base search
//! - `resolution`: per-path three-way rules and conflict markers
//! - `merge_engine`: the state machine tying them to the repository

pub mod common_ancestor;
pub mod merge_engine;
pub mod resolution;

use crate::artifacts::objects::object_id::ObjectId;
use std::path::PathBuf;

/// How a conflicted path disagrees between the two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Both sides changed the file; the working copy holds conflict markers
    Content,
    /// One side has a file where the other has a directory. The current
    /// side's shape stays checked out and the target's entries are written
    /// beside it under `<path>~<target>`
    FileDirectory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConflict {
    pub path: PathBuf,
    pub kind: ConflictKind,
}

/// Terminal state of a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Target already contained in the current history
    UpToDate,
    /// Current ref moved to the target without a new commit
    FastForward(ObjectId),
    /// New merge commit recorded with both tips as parents
    Merged(ObjectId),
    /// Conflicts left in the working tree; nothing committed until the user resolves
    Conflicted {
        base: ObjectId,
        conflicts: Vec<MergeConflict>,
    },
}
