//! Content-addressed version-control engine
//!
//! The engine stores blobs, trees and commits in a sharded object database,
//! stages snapshots in a binary index, and walks the commit graph for history,
//! line diffs and three-way merges. Everything goes through a
//! [`Repository`](areas::repository::Repository) handle.

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod error;
