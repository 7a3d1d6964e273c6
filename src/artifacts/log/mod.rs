//! Commit graph traversal
//!
//! - `history`: lazy first-parent walk from a starting commit
//! - `reachable`: closed set of objects reachable from a commit, for transports

pub mod history;
pub mod reachable;
