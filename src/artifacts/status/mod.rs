//! Working tree status
//!
//! Compares three snapshots of every path: the HEAD commit's tree, the index,
//! and the working directory.
//!
//! ## Components
//!
//! - `file_change`: change kinds for the index and workspace sides
//! - `inspector`: per-entry comparisons
//! - `status_info`: the full scan and its result

pub mod file_change;
pub mod inspector;
pub mod status_info;
