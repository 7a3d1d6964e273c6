//! Materializing a tree into the working directory and index
//!
//! Used by branch switching, fast-forward merges and clean merges. This is
//! the one operation that overwrites working files wholesale; callers decide
//! beforehand whether local changes may be lost.

pub mod materialize;
