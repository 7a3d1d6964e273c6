//! Value types and algorithms built on the areas
//!
//! - `branch`: branch names and revision expressions
//! - `checkout`: materializing a tree into the working directory and index
//! - `core`: clock and pager writer
//! - `database`: tree entries as stored in the object database
//! - `diff`: longest-common-subsequence line diff
//! - `index`: index entries, modes and the checksummed file codec
//! - `log`: history walks and reachability
//! - `merge`: ancestry search and three-way merge
//! - `objects`: object ids, kinds and the blob/tree/commit codecs
//! - `status`: HEAD vs index vs working directory comparison

pub mod branch;
pub mod checkout;
pub mod core;
pub mod database;
pub mod diff;
pub mod index;
pub mod log;
pub mod merge;
pub mod objects;
pub mod status;
