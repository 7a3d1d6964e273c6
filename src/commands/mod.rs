//! Command implementations
//!
//! Each command is an `impl Repository` block, split into two groups:
//!
//! - `plumbing`: low-level object access (hash-object, cat-file, ls-tree)
//! - `porcelain`: user-facing workflows (add, commit, log, merge, etc.)
//!
//! Plumbing commands expose the building blocks; porcelain commands compose
//! them into higher-level operations.

pub mod plumbing;
pub mod porcelain;
