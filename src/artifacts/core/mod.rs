//! Shared utilities
//!
//! - `clock`: timestamp source for commits
//! - `pager`: `Write` adapter over the minus pager used by `log`

pub mod clock;
pub mod pager;
