//! Line diff
//!
//! - `lcs`: longest-common-subsequence line diff producing an edit script
//!
//! The diff is line-granular only; there is no word or character level.

pub mod lcs;
