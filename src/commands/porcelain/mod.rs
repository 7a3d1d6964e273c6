//! Porcelain commands
//!
//! User-facing workflows built on the repository handle. Each command writes
//! its human-readable output to the repository's writer.
//!
//! ## Commands
//!
//! - `init`: create a repository
//! - `add` / `rm`: stage and unstage paths
//! - `commit`: record the index as a new commit
//! - `status`: show staged, unstaged and untracked changes
//! - `diff`: line diff of unstaged or staged changes
//! - `log`: first-parent history
//! - `branch`: create, list or delete branches
//! - `checkout`: switch branches or detach HEAD
//! - `reset`: move the current ref and reload the index
//! - `merge`: merge a revision into HEAD

pub mod add;
pub mod branch;
pub mod checkout;
pub mod commit;
pub mod diff;
pub mod init;
pub mod log;
pub mod merge;
pub mod reset;
pub mod rm;
pub mod status;
