//! Mutable on-disk areas of a repository
//!
//! - `database`: content-addressed object store
//! - `index`: staging area for the next commit
//! - `refs`: branches and HEAD
//! - `repository`: the handle tying the areas together
//! - `workspace`: working directory reader/writer

pub mod database;
pub mod index;
pub mod refs;
pub mod repository;
pub mod workspace;
