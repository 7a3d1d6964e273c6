//! Plumbing commands
//!
//! Direct access to the object database, mostly for scripting and debugging.
//!
//! - `hash-object`: compute a blob digest, optionally storing the blob
//! - `cat-file`: print a stored object
//! - `ls-tree`: list the entries of a tree (or a commit's tree)

pub mod cat_file;
pub mod hash_object;
pub mod ls_tree;
