//! Object types and operations
//!
//! All content is stored as immutable, content-addressed objects:
//!
//! - **Blob**: File content (raw bytes)
//! - **Tree**: Directory listing (modes, kinds, object IDs and names)
//! - **Commit**: Snapshot with metadata (tree, parents, author, message)
//!
//! Every object is framed as `<type> <size>\0<payload>` and identified by the
//! SHA-256 of that framed form.

pub mod blob;
pub mod commit;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tree;
pub mod tree_codec;

/// Length of a SHA-256 digest in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 64;

/// Length of a SHA-256 digest in raw bytes
pub const OBJECT_ID_RAW_LENGTH: usize = 32;

/// Shortest hex prefix accepted as an abbreviated object ID
pub const OBJECT_ID_MIN_PREFIX: usize = 4;
