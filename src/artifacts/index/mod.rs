//! Index file format
//!
//! The index (staging area) stores the proposed next tree snapshot as a flat
//! map of path to (blob digest, size, modification time, mode).
//!
//! ## File Format (Version 1)
//!
//! ```text
//! Header (12 bytes):
//!   - Signature: "ARBI" (4 bytes)
//!   - Version: 1 (4 bytes)
//!   - Entry count (4 bytes)
//!
//! Entries (variable length, sorted by path):
//!   - mtime seconds (8), mtime nanoseconds (4), size (8), mode (4)
//!   - digest (32 raw bytes)
//!   - path length (2) followed by the UTF-8 path
//!
//! Checksum (32 bytes):
//!   - SHA-256 of all preceding bytes
//! ```

pub mod checksum;
pub mod entry_mode;
pub mod index_entry;

/// Size of SHA-256 checksum in bytes
pub const CHECKSUM_SIZE: usize = 32;

/// Size of index header in bytes
pub const HEADER_SIZE: usize = 12;

/// Magic signature identifying index files
pub const SIGNATURE: &[u8; 4] = b"ARBI";

/// Index file format version
pub const VERSION: u32 = 1;
