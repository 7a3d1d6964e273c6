//! Index entry representation
//!
//! Each entry represents a staged file with:
//! - File path (repository-relative, `/`-separated)
//! - Content digest (blob object ID)
//! - Metadata used as a dirty-check shortcut (size, mtime, mode)
//!
//! The modification time only decides whether content has to be re-hashed;
//! the digest is always the authority on whether a file changed.

use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
use crate::artifacts::objects::object::{Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::error::{Error, Result};
use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use is_executable::IsExecutable;
use std::fs::Metadata;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Size of the fixed part of a serialized entry, up to and including the path length
pub const ENTRY_FIXED_SIZE: usize = 8 + 4 + 8 + 4 + 32 + 2;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct IndexEntry {
    /// File path relative to repository root
    pub name: PathBuf,
    /// Digest of the staged blob
    pub oid: ObjectId,
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    pub fn basename(&self) -> Result<&str> {
        self.name
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::InvalidPath(self.name.clone()))
    }

    /// Every proper ancestor directory of the entry, outermost first.
    pub fn parent_dirs(&self) -> Vec<&Path> {
        let mut dirs = self
            .name
            .ancestors()
            .skip(1)
            .filter(|dir| !dir.as_os_str().is_empty())
            .collect::<Vec<_>>();
        dirs.reverse();

        dirs
    }

    pub fn stat_match(&self, other: &EntryMetadata) -> bool {
        self.metadata.size == other.size && self.metadata.mode == other.mode
    }

    pub fn times_match(&self, other: &EntryMetadata) -> bool {
        self.metadata.mtime == other.mtime && self.metadata.mtime_nsec == other.mtime_nsec
    }
}

/// Working-file metadata recorded when a path is staged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Modification time (seconds since Unix epoch)
    pub mtime: i64,
    /// Modification time nanoseconds
    pub mtime_nsec: u32,
    /// File size in bytes
    pub size: u64,
    /// File mode (regular or executable)
    pub mode: EntryMode,
}

impl Packable for IndexEntry {
    fn serialize(&self) -> Result<Bytes> {
        let name = self
            .name
            .to_str()
            .ok_or_else(|| Error::InvalidPath(self.name.clone()))?;
        let name_len =
            u16::try_from(name.len()).map_err(|_| Error::InvalidPath(self.name.clone()))?;

        let mut entry_bytes = Vec::with_capacity(ENTRY_FIXED_SIZE + name.len());
        entry_bytes.write_i64::<NetworkEndian>(self.metadata.mtime)?;
        entry_bytes.write_u32::<NetworkEndian>(self.metadata.mtime_nsec)?;
        entry_bytes.write_u64::<NetworkEndian>(self.metadata.size)?;
        entry_bytes.write_u32::<NetworkEndian>(self.metadata.mode.as_u32())?;
        self.oid.write_raw_to(&mut entry_bytes)?;
        entry_bytes.write_u16::<NetworkEndian>(name_len)?;
        entry_bytes.write_all(name.as_bytes())?;

        Ok(Bytes::from(entry_bytes))
    }
}

impl Unpackable for IndexEntry {
    /// Expects the fixed part followed by exactly the path bytes.
    fn deserialize(mut reader: impl BufRead) -> Result<Self> {
        let truncated = |_| Error::malformed("index entry", "truncated entry");

        let mtime = reader.read_i64::<NetworkEndian>().map_err(truncated)?;
        let mtime_nsec = reader.read_u32::<NetworkEndian>().map_err(truncated)?;
        let size = reader.read_u64::<NetworkEndian>().map_err(truncated)?;
        let mode = EntryMode::try_from(reader.read_u32::<NetworkEndian>().map_err(truncated)?)?;
        let oid = ObjectId::read_raw_from(&mut reader)?;
        let name_len = reader.read_u16::<NetworkEndian>().map_err(truncated)? as usize;

        let mut name = vec![0u8; name_len];
        reader.read_exact(&mut name).map_err(truncated)?;
        let name = String::from_utf8(name)
            .map_err(|_| Error::malformed("index entry", "path is not utf-8"))?;

        Ok(IndexEntry {
            name: PathBuf::from(name),
            oid,
            metadata: EntryMetadata {
                mtime,
                mtime_nsec,
                size,
                mode,
            },
        })
    }
}

impl From<(&Path, &Metadata)> for EntryMetadata {
    fn from((file_path, metadata): (&Path, &Metadata)) -> Self {
        let mode = if metadata.is_dir() {
            EntryMode::Directory
        } else if file_path.is_executable() {
            EntryMode::File(FileMode::Executable)
        } else {
            EntryMode::File(FileMode::Regular)
        };

        let (mtime, mtime_nsec) = metadata
            .modified()
            .ok()
            .and_then(|modified| modified.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|elapsed| (elapsed.as_secs() as i64, elapsed.subsec_nanos()))
            .unwrap_or_default();

        Self {
            mtime,
            mtime_nsec,
            size: metadata.len(),
            mode,
        }
    }
}
