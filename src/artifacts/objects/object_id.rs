//! Object identifier (SHA-256 digest)
//!
//! Object IDs are 64-character lowercase hexadecimal strings. They are the
//! sole identity and storage key of every blob, tree and commit.
//!
//! ## Storage
//!
//! Objects are stored in `.arbor/objects/<first-2-chars>/<remaining-62-chars>`

use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::{OBJECT_ID_LENGTH, OBJECT_ID_RAW_LENGTH};
use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate an object ID from a string
    pub fn try_parse(id: String) -> Result<Self> {
        if id.len() != OBJECT_ID_LENGTH {
            return Err(Error::InvalidObjectId(id));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidObjectId(id));
        }
        Ok(Self(id.to_ascii_lowercase()))
    }

    /// Digest of a framed object: `sha256("<kind> <len>\0" ++ payload)`.
    pub fn for_payload(object_type: ObjectType, payload: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(object_type.header(payload.len()).as_bytes());
        hasher.update(payload);

        Self(format!("{:x}", hasher.finalize()))
    }

    /// Write the object ID as 32 raw bytes.
    pub fn write_raw_to<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        let hex = self.as_ref();

        for i in (0..OBJECT_ID_LENGTH).step_by(2) {
            let byte = u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| Error::InvalidObjectId(self.0.clone()))?;
            writer.write_all(&[byte])?;
        }

        Ok(())
    }

    /// Read an object ID from 32 raw bytes.
    pub fn read_raw_from<R: io::Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut buffer = [0u8; OBJECT_ID_RAW_LENGTH];
        reader.read_exact(&mut buffer)?;

        let hex = buffer
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect::<String>();

        Self::try_parse(hex)
    }

    /// Splits the hash as `XX/YYYY...` where XX is the first 2 chars.
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.0.split_at(2);
        PathBuf::from(dir).join(file)
    }

    pub fn to_short_oid(&self) -> String {
        self.0.split_at(7).0.to_string()
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
