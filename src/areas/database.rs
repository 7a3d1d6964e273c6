//! Object database
//!
//! Content-addressed, zlib-compressed storage for blobs, trees and commits,
//! sharded by the first two hex characters of the digest. Objects are
//! write-once: storing an object that already exists is a no-op.

use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::{Object, ObjectBox, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use crate::error::{Error, Result};
use bytes::Bytes;
use fake::rand;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
}

// TODO: implement packfiles for better performance and storage efficiency
impl Database {
    pub fn new(path: Box<Path>) -> Self {
        Database { path }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    /// Store `payload` as an object of the given kind and return its digest.
    ///
    /// The object file is only created on first write; later writes of the
    /// same content return the existing digest without touching the disk.
    pub fn put(&self, object_type: ObjectType, payload: &[u8]) -> Result<ObjectId> {
        let oid = ObjectId::for_payload(object_type, payload);
        let object_path = self.path.join(oid.to_path());

        if object_path.exists() {
            return Ok(oid);
        }

        let object_dir = object_path
            .parent()
            .ok_or_else(|| Error::InvalidPath(object_path.clone()))?;
        std::fs::create_dir_all(object_dir)?;

        let mut framed = Vec::with_capacity(payload.len() + 16);
        framed.extend_from_slice(object_type.header(payload.len()).as_bytes());
        framed.extend_from_slice(payload);

        self.write_object(object_path, &framed)?;
        tracing::debug!(%oid, kind = %object_type, size = payload.len(), "stored object");

        Ok(oid)
    }

    pub fn store(&self, object: &impl Object) -> Result<ObjectId> {
        let payload = object.serialize()?;
        self.put(object.object_type(), &payload)
    }

    /// Load an object and return its kind and payload.
    pub fn get(&self, object_id: &ObjectId) -> Result<(ObjectType, Bytes)> {
        let object_path = self.path.join(object_id.to_path());
        let compressed = match std::fs::read(&object_path) {
            Ok(compressed) => compressed,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ObjectNotFound(object_id.clone()));
            }
            Err(err) => return Err(err.into()),
        };

        let framed = Self::decompress(&compressed)
            .map_err(|err| Error::corrupt(object_id, format!("cannot decompress: {err}")))?;
        let mut reader = Cursor::new(framed);

        let (object_type, size) = ObjectType::parse_header(&mut reader)
            .map_err(|err| Error::corrupt(object_id, err.to_string()))?;

        let offset = reader.position() as usize;
        let framed = reader.into_inner();
        let payload = framed.slice(offset..);

        if payload.len() != size {
            return Err(Error::corrupt(
                object_id,
                format!("header declares {size} bytes, found {}", payload.len()),
            ));
        }
        if &ObjectId::for_payload(object_type, &payload) != object_id {
            return Err(Error::corrupt(object_id, "content does not match digest"));
        }

        Ok((object_type, payload))
    }

    pub fn exists(&self, object_id: &ObjectId) -> bool {
        self.path.join(object_id.to_path()).is_file()
    }

    pub fn parse_object(&self, object_id: &ObjectId) -> Result<ObjectBox> {
        let (object_type, payload) = self.get(object_id)?;
        let reader = Cursor::new(payload);

        match object_type {
            ObjectType::Blob => Ok(ObjectBox::Blob(Box::new(Blob::deserialize(reader)?))),
            ObjectType::Tree => Ok(ObjectBox::Tree(Box::new(Tree::deserialize(reader)?))),
            ObjectType::Commit => Ok(ObjectBox::Commit(Box::new(Commit::deserialize(reader)?))),
        }
    }

    pub fn load_blob(&self, object_id: &ObjectId) -> Result<Blob> {
        let payload = self.get_expecting(object_id, ObjectType::Blob)?;
        Blob::deserialize(Cursor::new(payload))
    }

    pub fn load_tree(&self, object_id: &ObjectId) -> Result<Tree> {
        let payload = self.get_expecting(object_id, ObjectType::Tree)?;
        Tree::deserialize(Cursor::new(payload))
    }

    pub fn load_commit(&self, object_id: &ObjectId) -> Result<Commit> {
        let payload = self.get_expecting(object_id, ObjectType::Commit)?;
        Commit::deserialize(Cursor::new(payload))
    }

    pub fn get_object_type(&self, object_id: &ObjectId) -> Result<ObjectType> {
        Ok(self.get(object_id)?.0)
    }

    fn get_expecting(&self, object_id: &ObjectId, expected: ObjectType) -> Result<Bytes> {
        let (actual, payload) = self.get(object_id)?;

        if actual != expected {
            return Err(Error::WrongKind {
                oid: object_id.clone(),
                expected,
                actual,
            });
        }

        Ok(payload)
    }

    fn write_object(&self, object_path: PathBuf, framed: &[u8]) -> Result<()> {
        let object_dir = object_path
            .parent()
            .ok_or_else(|| Error::InvalidPath(object_path.clone()))?;
        let temp_object_path = object_dir.join(Self::generate_temp_name());

        let compressed = Self::compress(framed)?;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_object_path)?;
        file.write_all(&compressed)?;
        file.sync_all()?;

        // rename the temp file to the object file to make it atomic
        std::fs::rename(&temp_object_path, &object_path)?;

        Ok(())
    }

    fn compress(data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data)?;

        Ok(encoder.finish()?)
    }

    fn decompress(data: &[u8]) -> std::io::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut decompressed_content = Vec::new();
        decoder.read_to_end(&mut decompressed_content)?;

        Ok(decompressed_content.into())
    }

    fn generate_temp_name() -> String {
        format!("tmp-obj-{}", rand::random::<u32>())
    }

    /// Find all objects whose ID starts with the given hex prefix.
    ///
    /// For prefixes of 2+ characters only the matching shard directory is
    /// scanned; shorter prefixes scan every shard.
    pub fn find_objects_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectId>> {
        let prefix = prefix.to_ascii_lowercase();
        let mut matches = Vec::new();

        let shards = if prefix.len() >= 2 {
            vec![prefix[..2].to_string()]
        } else {
            (0..=255u8).map(|i| format!("{i:02x}")).collect()
        };

        for shard in shards {
            let dir_path = self.path.join(&shard);
            if !dir_path.is_dir() {
                continue;
            }

            for entry in std::fs::read_dir(&dir_path)? {
                let file_name = entry?.file_name();
                let full_oid = format!("{}{}", shard, file_name.to_string_lossy());

                if full_oid.starts_with(&prefix)
                    && let Ok(oid) = ObjectId::try_parse(full_oid)
                {
                    matches.push(oid);
                }
            }
        }

        matches.sort();
        Ok(matches)
    }
}
