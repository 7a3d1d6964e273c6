use crate::areas::repository::Repository;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use std::io::Write;
use std::path::Path;

impl Repository {
    pub fn hash_object(&self, file: &Path, write: bool) -> anyhow::Result<()> {
        let content =
            std::fs::read(file).with_context(|| format!("cannot read {}", file.display()))?;

        let oid = if write {
            self.database().put(ObjectType::Blob, &content)?
        } else {
            ObjectId::for_payload(ObjectType::Blob, &content)
        };

        writeln!(self.writer(), "{oid}")?;

        Ok(())
    }
}
