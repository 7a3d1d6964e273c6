use crate::areas::repository::Repository;
use std::io::Write;

impl Repository {
    /// Print the object a revision or (abbreviated) digest names.
    pub fn cat_file(&self, object: &str) -> anyhow::Result<()> {
        let oid = self
            .resolve_revision(object)?
            .ok_or_else(|| anyhow::anyhow!("not a valid object name: {object}"))?;

        let object = self.database().parse_object(&oid)?;
        write!(self.writer(), "{}", object.display())?;

        Ok(())
    }
}
