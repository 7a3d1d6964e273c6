use crate::artifacts::index::CHECKSUM_SIZE;
use crate::error::{Error, Result};
use bytes::Bytes;
use file_guard::FileGuard;
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::ops::DerefMut;

/// Reader/writer over a locked index file that hashes every byte passing
/// through it, so the trailing checksum can be written or verified.
pub struct Checksum<'f> {
    file: FileGuard<&'f mut std::fs::File>,
    digest: Sha256,
}

impl<'f> Checksum<'f> {
    pub(crate) fn new(file: FileGuard<&'f mut std::fs::File>) -> Self {
        Checksum {
            file,
            digest: Sha256::new(),
        }
    }

    pub(crate) fn read(&mut self, size: usize) -> Result<Bytes> {
        let mut buffer = vec![0; size];
        self.file
            .deref_mut()
            .read_exact(&mut buffer)
            .map_err(|_| Error::malformed("index", "unexpected end of file"))?;

        self.digest.update(&buffer);
        Ok(Bytes::from(buffer))
    }

    pub(crate) fn write(&mut self, data: &[u8]) -> Result<()> {
        self.file.deref_mut().write_all(data)?;
        self.digest.update(data);
        Ok(())
    }

    pub(crate) fn write_checksum(&mut self) -> Result<()> {
        let checksum = self.digest.clone().finalize();
        self.file.deref_mut().write_all(checksum.as_slice())?;
        self.file.deref_mut().flush()?;

        Ok(())
    }

    pub(crate) fn verify(&mut self) -> Result<()> {
        let mut expected_checksum = [0u8; CHECKSUM_SIZE];
        self.file
            .deref_mut()
            .read_exact(&mut expected_checksum)
            .map_err(|_| Error::malformed("index", "missing checksum"))?;

        let actual_checksum = self.digest.clone().finalize();

        if expected_checksum.as_slice() != actual_checksum.as_slice() {
            return Err(Error::malformed(
                "index",
                "checksum does not match value stored on disk",
            ));
        }

        let mut trailing = [0u8; 1];
        if self.file.deref_mut().read(&mut trailing)? != 0 {
            return Err(Error::malformed("index", "data after checksum"));
        }

        Ok(())
    }
}
