use crate::error::{Error, Result};
use std::io::BufRead;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Tree => "tree",
            ObjectType::Commit => "commit",
        }
    }

    /// Frame header written in front of every stored payload: `"<kind> <len>\0"`.
    pub fn header(&self, payload_len: usize) -> String {
        format!("{} {}\0", self.as_str(), payload_len)
    }

    /// Reads `"<kind> <len>\0"` and returns the kind and the declared length.
    pub fn parse_header(data_reader: &mut impl BufRead) -> Result<(ObjectType, usize)> {
        let mut object_type = Vec::new();
        data_reader.read_until(b' ', &mut object_type)?;
        if object_type.pop() != Some(b' ') {
            return Err(Error::malformed("object header", "missing kind separator"));
        }

        let object_type = std::str::from_utf8(&object_type)
            .map_err(|_| Error::malformed("object header", "kind is not utf-8"))?;
        let object_type = ObjectType::try_from(object_type)?;

        let mut size = Vec::new();
        data_reader.read_until(b'\0', &mut size)?;
        if size.pop() != Some(b'\0') {
            return Err(Error::malformed("object header", "missing size terminator"));
        }

        let size = std::str::from_utf8(&size)
            .ok()
            .and_then(|size| size.parse::<usize>().ok())
            .ok_or_else(|| Error::malformed("object header", "size is not a number"))?;

        Ok((object_type, size))
    }
}

impl TryFrom<&str> for ObjectType {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "blob" => Ok(ObjectType::Blob),
            "tree" => Ok(ObjectType::Tree),
            "commit" => Ok(ObjectType::Commit),
            other => Err(Error::malformed(
                "object header",
                format!("unknown object kind {other:?}"),
            )),
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::Cursor;

    #[rstest]
    #[case(b"blob 5\0hello".as_slice(), ObjectType::Blob, 5)]
    #[case(b"tree 0\0".as_slice(), ObjectType::Tree, 0)]
    #[case(b"commit 12\0".as_slice(), ObjectType::Commit, 12)]
    fn parses_well_formed_headers(
        #[case] raw: &[u8],
        #[case] kind: ObjectType,
        #[case] size: usize,
    ) {
        let mut reader = Cursor::new(raw);
        assert_eq!(ObjectType::parse_header(&mut reader).unwrap(), (kind, size));
    }

    #[rstest]
    #[case(b"blob5\0".as_slice())]
    #[case(b"tag 3\0abc".as_slice())]
    #[case(b"blob five\0".as_slice())]
    #[case(b"blob 5".as_slice())]
    fn rejects_malformed_headers(#[case] raw: &[u8]) {
        let mut reader = Cursor::new(raw);
        assert!(matches!(
            ObjectType::parse_header(&mut reader),
            Err(Error::Malformed { .. })
        ));
    }
}
