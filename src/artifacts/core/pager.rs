use minus::Pager;
use std::io::{self, Write};

/// `Write` sink that feeds a minus pager, so `log` can page long histories
/// through the same writer it uses for stdout.
///
/// Invalid UTF-8 (blob text in a commit message, say) is pushed lossily
/// rather than failing the whole listing.
pub struct PagerWriter {
    pager: Pager,
}

impl PagerWriter {
    pub fn new(pager: Pager) -> Self {
        PagerWriter { pager }
    }
}

impl Write for PagerWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.pager.push_str(text).map_err(io::Error::other)?;

        Ok(buf.len())
    }

    // minus renders on its own schedule
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_accepted_whole() {
        let mut writer = PagerWriter::new(Pager::new());

        assert_eq!(writer.write(b"commit abc\n").unwrap(), 11);
        assert_eq!(writer.write(&[0xff, b'\n']).unwrap(), 2);
        writer.flush().unwrap();
    }
}
