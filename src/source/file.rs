//! File-backed byte source

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::ByteSource;
use crate::error::{Error, Result};

/// Byte source reading from a file on disk.
///
/// The file length is re-read when a request would otherwise fail, so a
/// recording that is still being written can be followed without reopening.
#[derive(Debug)]
pub struct FileSource {
    reader: BufReader<File>,
    path: PathBuf,
    pos: u64,
    len: u64,
}

impl FileSource {
    /// Open `path` for reading
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            reader: BufReader::new(file),
            path,
            pos: 0,
            len,
        })
    }

    /// Length of the file when last checked
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Check if the file was empty when last checked
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn refresh_len(&mut self) {
        match self.reader.get_ref().metadata() {
            Ok(meta) => self.len = meta.len(),
            Err(e) => {
                tracing::debug!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to refresh file length"
                );
            }
        }
    }
}

impl ByteSource for FileSource {
    fn describe(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn available(&self) -> u64 {
        self.len.saturating_sub(self.pos)
    }

    fn request(&mut self, len: u64) -> bool {
        if self.available() >= len {
            return true;
        }
        self.refresh_len();
        self.available() >= len
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        // Keeps buffered bytes when the target is inside the buffer
        self.reader.seek_relative(offset as i64 - self.pos as i64)?;
        self.pos = offset;
        Ok(())
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        let len = buf.len() as u64;
        if !self.request(len) {
            return Err(Error::insufficient(len, self.available()));
        }
        if let Err(e) = self.reader.read_exact(buf) {
            // A partial read moved the reader; put it back at `pos`
            self.reader.seek(SeekFrom::Start(self.pos))?;
            return Err(e.into());
        }
        self.pos += len;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_source_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reads.flv");
        std::fs::write(&path, b"FLV\x01\x05\x00\x00\x00\x09").unwrap();

        let mut src = FileSource::open(&path).unwrap();
        assert_eq!(src.len(), 9);
        assert_eq!(src.describe(), "reads.flv");
        assert_eq!(src.read_u32().unwrap(), 0x464C5601);
        assert_eq!(src.read_u8().unwrap(), 0x05);
        assert_eq!(src.read_u32().unwrap(), 9);
        assert!(!src.request(1));

        src.seek(1).unwrap();
        assert_eq!(src.read_u8().unwrap(), b'L');
    }

    #[test]
    fn test_file_source_follows_growth() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1, 2]).unwrap();
        file.flush().unwrap();

        let mut src = FileSource::open(file.path()).unwrap();
        assert_eq!(src.read_bytes(2).unwrap().as_ref(), &[1, 2]);
        assert!(!src.request(2));

        file.write_all(&[3, 4]).unwrap();
        file.flush().unwrap();
        assert!(src.request(2));
        assert_eq!(src.read_bytes(2).unwrap().as_ref(), &[3, 4]);
    }

    #[test]
    fn test_failed_read_keeps_position() {
        let data: Vec<u8> = (0..20_000u32).map(|i| i as u8).collect();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();
        file.flush().unwrap();

        let mut src = FileSource::open(file.path()).unwrap();
        assert_eq!(src.read_u8().unwrap(), 0);

        // Shrink the file behind the cached length, past the read buffer
        file.as_file().set_len(100).unwrap();
        let mut buf = vec![0u8; 16_000];
        assert!(src.read_into(&mut buf).is_err());
        assert_eq!(src.position(), 1);

        assert_eq!(src.read_u8().unwrap(), 1);
        src.seek(50).unwrap();
        assert_eq!(src.read_u8().unwrap(), 50);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSource::open(dir.path().join("does-not-exist.flv")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
