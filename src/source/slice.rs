//! In-memory byte source

use bytes::Bytes;

use super::ByteSource;
use crate::error::{Error, Result};

/// Byte source over a complete in-memory buffer
#[derive(Debug, Clone)]
pub struct SliceSource {
    data: Bytes,
    pos: u64,
    name: String,
}

impl SliceSource {
    /// Create a source over `data`
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self::with_name(data, "<memory>")
    }

    /// Create a source with a name used in error messages
    pub fn with_name(data: impl Into<Bytes>, name: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            name: name.into(),
        }
    }

    /// Total length of the underlying buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the underlying buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ByteSource for SliceSource {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn available(&self) -> u64 {
        (self.data.len() as u64).saturating_sub(self.pos)
    }

    fn request(&mut self, len: u64) -> bool {
        self.available() >= len
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        self.pos = offset;
        Ok(())
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        let len = buf.len() as u64;
        if len == 0 {
            return Ok(());
        }
        if !self.request(len) {
            return Err(Error::insufficient(len, self.available()));
        }
        let start = self.pos as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        self.pos += len;
        Ok(())
    }

    fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        if len == 0 {
            return Ok(Bytes::new());
        }
        if !self.request(len as u64) {
            return Err(Error::insufficient(len as u64, self.available()));
        }
        let start = self.pos as usize;
        self.pos += len as u64;
        Ok(self.data.slice(start..start + len))
    }
}
