//! Byte sources feeding the demuxer
//!
//! The demuxer reads through [`ByteSource`], a sequential, seekable,
//! big-endian byte provider. Three implementations ship with the crate:
//!
//! - [`SliceSource`]: an in-memory buffer, never blocks
//! - [`FileSource`]: a file on disk, follows a file that is still growing
//! - [`LiveSource`]: a buffer filled by a producer (see [`LiveFeed`] and
//!   [`pump`]); blocks until the requested bytes arrive
//!
//! Blocking is part of the source contract. The demuxer itself never polls.

pub mod file;
pub mod live;
pub mod slice;

pub use file::FileSource;
pub use live::{live_source, pump, LiveFeed, LiveSource};
pub use slice::SliceSource;

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Sequential, seekable byte provider
pub trait ByteSource {
    /// Name used in error messages (file name, URL, ...)
    fn describe(&self) -> String;

    /// Absolute read position
    fn position(&self) -> u64;

    /// Bytes currently available past the read position, without waiting
    fn available(&self) -> u64;

    /// Whether at least `len` bytes are available past the read position.
    ///
    /// Live sources may block here until the bytes arrive or the source ends.
    fn request(&mut self, len: u64) -> bool;

    /// Move the read position to an absolute offset.
    ///
    /// Seeking past the currently available data is allowed; later requests
    /// simply report the data as unavailable.
    fn seek(&mut self, offset: u64) -> Result<()>;

    /// Fill `buf` completely, or fail with `InsufficientData`
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Also stop blocking in `request` once `token` is cancelled.
    ///
    /// Sources that never block ignore it.
    fn set_cancellation(&mut self, _token: CancellationToken) {}

    /// Read `len` bytes into a new buffer
    fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(len);
        self.read_into(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Read one byte
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_into(&mut buf)?;
        Ok(buf[0])
    }

    /// Read a 24-bit big-endian value
    fn read_u24(&mut self) -> Result<u32> {
        let mut buf = [0u8; 3];
        self.read_into(&mut buf)?;
        Ok((&buf[..]).get_uint(3) as u32)
    }

    /// Read a 32-bit big-endian value
    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok((&buf[..]).get_u32())
    }

    /// Require `len` bytes or fail with `InsufficientData`
    fn require(&mut self, len: u64) -> Result<()> {
        if self.request(len) {
            Ok(())
        } else {
            Err(Error::insufficient(len, self.available()))
        }
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn available(&self) -> u64 {
        (**self).available()
    }

    fn request(&mut self, len: u64) -> bool {
        (**self).request(len)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        (**self).seek(offset)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read_into(buf)
    }

    fn set_cancellation(&mut self, token: CancellationToken) {
        (**self).set_cancellation(token)
    }
}
