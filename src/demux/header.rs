//! FLV file header
//!
//! ```text
//! +-----------+---------+-------+----------------+------------------+
//! | "FLV" (3) | Ver (1) | Flags | DataOffset (4) | PrevTagSize0 (4) |
//! +-----------+---------+-------+----------------+------------------+
//! ```
//!
//! Flags: bit 0 video present, bit 2 audio present.

use crate::error::{Error, Result};
use crate::media::flv::FLV_SIGNATURE;
use crate::source::ByteSource;

/// Size of the file header up to the first previous tag size
pub const FILE_HEADER_SIZE: u64 = 9;

/// Matroska/WebM EBML magic
const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// ISO BMFF `ftyp` box type, found at offset 4
const FTYP: [u8; 4] = *b"ftyp";

/// Decoded file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u8,
    pub flags: u8,
    /// Declared header size; the first previous tag size follows it
    pub data_offset: u32,
}

impl FileHeader {
    /// Read the header from the start of the source.
    ///
    /// Returns `Ok(None)` when the signature matches but the rest of the
    /// header has not arrived.
    pub fn read<S: ByteSource + ?Sized>(source: &mut S) -> Result<Option<Self>> {
        source.seek(0)?;
        check_signature(source)?;

        if !source.request(5) {
            return Ok(None);
        }
        let flags = source.read_u8()?;
        let data_offset = source.read_u32()?;

        Ok(Some(Self {
            version: FLV_SIGNATURE[3],
            flags,
            data_offset,
        }))
    }

    pub fn has_audio(&self) -> bool {
        self.flags & 0x04 != 0
    }

    pub fn has_video(&self) -> bool {
        self.flags & 0x01 != 0
    }

    /// Offset of the first previous tag size field.
    ///
    /// A data offset smaller than the header itself is treated as 9.
    pub fn data_start(&self) -> u64 {
        (self.data_offset as u64).max(FILE_HEADER_SIZE)
    }
}

/// Identify a known non-FLV container from the first bytes of a file
pub fn detect_container(head: &[u8]) -> Option<&'static str> {
    if head.starts_with(&EBML_MAGIC) {
        return Some("Matroska/WebM");
    }
    if head.get(4..8) == Some(&FTYP[..]) {
        return Some("MP4");
    }
    None
}

fn check_signature<S: ByteSource + ?Sized>(source: &mut S) -> Result<()> {
    let mut magic = [0u8; 4];
    if source.request(4) {
        source.read_into(&mut magic)?;
        if magic == FLV_SIGNATURE {
            return Ok(());
        }
    }

    source.seek(0)?;
    let len = source.available().min(8) as usize;
    let head = source.read_bytes(len)?;
    let source_name = source.describe();

    match detect_container(&head) {
        Some(container) => Err(Error::WrongContainer {
            source_name,
            container,
        }),
        None => Err(Error::NotThisFormat { source_name }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SliceSource;
    use bytes::Bytes;

    #[test]
    fn test_read_header() {
        let mut src = SliceSource::new(Bytes::from_static(&[
            0x46, 0x4C, 0x56, 0x01, 0x05, 0x00, 0x00, 0x00, 0x09, 0x00, 0x00, 0x00, 0x00,
        ]));
        let header = FileHeader::read(&mut src).unwrap().unwrap();
        assert_eq!(header.version, 1);
        assert!(header.has_audio());
        assert!(header.has_video());
        assert_eq!(header.data_start(), 9);
        assert_eq!(src.position(), 9);
    }

    #[test]
    fn test_truncated_header() {
        let mut src = SliceSource::new(Bytes::from_static(&[0x46, 0x4C, 0x56, 0x01, 0x01]));
        assert!(FileHeader::read(&mut src).unwrap().is_none());
    }

    #[test]
    fn test_small_data_offset() {
        let header = FileHeader {
            version: 1,
            flags: 1,
            data_offset: 3,
        };
        assert_eq!(header.data_start(), 9);
        assert!(!header.has_audio());
    }

    #[test]
    fn test_wrong_container() {
        let mut src = SliceSource::with_name(
            Bytes::from_static(b"\x00\x00\x00\x20ftypisom\x00\x00\x02\x00"),
            "clip.mp4",
        );
        match FileHeader::read(&mut src) {
            Err(Error::WrongContainer {
                source_name,
                container,
            }) => {
                assert_eq!(source_name, "clip.mp4");
                assert_eq!(container, "MP4");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let mut src = SliceSource::new(Bytes::from_static(&[0x1A, 0x45, 0xDF, 0xA3, 0x9F]));
        match FileHeader::read(&mut src) {
            Err(Error::WrongContainer { container, .. }) => assert_eq!(container, "Matroska/WebM"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_not_this_format() {
        // Wrong version byte
        let mut src = SliceSource::new(Bytes::from_static(&[0x46, 0x4C, 0x56, 0x02, 0x05]));
        assert!(matches!(
            FileHeader::read(&mut src),
            Err(Error::NotThisFormat { .. })
        ));

        let mut src = SliceSource::new(Bytes::from_static(b"FL"));
        assert!(matches!(
            FileHeader::read(&mut src),
            Err(Error::NotThisFormat { .. })
        ));
    }

    #[test]
    fn test_detect_container() {
        assert_eq!(detect_container(b"\x00\x00\x00\x18ftypmp42"), Some("MP4"));
        assert_eq!(detect_container(&EBML_MAGIC), Some("Matroska/WebM"));
        assert_eq!(detect_container(b"RIFF"), None);
        assert_eq!(detect_container(&[]), None);
    }
}
