//! NAL unit records and the walkers shared by H.264 and HEVC
//!
//! Three layouts carry NAL units inside a video tag:
//!
//! ```text
//! length-prefixed:  | len (1-4) | NAL ... | len | NAL ... |
//! parameter set:    | len (2)   | NAL ... |                 (inside AVCC/HVCC records)
//! Annex-B:          | 00 00 01 | NAL ... | 00 00 00 01 | NAL ... |
//! ```
//!
//! All offsets are absolute positions in the buffer handed in, which for the
//! demuxer is the full tag including its 11-byte header.

use std::fmt;

use bytes::Buf;

use super::h264::AvcNalType;
use super::hevc::HevcNalType;
use crate::error::{Error, Result};

/// Codec-specific NAL unit type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalType {
    Avc(AvcNalType),
    Hevc(HevcNalType),
}

impl NalType {
    /// Check if the unit starts a random access point
    pub fn is_keyframe(&self) -> bool {
        match self {
            NalType::Avc(t) => t.is_keyframe(),
            NalType::Hevc(t) => t.is_keyframe(),
        }
    }

    /// Check if the unit is a VPS/SPS/PPS
    pub fn is_parameter_set(&self) -> bool {
        match self {
            NalType::Avc(t) => t.is_parameter_set(),
            NalType::Hevc(t) => t.is_parameter_set(),
        }
    }
}

impl fmt::Display for NalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NalType::Avc(t) => t.fmt(f),
            NalType::Hevc(t) => t.fmt(f),
        }
    }
}

/// One NAL unit found in a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalUnitRecord {
    pub nal_type: NalType,
    /// Offset of the NAL header byte, right after the length field or start code
    pub offset: usize,
}

/// Which NAL header layout to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalCodec {
    /// Type in bits 0-4 of the first byte
    Avc,
    /// Type in bits 1-6 of the first byte
    Hevc,
}

impl NalCodec {
    pub fn classify(&self, header: u8) -> NalType {
        match self {
            NalCodec::Avc => NalType::Avc(AvcNalType::from_byte(header)),
            NalCodec::Hevc => NalType::Hevc(HevcNalType::from_byte(header)),
        }
    }

    fn record(&self, buf: &[u8], offset: usize) -> NalUnitRecord {
        NalUnitRecord {
            nal_type: self.classify(buf[offset]),
            offset,
        }
    }
}

/// Result of walking the NAL units of one tag
#[derive(Debug, Default)]
pub struct NalScan {
    /// Units found, in stream order
    pub units: Vec<NalUnitRecord>,
    /// Why the walk stopped early, if it did
    pub error: Option<Error>,
}

impl NalScan {
    pub(crate) fn run(walk: impl FnOnce(&mut Vec<NalUnitRecord>) -> Result<()>) -> Self {
        let mut units = Vec::new();
        let error = walk(&mut units).err();
        Self { units, error }
    }

    /// Check if the walk stopped on a malformed structure
    pub fn is_truncated(&self) -> bool {
        self.error.is_some()
    }
}

/// Read a `width`-byte big-endian field at `offset`
pub(crate) fn read_be(buf: &[u8], offset: usize, width: usize) -> Result<usize> {
    let available = buf.len().saturating_sub(offset);
    if available < width {
        return Err(Error::malformed(offset, width, available));
    }
    Ok((&buf[offset..offset + width]).get_uint(width) as usize)
}

/// Record the unit whose `len` bytes start at `offset`, and return the offset after it.
///
/// The unit is recorded as soon as its header byte is in the buffer; a body
/// that runs past the end still fails the walk.
fn take_unit(
    buf: &[u8],
    offset: usize,
    len: usize,
    codec: NalCodec,
    units: &mut Vec<NalUnitRecord>,
) -> Result<usize> {
    if len == 0 {
        return Ok(offset);
    }
    let available = buf.len().saturating_sub(offset);
    if available == 0 {
        return Err(Error::malformed(offset, len, 0));
    }
    units.push(codec.record(buf, offset));
    if len > available {
        return Err(Error::malformed(offset, len, available));
    }
    Ok(offset + len)
}

/// Walk NAL units prefixed by `length_size`-byte lengths, from `start` to the end of `buf`
pub(crate) fn walk_length_prefixed(
    buf: &[u8],
    start: usize,
    length_size: usize,
    codec: NalCodec,
    units: &mut Vec<NalUnitRecord>,
) -> Result<()> {
    let mut offset = start;
    while offset < buf.len() {
        let len = read_be(buf, offset, length_size)?;
        offset = take_unit(buf, offset + length_size, len, codec, units)?;
    }
    Ok(())
}

/// Walk `count` parameter set entries (2-byte length + NAL), advancing `offset`
pub(crate) fn walk_parameter_sets(
    buf: &[u8],
    offset: &mut usize,
    count: usize,
    codec: NalCodec,
    units: &mut Vec<NalUnitRecord>,
) -> Result<()> {
    for _ in 0..count {
        let len = read_be(buf, *offset, 2)?;
        *offset = take_unit(buf, *offset + 2, len, codec, units)?;
    }
    Ok(())
}

/// Find `00 00 01` start codes from `start` on and record the unit following each.
///
/// A four-byte `00 00 00 01` code is matched by its last three bytes.
pub(crate) fn scan_annexb(
    buf: &[u8],
    start: usize,
    codec: NalCodec,
    units: &mut Vec<NalUnitRecord>,
) -> Result<()> {
    let mut i = start + 2;
    while i < buf.len() {
        if buf[i] == 1 && buf[i - 1] == 0 && buf[i - 2] == 0 {
            let header = i + 1;
            if header >= buf.len() {
                return Err(Error::malformed(header, 1, 0));
            }
            units.push(codec.record(buf, header));
            i += 3;
            continue;
        }
        i += 1;
    }
    Ok(())
}
