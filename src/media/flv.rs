//! FLV tag framing
//!
//! FLV File Structure:
//! ```text
//! +============+==================+==============+==================+
//! | FLV Header | PrevTagSize0 (0) | Tag 1        | PrevTagSize1 ... |
//! | (9 bytes)  | (4 bytes)        | (11+N bytes) | (4 bytes)        |
//! +============+==================+==============+==================+
//! ```
//!
//! FLV Tag Header:
//! ```text
//! +--------+-------------+-----------+-------------+---------+
//! | Type(1)| DataSize(3) | TS(3+1)   | StreamID(3) | Data(N) |
//! +--------+-------------+-----------+-------------+---------+
//! ```
//!
//! The fourth timestamp byte is an extension holding bits 24-31.

use bytes::{Buf, Bytes};

use super::audio::AudioTagInfo;
use super::video::VideoTagInfo;
use crate::error::Result;
use crate::source::ByteSource;

/// File signature: "FLV" followed by version 1
pub const FLV_SIGNATURE: [u8; 4] = [0x46, 0x4C, 0x56, 0x01];

/// Size of the tag header preceding every payload
pub const TAG_HEADER_SIZE: usize = 11;

/// Size of the trailing previous tag size field
pub const PREVIOUS_TAG_SIZE_LEN: usize = 4;

/// Size of the AVC/HEVC video prefix (frame type/codec, packet type, composition time)
pub const VIDEO_PREFIX_SIZE: usize = 5;

/// FLV tag type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlvTagType {
    Audio,
    Video,
    Script,
    /// Any other type byte, kept as-is
    Other(u8),
}

impl FlvTagType {
    pub fn from_byte(b: u8) -> Self {
        match b {
            8 => FlvTagType::Audio,
            9 => FlvTagType::Video,
            18 => FlvTagType::Script,
            other => FlvTagType::Other(other),
        }
    }

    pub fn value(&self) -> u8 {
        match self {
            FlvTagType::Audio => 8,
            FlvTagType::Video => 9,
            FlvTagType::Script => 18,
            FlvTagType::Other(b) => *b,
        }
    }
}

/// Decoded 11-byte tag header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlvTagHeader {
    pub tag_type: FlvTagType,
    /// Payload size, not counting the header
    pub data_size: u32,
    /// Timestamp in milliseconds, extension byte included
    pub timestamp: u32,
    pub stream_id: u32,
}

impl FlvTagHeader {
    /// Decode a header from its raw bytes
    pub fn parse(bytes: &[u8; TAG_HEADER_SIZE]) -> Self {
        let mut buf = &bytes[..];
        let tag_type = FlvTagType::from_byte(buf.get_u8());
        let data_size = buf.get_uint(3) as u32;
        let low = buf.get_uint(3) as u32;
        let ext = buf.get_u8() as u32;
        let stream_id = buf.get_uint(3) as u32;

        Self {
            tag_type,
            data_size,
            timestamp: (ext << 24) | low,
            stream_id,
        }
    }

    /// Read a header from the source.
    ///
    /// Fails with `InsufficientData` when fewer than 11 bytes are available.
    pub fn read<S: ByteSource + ?Sized>(source: &mut S) -> Result<Self> {
        let mut bytes = [0u8; TAG_HEADER_SIZE];
        source.require(TAG_HEADER_SIZE as u64)?;
        source.read_into(&mut bytes)?;
        Ok(Self::parse(&bytes))
    }

    /// Size of header plus payload, the value the trailer should carry
    pub fn tag_size(&self) -> u32 {
        TAG_HEADER_SIZE as u32 + self.data_size
    }
}

/// Decoded payload of a tag
#[derive(Debug, Clone)]
pub enum TagBody {
    Video(VideoTagInfo),
    Audio(AudioTagInfo),
    Script,
    /// Tag with an unrecognised type byte
    Other,
    /// Tag with no payload bytes
    Empty,
}

/// One demultiplexed FLV tag
#[derive(Debug, Clone)]
pub struct FlvTag {
    /// Absolute offset of the tag header in the source
    pub address: u64,
    pub tag_type: FlvTagType,
    pub data_size: u32,
    /// Timestamp in milliseconds (DTS for video)
    pub timestamp: u32,
    pub stream_id: u32,
    pub body: TagBody,
    /// The whole tag, 11-byte header included. NAL offsets index into this.
    pub raw: Bytes,
    /// Trailing previous tag size field, `None` if the stream ended before it
    pub previous_tag_size: Option<u32>,
}

impl FlvTag {
    /// Assemble a tag from its parsed parts
    pub fn new(
        address: u64,
        header: FlvTagHeader,
        body: TagBody,
        raw: Bytes,
        previous_tag_size: Option<u32>,
    ) -> Self {
        Self {
            address,
            tag_type: header.tag_type,
            data_size: header.data_size,
            timestamp: header.timestamp,
            stream_id: header.stream_id,
            body,
            raw,
            previous_tag_size,
        }
    }

    /// Check if this is a video tag
    pub fn is_video(&self) -> bool {
        self.tag_type == FlvTagType::Video
    }

    /// Check if this is an audio tag
    pub fn is_audio(&self) -> bool {
        self.tag_type == FlvTagType::Audio
    }

    /// Video details, for non-empty video tags
    pub fn video(&self) -> Option<&VideoTagInfo> {
        match &self.body {
            TagBody::Video(info) => Some(info),
            _ => None,
        }
    }

    /// Audio details, for non-empty audio tags
    pub fn audio(&self) -> Option<&AudioTagInfo> {
        match &self.body {
            TagBody::Audio(info) => Some(info),
            _ => None,
        }
    }

    /// The payload, without the tag header
    pub fn payload(&self) -> Bytes {
        self.raw.slice(TAG_HEADER_SIZE.min(self.raw.len())..)
    }

    /// Header plus payload size
    pub fn tag_size(&self) -> u32 {
        TAG_HEADER_SIZE as u32 + self.data_size
    }

    /// Check if this is a video keyframe
    pub fn is_keyframe(&self) -> bool {
        self.video().map(|v| v.is_keyframe()).unwrap_or(false)
    }

    /// Check if this is an AVC/HEVC or AAC sequence header
    pub fn is_sequence_header(&self) -> bool {
        match &self.body {
            TagBody::Video(v) => v.is_sequence_header(),
            TagBody::Audio(a) => a.is_sequence_header(),
            _ => false,
        }
    }

    /// Whether the trailer matches `11 + data_size` (true when it is missing)
    pub fn previous_tag_size_matches(&self) -> bool {
        self.previous_tag_size
            .map(|p| p == self.tag_size())
            .unwrap_or(true)
    }
}
