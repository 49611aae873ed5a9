//! Video tag payload parsing
//!
//! FLV Video Data:
//! ```text
//! +----------+----------+---------------+-----------------+
//! | FrameType| CodecID  | AVCPacketType | CompositionTime | CodecData...
//! | (4 bits) | (4 bits) | (1 byte)      | (3 bytes)       |
//! +----------+----------+---------------+-----------------+
//! ```
//!
//! Only AVC and HEVC carry the packet type and composition time; other codecs
//! get frame type and codec id only.

use std::fmt;

use bytes::Buf;

use super::flv::{TAG_HEADER_SIZE, VIDEO_PREFIX_SIZE};
use super::h264::{scan_avc_config, scan_avc_nalus, AvcPacketType, DecoderConfigScan};
use super::hevc::{scan_hevc_annexb, scan_hevc_nalus, scan_hvcc_config};
use super::nal::{NalScan, NalUnitRecord};
use crate::config::DEFAULT_NALU_LENGTH_SIZE;
use crate::error::{Error, Result};

/// Offset of the first NAL byte in a full AVC/HEVC tag
const NAL_DATA_OFFSET: usize = TAG_HEADER_SIZE + VIDEO_PREFIX_SIZE;

/// Video frame type (upper 4 bits of first byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFrameType {
    /// Keyframe (for AVC, a seekable frame)
    Keyframe,
    /// Inter frame (for AVC, a non-seekable frame)
    InterFrame,
    /// Disposable inter frame (H.263 only)
    DisposableInterFrame,
    /// Generated keyframe (reserved for server use)
    GeneratedKeyframe,
    /// Video info/command frame
    VideoInfoFrame,
    Unknown(u8),
}

impl VideoFrameType {
    pub fn from_byte(b: u8) -> Self {
        match (b >> 4) & 0x0F {
            1 => VideoFrameType::Keyframe,
            2 => VideoFrameType::InterFrame,
            3 => VideoFrameType::DisposableInterFrame,
            4 => VideoFrameType::GeneratedKeyframe,
            5 => VideoFrameType::VideoInfoFrame,
            other => VideoFrameType::Unknown(other),
        }
    }

    pub fn value(&self) -> u8 {
        match self {
            VideoFrameType::Keyframe => 1,
            VideoFrameType::InterFrame => 2,
            VideoFrameType::DisposableInterFrame => 3,
            VideoFrameType::GeneratedKeyframe => 4,
            VideoFrameType::VideoInfoFrame => 5,
            VideoFrameType::Unknown(v) => *v,
        }
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(
            self,
            VideoFrameType::Keyframe | VideoFrameType::GeneratedKeyframe
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            VideoFrameType::Keyframe => "key frame",
            VideoFrameType::InterFrame => "inter frame",
            VideoFrameType::DisposableInterFrame => "disposable inter frame (H.263 only)",
            VideoFrameType::GeneratedKeyframe => "generated key frame",
            VideoFrameType::VideoInfoFrame => "video info/command frame",
            VideoFrameType::Unknown(_) => "(unknown)",
        }
    }
}

impl fmt::Display for VideoFrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name(), self.value())
    }
}

/// Video codec ID (lower 4 bits of first byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    /// Sorenson H.263
    SorensonH263,
    /// Screen video
    ScreenVideo,
    /// VP6
    Vp6,
    /// VP6 with alpha
    Vp6Alpha,
    /// Screen video v2
    ScreenVideoV2,
    /// AVC (H.264)
    Avc,
    /// HEVC (H.265)
    Hevc,
    Unknown(u8),
}

impl VideoCodec {
    pub fn from_byte(b: u8) -> Self {
        match b & 0x0F {
            2 => VideoCodec::SorensonH263,
            3 => VideoCodec::ScreenVideo,
            4 => VideoCodec::Vp6,
            5 => VideoCodec::Vp6Alpha,
            6 => VideoCodec::ScreenVideoV2,
            7 => VideoCodec::Avc,
            12 => VideoCodec::Hevc,
            other => VideoCodec::Unknown(other),
        }
    }

    pub fn value(&self) -> u8 {
        match self {
            VideoCodec::SorensonH263 => 2,
            VideoCodec::ScreenVideo => 3,
            VideoCodec::Vp6 => 4,
            VideoCodec::Vp6Alpha => 5,
            VideoCodec::ScreenVideoV2 => 6,
            VideoCodec::Avc => 7,
            VideoCodec::Hevc => 12,
            VideoCodec::Unknown(v) => *v,
        }
    }

    /// Codecs whose payload starts with packet type and composition time
    pub fn has_nal_units(&self) -> bool {
        matches!(self, VideoCodec::Avc | VideoCodec::Hevc)
    }

    pub fn name(&self) -> &'static str {
        match self {
            VideoCodec::SorensonH263 => "Sorenson H.263",
            VideoCodec::ScreenVideo => "Screen video",
            VideoCodec::Vp6 => "On2 VP6",
            VideoCodec::Vp6Alpha => "On2 VP6 with alpha channel",
            VideoCodec::ScreenVideoV2 => "Screen video version 2",
            VideoCodec::Avc => "h264",
            VideoCodec::Hevc => "h265",
            VideoCodec::Unknown(_) => "(unknown)",
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name(), self.value())
    }
}

/// Decode the 24-bit composition time field.
///
/// Bit 23 is moved to bit 31 and the low 23 bits are kept as they are. This
/// is not two's-complement sign extension; captured streams are read this way.
pub fn composition_time_from_raw(raw: u32) -> i32 {
    (((raw & 0x0080_0000) << 8) | (raw & 0x007F_FFFF)) as i32
}

/// Two's-complement reading of the 24-bit composition time field
pub fn composition_time_sign_extended(raw: u32) -> i32 {
    ((raw << 8) as i32) >> 8
}

/// Parsed video tag payload
#[derive(Debug, Clone)]
pub struct VideoTagInfo {
    pub frame_type: VideoFrameType,
    pub codec: VideoCodec,
    /// Packet type, for AVC/HEVC payloads long enough to carry one
    pub packet_type: Option<AvcPacketType>,
    /// PTS - DTS offset in milliseconds (AVC/HEVC only, 0 otherwise)
    pub composition_time: i32,
    /// The undecoded 24-bit composition time field
    pub composition_time_raw: u32,
    /// NAL units in stream order
    pub nal_units: Vec<NalUnitRecord>,
    /// The NAL walk stopped early on a malformed structure
    pub truncated: bool,
}

impl VideoTagInfo {
    fn new(frame_type: VideoFrameType, codec: VideoCodec) -> Self {
        Self {
            frame_type,
            codec,
            packet_type: None,
            composition_time: 0,
            composition_time_raw: 0,
            nal_units: Vec::new(),
            truncated: false,
        }
    }

    /// Number of NAL units found
    pub fn nal_count(&self) -> usize {
        self.nal_units.len()
    }

    /// Composition time read as a two's-complement 24-bit value
    pub fn composition_time_sign_extended(&self) -> i32 {
        composition_time_sign_extended(self.composition_time_raw)
    }

    /// Check if the frame type marks a keyframe
    pub fn is_keyframe(&self) -> bool {
        self.frame_type.is_keyframe()
    }

    /// Check if this is an AVCC/HVCC sequence header
    pub fn is_sequence_header(&self) -> bool {
        self.packet_type == Some(AvcPacketType::SequenceHeader)
    }

    /// Presentation timestamp for a tag with the given DTS
    pub fn pts(&self, dts: u32) -> i64 {
        dts as i64 + self.composition_time as i64
    }

    fn apply(&mut self, scan: NalScan) {
        if let Some(err) = &scan.error {
            tracing::debug!(
                codec = %self.codec,
                found = scan.units.len(),
                error = %err,
                "NAL walk truncated"
            );
        }
        self.truncated = scan.is_truncated();
        self.nal_units = scan.units;
    }
}

/// State learned from the stream and reused for every later tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamCache {
    /// HEVC NAL units are start-code delimited; decided once before iteration
    pub hevc_is_annexb: bool,
    /// NAL length field width from the most recent AVCC/HVCC record
    pub nalu_length_size: u8,
}

impl Default for StreamCache {
    fn default() -> Self {
        Self {
            hevc_is_annexb: true,
            nalu_length_size: DEFAULT_NALU_LENGTH_SIZE,
        }
    }
}

/// Extracts per-NAL-unit framing from video tags
#[derive(Debug, Clone, Default)]
pub struct VideoPayloadParser {
    cache: StreamCache,
}

impl VideoPayloadParser {
    pub fn new(cache: StreamCache) -> Self {
        Self { cache }
    }

    /// Learned stream state
    pub fn cache(&self) -> &StreamCache {
        &self.cache
    }

    /// Parse a full video tag (`raw` starts with the 11-byte tag header).
    ///
    /// Never fails: malformed NAL structures produce a truncated NAL list.
    pub fn parse(&mut self, raw: &[u8]) -> VideoTagInfo {
        let payload = raw.get(TAG_HEADER_SIZE..).unwrap_or(&[]);
        let Some(&first) = payload.first() else {
            return VideoTagInfo::new(VideoFrameType::Unknown(0), VideoCodec::Unknown(0));
        };

        let mut info =
            VideoTagInfo::new(VideoFrameType::from_byte(first), VideoCodec::from_byte(first));
        if !info.codec.has_nal_units() {
            return info;
        }

        if payload.len() < VIDEO_PREFIX_SIZE {
            info.packet_type = payload.get(1).map(|&b| AvcPacketType::from_byte(b));
            info.truncated = true;
            tracing::debug!(len = payload.len(), "Video payload shorter than its prefix");
            return info;
        }

        let packet_type = AvcPacketType::from_byte(payload[1]);
        let ct_raw = (&payload[2..5]).get_uint(3) as u32;
        info.packet_type = Some(packet_type);
        info.composition_time_raw = ct_raw;
        info.composition_time = composition_time_from_raw(ct_raw);

        let scan = match info.codec {
            VideoCodec::Avc => self.parse_avc(raw, packet_type),
            _ => self.parse_hevc(raw, packet_type),
        };
        info.apply(scan);
        info
    }

    fn parse_avc(&mut self, raw: &[u8], packet_type: AvcPacketType) -> NalScan {
        if packet_type == AvcPacketType::SequenceHeader {
            self.learn(scan_avc_config(raw, NAL_DATA_OFFSET))
        } else {
            scan_avc_nalus(raw, NAL_DATA_OFFSET, self.cache.nalu_length_size)
        }
    }

    fn parse_hevc(&mut self, raw: &[u8], packet_type: AvcPacketType) -> NalScan {
        if self.cache.hevc_is_annexb {
            scan_hevc_annexb(raw, NAL_DATA_OFFSET)
        } else if packet_type == AvcPacketType::SequenceHeader {
            self.learn(scan_hvcc_config(raw, NAL_DATA_OFFSET))
        } else {
            scan_hevc_nalus(raw, NAL_DATA_OFFSET, self.cache.nalu_length_size)
        }
    }

    fn learn(&mut self, config: Result<DecoderConfigScan>) -> NalScan {
        match config {
            Ok(config) => {
                if config.nalu_length_size != self.cache.nalu_length_size {
                    tracing::debug!(
                        from = self.cache.nalu_length_size,
                        to = config.nalu_length_size,
                        "NAL length size changed"
                    );
                }
                self.cache.nalu_length_size = config.nalu_length_size;
                config.scan
            }
            Err(err) => err.into(),
        }
    }
}

impl From<Error> for NalScan {
    fn from(err: Error) -> Self {
        NalScan {
            units: Vec::new(),
            error: Some(err),
        }
    }
}
