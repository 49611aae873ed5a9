//! Media payload handling
//!
//! This module provides:
//! - FLV tag header decoding and the tag data model
//! - Video payload parsing with H.264/HEVC NAL unit framing
//! - Audio payload classification

pub mod audio;
pub mod flv;
pub mod h264;
pub mod hevc;
pub mod nal;
pub mod video;

pub use audio::{AacPacketType, AudioTagInfo, SoundFormat, SoundRate, SoundSize, SoundType};
pub use flv::{FlvTag, FlvTagHeader, FlvTagType, TagBody};
pub use h264::{AvcNalType, AvcPacketType};
pub use hevc::HevcNalType;
pub use nal::{NalScan, NalType, NalUnitRecord};
pub use video::{StreamCache, VideoCodec, VideoFrameType, VideoPayloadParser, VideoTagInfo};
