//! Streaming FLV demuxer
//!
//! Reads FLV files or live FLV streams tag by tag and, for H.264 and HEVC
//! video, reports the type and offset of every NAL unit in each tag. HEVC
//! streams are scanned once up front to decide whether their NAL units are
//! Annex-B or length-prefixed.
//!
//! ```no_run
//! use flv_demux::source::FileSource;
//! use flv_demux::FlvDemuxer;
//!
//! # fn main() -> flv_demux::Result<()> {
//! let demuxer = FlvDemuxer::open(FileSource::open("capture.flv")?)?;
//! for tag in demuxer {
//!     let tag = tag?;
//!     if let Some(video) = tag.video() {
//!         println!("{} {} NAL units", tag.timestamp, video.nal_count());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod demux;
pub mod error;
pub mod media;
pub mod source;
pub mod stats;

pub use config::DemuxConfig;
pub use demux::{FileHeader, FlvDemuxer, MuxVerdict};
pub use error::{Error, Result};
pub use media::{FlvTag, FlvTagType, NalType, NalUnitRecord, TagBody};
pub use source::ByteSource;
