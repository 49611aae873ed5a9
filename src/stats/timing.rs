//! Presentation timing per tag
//!
//! Video PTS is `timestamp + composition_time`. Deltas are taken against the
//! previous tag of the same kind; the first tag of each kind has a delta of 0.

use crate::media::flv::{FlvTag, FlvTagType};

/// Timing of one tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagTiming {
    /// Position of the tag in the stream, counting every tag
    pub index: u64,
    pub dts: i64,
    pub pts: i64,
    /// DTS minus the previous DTS of the same kind
    pub dts_delta: i64,
    /// PTS minus the previous PTS of the same kind (0 for audio)
    pub pts_delta: i64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Last {
    dts: i64,
    pts: i64,
}

/// Tracks timing across the tags of a stream
#[derive(Debug, Clone, Default)]
pub struct TimingTracker {
    next_index: u64,
    video: Option<Last>,
    audio: Option<Last>,
}

impl TimingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute timing for the next tag in stream order
    pub fn observe(&mut self, tag: &FlvTag) -> TagTiming {
        let index = self.next_index;
        self.next_index += 1;
        let dts = tag.timestamp as i64;

        match tag.tag_type {
            FlvTagType::Video => {
                let pts = tag.video().map(|v| v.pts(tag.timestamp)).unwrap_or(dts);
                let last = self.video.replace(Last { dts, pts }).unwrap_or(Last { dts, pts });
                TagTiming {
                    index,
                    dts,
                    pts,
                    dts_delta: dts - last.dts,
                    pts_delta: pts - last.pts,
                }
            }
            FlvTagType::Audio => {
                let current = Last { dts, pts: dts };
                let last = self.audio.replace(current).unwrap_or(current);
                TagTiming {
                    index,
                    dts,
                    pts: dts,
                    dts_delta: dts - last.dts,
                    pts_delta: 0,
                }
            }
            _ => TagTiming {
                index,
                dts,
                pts: dts,
                dts_delta: 0,
                pts_delta: 0,
            },
        }
    }
}
