//! Statistics for demuxed streams

use crate::media::audio::SoundFormat;
use crate::media::flv::{FlvTag, FlvTagType, TagBody, PREVIOUS_TAG_SIZE_LEN};
use crate::media::video::VideoCodec;

/// Stream-level statistics collected while demuxing
#[derive(Debug, Clone, Default)]
pub struct DemuxStats {
    /// Total tags seen
    pub tags: u64,
    /// Video tags seen
    pub video_tags: u64,
    /// Audio tags seen
    pub audio_tags: u64,
    /// Script data tags seen
    pub script_tags: u64,
    /// Tags with an unrecognised type byte
    pub other_tags: u64,
    /// Video keyframes
    pub keyframes: u64,
    /// AVC/HEVC and AAC sequence headers
    pub sequence_headers: u64,
    /// NAL units found across all video tags
    pub nal_units: u64,
    /// Video tags whose NAL walk stopped early
    pub truncated_tags: u64,
    /// Tags whose stored previous tag size was wrong
    pub previous_tag_size_mismatches: u64,
    /// Bytes covered by tags, headers and trailers included
    pub bytes: u64,
    /// Last video timestamp
    pub last_video_ts: u32,
    /// Last audio timestamp
    pub last_audio_ts: u32,
    /// Video codec of the most recent video tag
    pub video_codec: Option<VideoCodec>,
    /// Sound format of the most recent audio tag
    pub audio_format: Option<SoundFormat>,
}

impl DemuxStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one tag
    pub fn record(&mut self, tag: &FlvTag) {
        self.tags += 1;
        self.bytes += tag.tag_size() as u64;
        if tag.previous_tag_size.is_some() {
            self.bytes += PREVIOUS_TAG_SIZE_LEN as u64;
        }
        if !tag.previous_tag_size_matches() {
            self.previous_tag_size_mismatches += 1;
        }
        if tag.is_sequence_header() {
            self.sequence_headers += 1;
        }

        match tag.tag_type {
            FlvTagType::Video => {
                self.video_tags += 1;
                self.last_video_ts = tag.timestamp;
            }
            FlvTagType::Audio => {
                self.audio_tags += 1;
                self.last_audio_ts = tag.timestamp;
            }
            FlvTagType::Script => self.script_tags += 1,
            FlvTagType::Other(_) => self.other_tags += 1,
        }

        match &tag.body {
            TagBody::Video(info) => {
                if info.is_keyframe() {
                    self.keyframes += 1;
                }
                if info.truncated {
                    self.truncated_tags += 1;
                }
                self.nal_units += info.nal_count() as u64;
                self.video_codec = Some(info.codec);
            }
            TagBody::Audio(info) => self.audio_format = Some(info.sound_format),
            _ => {}
        }
    }

    /// Duration covered by the media timestamps, in milliseconds
    pub fn duration_ms(&self) -> u32 {
        self.last_video_ts.max(self.last_audio_ts)
    }

    /// Average bitrate over the media duration, in bits per second
    pub fn bitrate(&self) -> u64 {
        let ms = self.duration_ms() as u64;
        if ms > 0 {
            self.bytes * 8 * 1000 / ms
        } else {
            0
        }
    }
}
