//! FLV demuxer
//!
//! [`FlvDemuxer`] validates the file header, runs the HEVC mux scan once and
//! then yields decoded tags one at a time:
//!
//! ```text
//! open: signature -> flags/data offset -> PrevTagSize0 -> mux scan
//! next: cancel check -> tag header -> payload -> previous tag size
//! ```
//!
//! The demuxer owns the read cursor. After each tag it moves to
//! `address + 11 + data_size + 4` whatever the stored previous tag size says.

pub mod header;
pub mod probe;

pub use header::{detect_container, FileHeader};
pub use probe::{classify_video_tag, scan_hevc_mux, MuxVerdict};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::config::DemuxConfig;
use crate::error::Result;
use crate::media::audio::AudioTagInfo;
use crate::media::flv::{
    FlvTag, FlvTagHeader, FlvTagType, TagBody, PREVIOUS_TAG_SIZE_LEN, TAG_HEADER_SIZE,
};
use crate::media::video::{StreamCache, VideoPayloadParser};
use crate::source::ByteSource;

/// Forward-only FLV tag reader
#[derive(Debug)]
pub struct FlvDemuxer<S> {
    source: S,
    config: DemuxConfig,
    cancel: CancellationToken,
    header: Option<FileHeader>,
    parser: VideoPayloadParser,
    finished: bool,
}

impl<S: ByteSource> FlvDemuxer<S> {
    /// Open a source with the default configuration
    pub fn open(source: S) -> Result<Self> {
        Self::open_with(source, DemuxConfig::default(), CancellationToken::new())
    }

    /// Open a source.
    ///
    /// Fails on a non-FLV signature. A header that is cut short opens an
    /// already finished demuxer.
    ///
    /// The token is handed to the source as well, so a source blocked waiting
    /// for data gives up once it is cancelled.
    pub fn open_with(
        mut source: S,
        config: DemuxConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        source.set_cancellation(cancel.clone());
        let header = FileHeader::read(&mut source)?;
        let mut cache = StreamCache {
            nalu_length_size: config.default_nalu_length_size,
            ..StreamCache::default()
        };

        let mut finished = true;
        match header {
            Some(h) => {
                tracing::info!(
                    source = %source.describe(),
                    version = h.version,
                    has_audio = h.has_audio(),
                    has_video = h.has_video(),
                    data_offset = h.data_offset,
                    "Opened FLV"
                );

                source.seek(h.data_start())?;
                if source.request(PREVIOUS_TAG_SIZE_LEN as u64) {
                    let prev0 = source.read_u32()?;
                    if prev0 != 0 {
                        tracing::debug!(value = prev0, "Non-zero first previous tag size");
                    }
                    cache.hevc_is_annexb = match config.hevc_mux_override {
                        Some(annexb) => annexb,
                        None => {
                            scan_hevc_mux(&mut source, config.probe_video_tags, &cancel)?
                                .is_annexb()
                        }
                    };
                    tracing::info!(hevc_annexb = cache.hevc_is_annexb, "HEVC mux mode decided");
                    finished = false;
                }
            }
            None => {
                tracing::info!(source = %source.describe(), "FLV header truncated, no tags");
            }
        }

        Ok(Self {
            source,
            config,
            cancel,
            header,
            parser: VideoPayloadParser::new(cache),
            finished,
        })
    }

    /// File header, if it was complete
    pub fn header(&self) -> Option<&FileHeader> {
        self.header.as_ref()
    }

    /// Whether HEVC NAL units are read as Annex-B
    pub fn hevc_is_annexb(&self) -> bool {
        self.parser.cache().hevc_is_annexb
    }

    /// State learned from the stream so far
    pub fn cache(&self) -> &StreamCache {
        self.parser.cache()
    }

    pub fn config(&self) -> &DemuxConfig {
        &self.config
    }

    /// Token that stops iteration when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Re-run the mux scan from the current position without changing the mode
    pub fn scan_hevc_mux(&mut self) -> Result<MuxVerdict> {
        scan_hevc_mux(&mut self.source, self.config.probe_video_tags, &self.cancel)
    }

    /// Absolute read position
    pub fn position(&self) -> u64 {
        self.source.position()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Read the next tag.
    ///
    /// `Ok(None)` means the stream ended, ran dry or was cancelled. Once it is
    /// returned, or an error is, every later call returns `Ok(None)`.
    pub fn next_tag(&mut self) -> Result<Option<FlvTag>> {
        if self.finished {
            return Ok(None);
        }
        if self.cancel.is_cancelled() {
            tracing::debug!(position = self.source.position(), "Demux cancelled");
            self.finished = true;
            return Ok(None);
        }

        match self.read_tag() {
            Ok(tag) => Ok(Some(tag)),
            Err(e) if e.is_end_of_data() => {
                tracing::debug!(position = self.source.position(), "End of FLV data");
                self.finished = true;
                Ok(None)
            }
            Err(e) => {
                self.finished = true;
                Err(e)
            }
        }
    }

    fn read_tag(&mut self) -> Result<FlvTag> {
        let address = self.source.position();
        let header = FlvTagHeader::read(&mut self.source)?;
        let tag_size = header.tag_size();

        self.source.require(header.data_size as u64)?;
        self.source.seek(address)?;
        let raw = self.source.read_bytes(tag_size as usize)?;
        let body = self.decode_body(&header, &raw);

        let previous_tag_size = if self.source.request(PREVIOUS_TAG_SIZE_LEN as u64) {
            Some(self.source.read_u32()?)
        } else {
            self.finished = true;
            None
        };

        match previous_tag_size {
            Some(stored) if self.config.validate_previous_tag_size && stored != tag_size => {
                tracing::warn!(
                    address = address,
                    stored = stored,
                    expected = tag_size,
                    "Previous tag size mismatch"
                );
            }
            _ => {}
        }

        tracing::trace!(
            address = address,
            tag_type = header.tag_type.value(),
            data_size = header.data_size,
            timestamp = header.timestamp,
            "Read tag"
        );

        self.source
            .seek(address + tag_size as u64 + PREVIOUS_TAG_SIZE_LEN as u64)?;
        Ok(FlvTag::new(address, header, body, raw, previous_tag_size))
    }

    fn decode_body(&mut self, header: &FlvTagHeader, raw: &Bytes) -> TagBody {
        if header.data_size == 0 {
            return TagBody::Empty;
        }
        match header.tag_type {
            FlvTagType::Video => TagBody::Video(self.parser.parse(raw)),
            FlvTagType::Audio => AudioTagInfo::classify(&raw[TAG_HEADER_SIZE..])
                .map(TagBody::Audio)
                .unwrap_or(TagBody::Empty),
            FlvTagType::Script => TagBody::Script,
            FlvTagType::Other(_) => TagBody::Other,
        }
    }
}

impl<S: ByteSource> Iterator for FlvDemuxer<S> {
    type Item = Result<FlvTag>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_tag().transpose()
    }
}
