//! Demuxer configuration

/// Number of video tags the HEVC mux scan looks at before deciding
pub const DEFAULT_PROBE_VIDEO_TAGS: usize = 100;

/// NAL length field width assumed until a sequence header says otherwise
pub const DEFAULT_NALU_LENGTH_SIZE: u8 = 4;

/// Demuxer configuration options
#[derive(Debug, Clone)]
pub struct DemuxConfig {
    /// Maximum number of video tags inspected by the HEVC mux scan
    pub probe_video_tags: usize,

    /// NAL length size used before an AVCC/HVCC record has been seen
    pub default_nalu_length_size: u8,

    /// Force Annex-B (`Some(true)`) or length-prefixed (`Some(false)`) HEVC
    /// instead of scanning
    pub hevc_mux_override: Option<bool>,

    /// Log tags whose stored previous tag size disagrees with `11 + data_size`
    pub validate_previous_tag_size: bool,
}

impl Default for DemuxConfig {
    fn default() -> Self {
        Self {
            probe_video_tags: DEFAULT_PROBE_VIDEO_TAGS,
            default_nalu_length_size: DEFAULT_NALU_LENGTH_SIZE,
            hevc_mux_override: None,
            validate_previous_tag_size: true,
        }
    }
}

impl DemuxConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many video tags the mux scan may inspect
    pub fn probe_video_tags(mut self, count: usize) -> Self {
        self.probe_video_tags = count;
        self
    }

    /// Set the fallback NAL length size (clamped to 1..=4)
    pub fn default_nalu_length_size(mut self, size: u8) -> Self {
        self.default_nalu_length_size = size.clamp(1, 4);
        self
    }

    /// Skip the mux scan and treat HEVC as Annex-B or not
    pub fn hevc_annexb(mut self, annexb: bool) -> Self {
        self.hevc_mux_override = Some(annexb);
        self
    }

    /// Disable previous tag size validation
    pub fn skip_previous_tag_size_check(mut self) -> Self {
        self.validate_previous_tag_size = false;
        self
    }
}
