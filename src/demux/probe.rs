//! HEVC mux mode detection
//!
//! FLV carries no flag telling whether HEVC NAL units are start-code
//! delimited (Annex-B) or length-prefixed. Before iteration the demuxer walks
//! up to a bounded number of video tags and looks at the first bytes after the
//! 5-byte video prefix of each:
//!
//! ```text
//! payload: | FT/Codec | PktType | CTS (3) | 00 00 01 ...     -> Annex-B
//!                                         | 00 00 00 01 ...  -> Annex-B
//!                                         | anything else    -> length-prefixed
//! ```
//!
//! The stream is Annex-B only when every counted tag agrees.

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::media::flv::{FlvTagHeader, FlvTagType, PREVIOUS_TAG_SIZE_LEN, VIDEO_PREFIX_SIZE};
use crate::media::h264::AvcPacketType;
use crate::media::video::{VideoCodec, VideoFrameType};
use crate::source::ByteSource;

/// Payload bytes needed to classify one tag
const PROBE_HEAD_LEN: u32 = VIDEO_PREFIX_SIZE as u32 + 4;

/// Tally of a mux scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MuxVerdict {
    /// Video tags that took part in the vote
    pub video_tags: usize,
    /// Of those, tags that start with a start code
    pub annexb_tags: usize,
}

impl MuxVerdict {
    /// Unanimous Annex-B. A scan that counted nothing also says Annex-B.
    pub fn is_annexb(&self) -> bool {
        self.annexb_tags == self.video_tags
    }
}

/// Classify one video tag from its first payload bytes.
///
/// Returns `None` for tags that do not vote: empty payloads, video info
/// frames and AVC/HEVC sequence headers. Non-HEVC video votes length-prefixed.
pub fn classify_video_tag(head: &[u8]) -> Option<bool> {
    let first = *head.first()?;
    if VideoFrameType::from_byte(first) == VideoFrameType::VideoInfoFrame {
        return None;
    }

    let codec = VideoCodec::from_byte(first);
    let packet_type = head.get(1).map(|&b| AvcPacketType::from_byte(b));
    if codec.has_nal_units() && packet_type == Some(AvcPacketType::SequenceHeader) {
        return None;
    }
    if codec != VideoCodec::Hevc {
        return Some(false);
    }

    let data = head.get(VIDEO_PREFIX_SIZE..).unwrap_or(&[]);
    Some(data.starts_with(&[0x00, 0x00, 0x01]) || data.starts_with(&[0x00, 0x00, 0x00, 0x01]))
}

/// Scan forward from the current position and vote on the HEVC mux mode.
///
/// The read position is restored before returning, so running the scan twice
/// gives the same verdict. Running out of data or a cancelled token ends the
/// scan early with the tally so far.
pub fn scan_hevc_mux<S: ByteSource + ?Sized>(
    source: &mut S,
    max_video_tags: usize,
    cancel: &CancellationToken,
) -> Result<MuxVerdict> {
    let start = source.position();
    let mut verdict = MuxVerdict::default();
    let result = vote(source, max_video_tags, cancel, &mut verdict);
    source.seek(start)?;
    result?;

    tracing::debug!(
        video_tags = verdict.video_tags,
        annexb_tags = verdict.annexb_tags,
        annexb = verdict.is_annexb(),
        "HEVC mux scan finished"
    );
    Ok(verdict)
}

fn vote<S: ByteSource + ?Sized>(
    source: &mut S,
    max_video_tags: usize,
    cancel: &CancellationToken,
    verdict: &mut MuxVerdict,
) -> Result<()> {
    while verdict.video_tags < max_video_tags {
        if cancel.is_cancelled() {
            tracing::debug!("HEVC mux scan cancelled");
            break;
        }

        let tag_start = source.position();
        let header = match FlvTagHeader::read(source) {
            Ok(header) => header,
            Err(e) if e.is_end_of_data() => break,
            Err(e) => return Err(e),
        };

        if header.tag_type == FlvTagType::Video && header.data_size > 0 {
            if !source.request(header.data_size as u64) {
                break;
            }
            let head = source.read_bytes(header.data_size.min(PROBE_HEAD_LEN) as usize)?;
            if let Some(annexb) = classify_video_tag(&head) {
                verdict.video_tags += 1;
                if annexb {
                    verdict.annexb_tags += 1;
                }
            }
        }

        source.seek(tag_start + header.tag_size() as u64 + PREVIOUS_TAG_SIZE_LEN as u64)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SliceSource;

    /// Tag with header, payload and trailer
    fn tag(tag_type: u8, payload: &[u8]) -> Vec<u8> {
        let size = payload.len() as u32;
        let mut out = vec![
            tag_type,
            (size >> 16) as u8,
            (size >> 8) as u8,
            size as u8,
            0,
            0,
            0,
            0,
            0,
            0,
            0,
        ];
        out.extend_from_slice(payload);
        out.extend_from_slice(&(size + 11).to_be_bytes());
        out
    }

    const HEVC_ANNEXB: &[u8] = &[0x1C, 0x01, 0, 0, 0, 0x00, 0x00, 0x00, 0x01, 0x26, 0x01];
    const HEVC_ANNEXB_SHORT: &[u8] = &[0x2C, 0x01, 0, 0, 0, 0x00, 0x00, 0x01, 0x02, 0x01];
    const HEVC_LENGTH: &[u8] = &[0x2C, 0x01, 0, 0, 0, 0x00, 0x00, 0x00, 0x02, 0x02, 0x01];
    const HEVC_SEQ_HEADER: &[u8] = &[0x1C, 0x00, 0, 0, 0, 0x01, 0x01, 0x60];

    #[test]
    fn test_classify_video_tag() {
        assert_eq!(classify_video_tag(HEVC_ANNEXB), Some(true));
        assert_eq!(classify_video_tag(HEVC_ANNEXB_SHORT), Some(true));
        assert_eq!(classify_video_tag(HEVC_LENGTH), Some(false));
        assert_eq!(classify_video_tag(HEVC_SEQ_HEADER), None);
        // Video info frame
        assert_eq!(classify_video_tag(&[0x5C, 0x01, 0, 0, 0, 0, 0, 1]), None);
        // AVC NAL data votes length-prefixed
        assert_eq!(classify_video_tag(&[0x17, 0x01, 0, 0, 0, 0, 0, 1, 0x65]), Some(false));
        assert_eq!(classify_video_tag(&[]), None);
    }

    #[test]
    fn test_unanimous_annexb() {
        let mut data = tag(9, HEVC_SEQ_HEADER);
        data.extend(tag(8, &[0xAF, 0x01, 0x21]));
        data.extend(tag(9, HEVC_ANNEXB));
        data.extend(tag(9, HEVC_ANNEXB_SHORT));
        let mut src = SliceSource::new(data);

        let verdict = scan_hevc_mux(&mut src, 100, &CancellationToken::new()).unwrap();
        assert_eq!(verdict.video_tags, 2);
        assert!(verdict.is_annexb());
        assert_eq!(src.position(), 0);
    }

    #[test]
    fn test_one_dissent_means_length_prefixed() {
        let mut data = tag(9, HEVC_ANNEXB);
        data.extend(tag(9, HEVC_LENGTH));
        data.extend(tag(9, HEVC_ANNEXB));
        let mut src = SliceSource::new(data);

        let verdict = scan_hevc_mux(&mut src, 100, &CancellationToken::new()).unwrap();
        assert_eq!(verdict.video_tags, 3);
        assert_eq!(verdict.annexb_tags, 2);
        assert!(!verdict.is_annexb());
    }

    #[test]
    fn test_scan_is_idempotent() {
        let mut data = vec![0xEE; 13];
        data.extend(tag(9, HEVC_ANNEXB));
        data.extend(tag(9, HEVC_LENGTH));
        let mut src = SliceSource::new(data);
        src.seek(13).unwrap();

        let cancel = CancellationToken::new();
        let first = scan_hevc_mux(&mut src, 100, &cancel).unwrap();
        assert_eq!(src.position(), 13);
        let second = scan_hevc_mux(&mut src, 100, &cancel).unwrap();
        assert_eq!(src.position(), 13);
        assert_eq!(first, second);
    }

    #[test]
    fn test_scan_limit() {
        let mut data = tag(9, HEVC_ANNEXB);
        data.extend(tag(9, HEVC_ANNEXB));
        data.extend(tag(9, HEVC_LENGTH));
        let mut src = SliceSource::new(data);

        let verdict = scan_hevc_mux(&mut src, 2, &CancellationToken::new()).unwrap();
        assert_eq!(verdict.video_tags, 2);
        assert!(verdict.is_annexb());
    }

    #[test]
    fn test_no_video_defaults_to_annexb() {
        let mut src = SliceSource::new(tag(8, &[0xAF, 0x01, 0x21]));
        let verdict = scan_hevc_mux(&mut src, 100, &CancellationToken::new()).unwrap();
        assert_eq!(verdict.video_tags, 0);
        assert!(verdict.is_annexb());
    }

    #[test]
    fn test_truncated_tag_ends_scan() {
        let mut data = tag(9, HEVC_ANNEXB);
        let mut partial = tag(9, HEVC_LENGTH);
        partial.truncate(14);
        data.extend(partial);
        let mut src = SliceSource::new(data);

        let verdict = scan_hevc_mux(&mut src, 100, &CancellationToken::new()).unwrap();
        assert_eq!(verdict.video_tags, 1);
        assert!(verdict.is_annexb());
        assert_eq!(src.position(), 0);
    }

    #[test]
    fn test_cancelled_scan() {
        let mut src = SliceSource::new(tag(9, HEVC_LENGTH));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let verdict = scan_hevc_mux(&mut src, 100, &cancel).unwrap();
        assert_eq!(verdict, MuxVerdict::default());
    }
}
