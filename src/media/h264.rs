//! H.264/AVC NAL framing
//!
//! FLV carries H.264 in AVCC format (length-prefixed NAL units).
//!
//! AVC Video Packet Structure:
//! ```text
//! +----------+----------+-----------------+
//! |FrameType | CodecID  | AVCPacketType   | CompositionTime | Data
//! | (4 bits) | (4 bits) | (1 byte)        | (3 bytes)       |
//! +----------+----------+-----------------+
//! ```
//!
//! AVCPacketType:
//! - 0: AVC sequence header (AVCDecoderConfigurationRecord)
//! - 1: AVC NALU (one or more NALUs)
//! - 2: AVC end of sequence
//!
//! AVCDecoderConfigurationRecord (sequence header):
//! ```text
//! configurationVersion (1) | AVCProfileIndication (1) | profile_compatibility (1)
//! | AVCLevelIndication (1) | lengthSizeMinusOne (1, lower 2 bits)
//! | numOfSPS (1, lower 5 bits) | { spsLength (2) | spsNALUnit }*
//! | numOfPPS (1) | { ppsLength (2) | ppsNALUnit }*
//! ```

use std::fmt;

use super::nal::{read_be, walk_length_prefixed, walk_parameter_sets, NalCodec, NalScan};
use crate::error::Result;

/// Offset of lengthSizeMinusOne inside the AVCDecoderConfigurationRecord
const AVCC_LENGTH_SIZE_OFFSET: usize = 4;

/// AVC/HEVC packet type (second byte of the video payload)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvcPacketType {
    /// Sequence header (AVCDecoderConfigurationRecord / HVCC)
    SequenceHeader,
    /// NAL units
    Nalu,
    /// End of sequence
    EndOfSequence,
    Unknown(u8),
}

impl AvcPacketType {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => AvcPacketType::SequenceHeader,
            1 => AvcPacketType::Nalu,
            2 => AvcPacketType::EndOfSequence,
            other => AvcPacketType::Unknown(other),
        }
    }

    pub fn value(&self) -> u8 {
        match self {
            AvcPacketType::SequenceHeader => 0,
            AvcPacketType::Nalu => 1,
            AvcPacketType::EndOfSequence => 2,
            AvcPacketType::Unknown(b) => *b,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AvcPacketType::SequenceHeader => "sequence header",
            AvcPacketType::Nalu => "NALU",
            AvcPacketType::EndOfSequence => "end of sequence",
            AvcPacketType::Unknown(_) => "(unknown)",
        }
    }
}

impl fmt::Display for AvcPacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name(), self.value())
    }
}

/// H.264 NAL unit type (low 5 bits of the NAL header)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvcNalType {
    /// Non-IDR slice
    Slice,
    /// Slice data partition A
    SlicePartA,
    /// Slice data partition B
    SlicePartB,
    /// Slice data partition C
    SlicePartC,
    /// IDR slice (keyframe)
    Idr,
    /// Supplemental enhancement information
    Sei,
    /// Sequence parameter set
    Sps,
    /// Picture parameter set
    Pps,
    /// Access unit delimiter
    Aud,
    /// End of sequence
    EndSeq,
    /// End of stream
    EndStream,
    /// Filler data
    Filler,
    /// SPS extension
    SpsExt,
    /// Prefix NAL unit
    Prefix,
    /// Subset SPS
    SubsetSps,
    /// Depth parameter set
    Dps,
    /// Auxiliary coded picture slice
    AuxSlice,
    /// Coded slice extension
    ExtSlice,
    /// Depth/3D-AVC slice extension
    DepthExtSlice,
    /// 17, 18, 22, 23
    Reserved(u8),
    /// 0 and 24-31
    Unspecified(u8),
}

impl AvcNalType {
    pub fn from_byte(b: u8) -> Self {
        match b & 0x1F {
            1 => AvcNalType::Slice,
            2 => AvcNalType::SlicePartA,
            3 => AvcNalType::SlicePartB,
            4 => AvcNalType::SlicePartC,
            5 => AvcNalType::Idr,
            6 => AvcNalType::Sei,
            7 => AvcNalType::Sps,
            8 => AvcNalType::Pps,
            9 => AvcNalType::Aud,
            10 => AvcNalType::EndSeq,
            11 => AvcNalType::EndStream,
            12 => AvcNalType::Filler,
            13 => AvcNalType::SpsExt,
            14 => AvcNalType::Prefix,
            15 => AvcNalType::SubsetSps,
            16 => AvcNalType::Dps,
            19 => AvcNalType::AuxSlice,
            20 => AvcNalType::ExtSlice,
            21 => AvcNalType::DepthExtSlice,
            t @ (17 | 18 | 22 | 23) => AvcNalType::Reserved(t),
            t => AvcNalType::Unspecified(t),
        }
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(self, AvcNalType::Idr)
    }

    pub fn is_parameter_set(&self) -> bool {
        matches!(self, AvcNalType::Sps | AvcNalType::Pps)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AvcNalType::Slice => "SLICE",
            AvcNalType::SlicePartA => "DPA",
            AvcNalType::SlicePartB => "DPB",
            AvcNalType::SlicePartC => "DPC",
            AvcNalType::Idr => "IDR_SLICE",
            AvcNalType::Sei => "SEI",
            AvcNalType::Sps => "SPS",
            AvcNalType::Pps => "PPS",
            AvcNalType::Aud => "AUD",
            AvcNalType::EndSeq => "END_SEQUENCE",
            AvcNalType::EndStream => "END_STREAM",
            AvcNalType::Filler => "FILLER_DATA",
            AvcNalType::SpsExt => "SPS_EXT",
            AvcNalType::Prefix => "PREFIX",
            AvcNalType::SubsetSps => "SUB_SPS",
            AvcNalType::Dps => "DPS",
            AvcNalType::AuxSlice => "AUXILIARY_SLICE",
            AvcNalType::ExtSlice => "EXTEN_SLICE",
            AvcNalType::DepthExtSlice => "DEPTH_EXTEN_SLICE",
            AvcNalType::Reserved(_) => "RESERVED",
            AvcNalType::Unspecified(_) => "UNSPECIFIED",
        }
    }
}

impl fmt::Display for AvcNalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvcNalType::Reserved(t) | AvcNalType::Unspecified(t) => {
                write!(f, "{}{}", self.name(), t)
            }
            _ => f.write_str(self.name()),
        }
    }
}

/// NAL units of a sequence header plus the length size it announces
#[derive(Debug)]
pub struct DecoderConfigScan {
    /// Width of the length field used by later NAL-data tags (1-4)
    pub nalu_length_size: u8,
    pub scan: NalScan,
}

/// Walk an AVCDecoderConfigurationRecord starting at `start`.
///
/// Fails only when the lengthSizeMinusOne byte itself is missing. SPS/PPS
/// entries that do not fit end the walk with a truncated scan.
pub fn scan_avc_config(buf: &[u8], start: usize) -> Result<DecoderConfigScan> {
    let mut offset = start + AVCC_LENGTH_SIZE_OFFSET;
    let nalu_length_size = (read_be(buf, offset, 1)? as u8 & 0x03) + 1;
    offset += 1;

    let scan = NalScan::run(|units| {
        let sps_count = read_be(buf, offset, 1)? & 0x1F;
        offset += 1;
        walk_parameter_sets(buf, &mut offset, sps_count, NalCodec::Avc, units)?;

        let pps_count = read_be(buf, offset, 1)?;
        offset += 1;
        walk_parameter_sets(buf, &mut offset, pps_count, NalCodec::Avc, units)
    });

    Ok(DecoderConfigScan {
        nalu_length_size,
        scan,
    })
}

/// Walk length-prefixed H.264 NAL units from `start` to the end of `buf`
pub fn scan_avc_nalus(buf: &[u8], start: usize, nalu_length_size: u8) -> NalScan {
    NalScan::run(|units| {
        walk_length_prefixed(buf, start, nalu_length_size as usize, NalCodec::Avc, units)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::nal::NalType;

    // Minimal valid AVCDecoderConfigurationRecord
    const AVCC: &[u8] = &[
        0x01, // version
        0x64, // profile (High)
        0x00, // compatibility
        0x1F, // level 3.1
        0xFF, // nalu length size = 4
        0xE1, // 1 SPS
        0x00, 0x04, // SPS length
        0x67, 0x64, 0x00, 0x1F, // SPS data
        0x01, // 1 PPS
        0x00, 0x03, // PPS length
        0x68, 0xEF, 0x38, // PPS data
    ];

    #[test]
    fn test_nalu_type() {
        assert_eq!(AvcNalType::from_byte(0x65), AvcNalType::Idr);
        assert_eq!(AvcNalType::from_byte(0x67), AvcNalType::Sps);
        assert_eq!(AvcNalType::from_byte(0x68), AvcNalType::Pps);
        assert_eq!(AvcNalType::from_byte(0x41), AvcNalType::Slice);
        assert_eq!(AvcNalType::from_byte(0x09), AvcNalType::Aud);
        assert_eq!(AvcNalType::from_byte(0x11), AvcNalType::Reserved(17));
        assert_eq!(AvcNalType::from_byte(0x00), AvcNalType::Unspecified(0));
        assert_eq!(AvcNalType::from_byte(0x1F), AvcNalType::Unspecified(31));
    }

    #[test]
    fn test_nalu_type_names() {
        assert_eq!(AvcNalType::Idr.to_string(), "IDR_SLICE");
        assert_eq!(AvcNalType::Sps.to_string(), "SPS");
        assert_eq!(AvcNalType::Reserved(22).to_string(), "RESERVED22");
        assert_eq!(AvcNalType::Unspecified(24).to_string(), "UNSPECIFIED24");
    }

    #[test]
    fn test_nalu_type_predicates() {
        assert!(AvcNalType::Idr.is_keyframe());
        assert!(!AvcNalType::Slice.is_keyframe());
        assert!(AvcNalType::Sps.is_parameter_set());
        assert!(AvcNalType::Pps.is_parameter_set());
        assert!(!AvcNalType::Sei.is_parameter_set());
    }

    #[test]
    fn test_avc_packet_type() {
        assert_eq!(AvcPacketType::from_byte(0), AvcPacketType::SequenceHeader);
        assert_eq!(AvcPacketType::from_byte(1), AvcPacketType::Nalu);
        assert_eq!(AvcPacketType::from_byte(2), AvcPacketType::EndOfSequence);
        assert_eq!(AvcPacketType::from_byte(3), AvcPacketType::Unknown(3));
        assert_eq!(AvcPacketType::Unknown(3).value(), 3);
        assert_eq!(AvcPacketType::Nalu.to_string(), "NALU [1]");
    }

    #[test]
    fn test_scan_avc_config() {
        let config = scan_avc_config(AVCC, 0).unwrap();
        assert_eq!(config.nalu_length_size, 4);
        assert!(!config.scan.is_truncated());

        let units = &config.scan.units;
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].nal_type, NalType::Avc(AvcNalType::Sps));
        assert_eq!(units[0].offset, 8);
        assert_eq!(units[1].nal_type, NalType::Avc(AvcNalType::Pps));
        assert_eq!(units[1].offset, 15);
    }

    #[test]
    fn test_scan_avc_config_at_offset() {
        let mut buf = vec![0xAA; 16];
        buf.extend_from_slice(AVCC);
        let config = scan_avc_config(&buf, 16).unwrap();
        assert_eq!(config.scan.units[0].offset, 24);
        assert_eq!(config.scan.units[1].offset, 31);
    }

    #[test]
    fn test_scan_avc_config_two_byte_lengths() {
        let mut record = AVCC.to_vec();
        record[4] = 0xFD; // lengthSizeMinusOne = 1
        let config = scan_avc_config(&record, 0).unwrap();
        assert_eq!(config.nalu_length_size, 2);
    }

    #[test]
    fn test_scan_avc_config_truncated_pps() {
        let record = &AVCC[..AVCC.len() - 2];
        let config = scan_avc_config(record, 0).unwrap();
        assert!(config.scan.is_truncated());
        // PPS header byte is still present
        assert_eq!(config.scan.units.len(), 2);

        let record = &AVCC[..12];
        let config = scan_avc_config(record, 0).unwrap();
        assert!(config.scan.is_truncated());
        assert_eq!(config.scan.units.len(), 1);
    }

    #[test]
    fn test_scan_avc_config_too_short() {
        assert!(scan_avc_config(&[0x01, 0x64, 0x00], 0).is_err());
    }

    #[test]
    fn test_scan_avc_nalus() {
        let data = [
            0x00, 0x00, 0x00, 0x05, 0x65, 0x88, 0x84, 0x00, 0x00, // IDR
            0x00, 0x00, 0x00, 0x02, 0x06, 0x05, // SEI
        ];
        let scan = scan_avc_nalus(&data, 0, 4);
        assert_eq!(scan.units.len(), 2);
        assert_eq!(scan.units[0].nal_type, NalType::Avc(AvcNalType::Idr));
        assert_eq!(scan.units[1].nal_type, NalType::Avc(AvcNalType::Sei));
        assert_eq!(scan.units[1].offset, 13);
    }

    #[test]
    fn test_scan_avc_nalus_truncated() {
        // Length says 10 bytes but only 3 available
        let data = [0x00, 0x00, 0x00, 0x0A, 0x67, 0x64, 0x00];
        let scan = scan_avc_nalus(&data, 0, 4);
        assert!(scan.is_truncated());
        assert_eq!(scan.units.len(), 1);
    }
}
