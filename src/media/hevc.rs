//! HEVC (H.265) NAL framing
//!
//! HEVC in FLV shows up in two shapes and the container does not say which:
//!
//! - length-prefixed, with an HVCC sequence header (packet type 0)
//! - Annex-B, every unit preceded by `00 00 01` or `00 00 00 01`
//!
//! The demuxer decides once per stream (see [`crate::demux::probe`]).
//!
//! HEVCDecoderConfigurationRecord (HVCC):
//! ```text
//! 21 bytes of profile/tier/level/format fields
//! | lengthSizeMinusOne (1, lower 2 bits) | numOfArrays (1)
//! | { NAL_unit_type (1, lower 6 bits) | numNalus (2) | { nalUnitLength (2) | NAL }* }*
//! ```
//!
//! NAL header: `forbidden_zero(1) | nal_unit_type(6) | layer_id(6) | tid(3)`.

use std::fmt;

use super::h264::DecoderConfigScan;
use super::nal::{
    read_be, scan_annexb, walk_length_prefixed, walk_parameter_sets, NalCodec, NalScan,
};
use crate::error::Result;

const HVCC_LENGTH_SIZE_OFFSET: usize = 21;
const HVCC_NUM_ARRAYS_OFFSET: usize = 22;

/// HEVC NAL unit type (bits 1-6 of the first NAL header byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HevcNalType {
    TrailN,
    TrailR,
    TsaN,
    TsaR,
    StsaN,
    StsaR,
    RadlN,
    RadlR,
    RaslN,
    RaslR,
    /// 10-15
    RsvVcl(u8),
    BlaWLp,
    BlaWRadl,
    BlaNLp,
    IdrWRadl,
    IdrNLp,
    CraNut,
    /// 22-23
    RsvIrapVcl(u8),
    /// 24-31
    RsvVclHigh(u8),
    Vps,
    Sps,
    Pps,
    Aud,
    EosNut,
    EobNut,
    FdNut,
    SeiPrefix,
    SeiSuffix,
    /// 41-47
    RsvNvcl(u8),
    /// 48-63
    Unspecified(u8),
}

impl HevcNalType {
    /// Decode from the first NAL header byte
    pub fn from_byte(b: u8) -> Self {
        Self::from_type((b >> 1) & 0x3F)
    }

    /// Decode from a bare 6-bit type value
    pub fn from_type(t: u8) -> Self {
        match t & 0x3F {
            0 => HevcNalType::TrailN,
            1 => HevcNalType::TrailR,
            2 => HevcNalType::TsaN,
            3 => HevcNalType::TsaR,
            4 => HevcNalType::StsaN,
            5 => HevcNalType::StsaR,
            6 => HevcNalType::RadlN,
            7 => HevcNalType::RadlR,
            8 => HevcNalType::RaslN,
            9 => HevcNalType::RaslR,
            t @ 10..=15 => HevcNalType::RsvVcl(t),
            16 => HevcNalType::BlaWLp,
            17 => HevcNalType::BlaWRadl,
            18 => HevcNalType::BlaNLp,
            19 => HevcNalType::IdrWRadl,
            20 => HevcNalType::IdrNLp,
            21 => HevcNalType::CraNut,
            t @ 22..=23 => HevcNalType::RsvIrapVcl(t),
            t @ 24..=31 => HevcNalType::RsvVclHigh(t),
            32 => HevcNalType::Vps,
            33 => HevcNalType::Sps,
            34 => HevcNalType::Pps,
            35 => HevcNalType::Aud,
            36 => HevcNalType::EosNut,
            37 => HevcNalType::EobNut,
            38 => HevcNalType::FdNut,
            39 => HevcNalType::SeiPrefix,
            40 => HevcNalType::SeiSuffix,
            t @ 41..=47 => HevcNalType::RsvNvcl(t),
            t => HevcNalType::Unspecified(t),
        }
    }

    /// IRAP pictures (BLA, IDR, CRA and the reserved IRAP range)
    pub fn is_keyframe(&self) -> bool {
        matches!(
            self,
            HevcNalType::BlaWLp
                | HevcNalType::BlaWRadl
                | HevcNalType::BlaNLp
                | HevcNalType::IdrWRadl
                | HevcNalType::IdrNLp
                | HevcNalType::CraNut
                | HevcNalType::RsvIrapVcl(_)
        )
    }

    pub fn is_parameter_set(&self) -> bool {
        matches!(self, HevcNalType::Vps | HevcNalType::Sps | HevcNalType::Pps)
    }

    pub fn name(&self) -> &'static str {
        match self {
            HevcNalType::TrailN => "TRAIL_N",
            HevcNalType::TrailR => "TRAIL_R",
            HevcNalType::TsaN => "TSA_N",
            HevcNalType::TsaR => "TSA_R",
            HevcNalType::StsaN => "STSA_N",
            HevcNalType::StsaR => "STSA_R",
            HevcNalType::RadlN => "RADL_N",
            HevcNalType::RadlR => "RADL_R",
            HevcNalType::RaslN => "RASL_N",
            HevcNalType::RaslR => "RASL_R",
            HevcNalType::RsvVcl(_) => "RSV_VCL",
            HevcNalType::BlaWLp => "BLA_W_LP",
            HevcNalType::BlaWRadl => "BLA_W_RADL",
            HevcNalType::BlaNLp => "BLA_N_LP",
            HevcNalType::IdrWRadl => "IDR_W_RADL",
            HevcNalType::IdrNLp => "IDR_N_LP",
            HevcNalType::CraNut => "CRA_NUT",
            HevcNalType::RsvIrapVcl(_) => "RSV_IRAP_VCL",
            HevcNalType::RsvVclHigh(_) => "RSV_VCL",
            HevcNalType::Vps => "VPS",
            HevcNalType::Sps => "SPS",
            HevcNalType::Pps => "PPS",
            HevcNalType::Aud => "AUD",
            HevcNalType::EosNut => "EOS_NUT",
            HevcNalType::EobNut => "EOB_NUT",
            HevcNalType::FdNut => "FD_NUT",
            HevcNalType::SeiPrefix => "SEI_PREFIX",
            HevcNalType::SeiSuffix => "SEI_SUFFIX",
            HevcNalType::RsvNvcl(_) => "RSV_NVCL",
            HevcNalType::Unspecified(_) => "UNSPEC",
        }
    }
}

impl fmt::Display for HevcNalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HevcNalType::RsvVcl(t)
            | HevcNalType::RsvIrapVcl(t)
            | HevcNalType::RsvVclHigh(t)
            | HevcNalType::RsvNvcl(t)
            | HevcNalType::Unspecified(t) => write!(f, "{}{}", self.name(), t),
            _ => f.write_str(self.name()),
        }
    }
}

/// Walk an HVCC record starting at `start`.
///
/// Fails only when lengthSizeMinusOne is missing; anything after it that does
/// not fit ends the walk with a truncated scan.
pub fn scan_hvcc_config(buf: &[u8], start: usize) -> Result<DecoderConfigScan> {
    let nalu_length_size = (read_be(buf, start + HVCC_LENGTH_SIZE_OFFSET, 1)? as u8 & 0x03) + 1;

    let scan = NalScan::run(|units| {
        let mut offset = start + HVCC_NUM_ARRAYS_OFFSET;
        let num_arrays = read_be(buf, offset, 1)?;
        offset += 1;

        for _ in 0..num_arrays {
            let array_type = HevcNalType::from_type(read_be(buf, offset, 1)? as u8);
            let num_nalus = read_be(buf, offset + 1, 2)?;
            offset += 3;
            tracing::trace!(array_type = %array_type, count = num_nalus, "HVCC array");
            walk_parameter_sets(buf, &mut offset, num_nalus, NalCodec::Hevc, units)?;
        }
        Ok(())
    });

    Ok(DecoderConfigScan {
        nalu_length_size,
        scan,
    })
}

/// Walk length-prefixed HEVC NAL units from `start` to the end of `buf`
pub fn scan_hevc_nalus(buf: &[u8], start: usize, nalu_length_size: u8) -> NalScan {
    NalScan::run(|units| {
        walk_length_prefixed(buf, start, nalu_length_size as usize, NalCodec::Hevc, units)
    })
}

/// Find start-code delimited HEVC NAL units from `start` on
pub fn scan_hevc_annexb(buf: &[u8], start: usize) -> NalScan {
    NalScan::run(|units| scan_annexb(buf, start, NalCodec::Hevc, units))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::nal::NalType;

    /// HVCC with one VPS, one SPS and one PPS array
    fn hvcc() -> Vec<u8> {
        let mut record = vec![0x01];
        record.extend_from_slice(&[0x00; 20]);
        record.push(0xF3); // lengthSizeMinusOne = 3
        record.push(0x03); // numOfArrays
        for (nal_type, header) in [(32u8, 0x40u8), (33, 0x42), (34, 0x44)] {
            record.push(0x80 | nal_type);
            record.extend_from_slice(&[0x00, 0x01]); // one NAL
            record.extend_from_slice(&[0x00, 0x03]); // 3 bytes
            record.extend_from_slice(&[header, 0x01, 0x0C]);
        }
        record
    }

    #[test]
    fn test_nal_type_from_header_byte() {
        assert_eq!(HevcNalType::from_byte(0x40), HevcNalType::Vps);
        assert_eq!(HevcNalType::from_byte(0x42), HevcNalType::Sps);
        assert_eq!(HevcNalType::from_byte(0x44), HevcNalType::Pps);
        assert_eq!(HevcNalType::from_byte(0x26), HevcNalType::IdrWRadl);
        assert_eq!(HevcNalType::from_byte(0x02), HevcNalType::TrailR);
        assert_eq!(HevcNalType::from_byte(0x4E), HevcNalType::SeiPrefix);
        assert_eq!(HevcNalType::from_byte(0x7E), HevcNalType::Unspecified(63));
    }

    #[test]
    fn test_nal_type_ranges() {
        assert_eq!(HevcNalType::from_type(12), HevcNalType::RsvVcl(12));
        assert_eq!(HevcNalType::from_type(23), HevcNalType::RsvIrapVcl(23));
        assert_eq!(HevcNalType::from_type(30), HevcNalType::RsvVclHigh(30));
        assert_eq!(HevcNalType::from_type(45), HevcNalType::RsvNvcl(45));
        assert_eq!(HevcNalType::RsvNvcl(45).to_string(), "RSV_NVCL45");
        assert_eq!(HevcNalType::CraNut.to_string(), "CRA_NUT");
    }

    #[test]
    fn test_nal_type_predicates() {
        assert!(HevcNalType::IdrWRadl.is_keyframe());
        assert!(HevcNalType::CraNut.is_keyframe());
        assert!(!HevcNalType::TrailR.is_keyframe());
        assert!(HevcNalType::Vps.is_parameter_set());
        assert!(!HevcNalType::Aud.is_parameter_set());
    }

    #[test]
    fn test_scan_hvcc_config() {
        let record = hvcc();
        let config = scan_hvcc_config(&record, 0).unwrap();
        assert_eq!(config.nalu_length_size, 4);
        assert!(!config.scan.is_truncated());

        let types: Vec<_> = config.scan.units.iter().map(|u| u.nal_type).collect();
        assert_eq!(
            types,
            vec![
                NalType::Hevc(HevcNalType::Vps),
                NalType::Hevc(HevcNalType::Sps),
                NalType::Hevc(HevcNalType::Pps),
            ]
        );
        // 23 fixed bytes, then 3 array header bytes + 2 length bytes
        assert_eq!(config.scan.units[0].offset, 28);
        assert_eq!(config.scan.units[1].offset, 36);
        assert_eq!(config.scan.units[2].offset, 44);
    }

    #[test]
    fn test_scan_hvcc_config_truncated() {
        let record = hvcc();
        let config = scan_hvcc_config(&record[..34], 0).unwrap();
        assert!(config.scan.is_truncated());
        assert_eq!(config.scan.units.len(), 1);

        assert!(scan_hvcc_config(&record[..20], 0).is_err());
    }

    #[test]
    fn test_scan_hevc_nalus_truncated() {
        let data = [
            0x00, 0x00, 0x00, 0x03, 0x26, 0x01, 0xAF, // IDR_W_RADL
            0x00, 0x00, 0x00, 0x40, 0x02, 0x01, // TRAIL_R claiming 64 bytes
            0x00, 0x00, 0x00, 0x02, 0x02, 0x01, // never reached
        ];
        let scan = scan_hevc_nalus(&data, 0, 4);
        assert!(scan.is_truncated());
        assert_eq!(scan.units.len(), 2);
        assert_eq!(scan.units[1].nal_type, NalType::Hevc(HevcNalType::TrailR));
    }

    #[test]
    fn test_scan_hevc_annexb() {
        let data = [0x00, 0x00, 0x01, 0x40, 0x01, 0x00, 0x00, 0x00, 0x01, 0x42, 0x01];
        let scan = scan_hevc_annexb(&data, 0);
        assert_eq!(scan.units.len(), 2);
        assert_eq!(scan.units[0].offset, 3);
        assert_eq!(scan.units[1].offset, 9);
    }
}
