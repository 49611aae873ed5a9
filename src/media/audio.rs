//! Audio tag payload classification
//!
//! FLV Audio Data:
//! ```text
//! +-----------+----------+----------+----------+---------+
//! |SoundFormat|SoundRate |SoundSize |SoundType | AACType | AudioData...
//! | (4 bits)  | (2 bits) | (1 bit)  | (1 bit)  | (1 byte)|
//! +-----------+----------+----------+----------+---------+
//! ```
//!
//! AACType is only present when SoundFormat is 10 (AAC). Frame structure
//! inside the audio data is not extracted.

use std::fmt;

/// Sound format (upper 4 bits of first byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundFormat {
    /// Linear PCM, platform endian
    LinearPcmPlatform,
    /// ADPCM
    Adpcm,
    /// MP3
    Mp3,
    /// Linear PCM, little endian
    LinearPcmLe,
    /// Nellymoser 16kHz mono
    Nellymoser16kMono,
    /// Nellymoser 8kHz mono
    Nellymoser8kMono,
    /// Nellymoser
    Nellymoser,
    /// G.711 A-law
    G711ALaw,
    /// G.711 mu-law
    G711MuLaw,
    /// AAC
    Aac,
    /// Speex
    Speex,
    /// MP3 8kHz
    Mp38k,
    /// Device-specific sound
    DeviceSpecific,
    /// 9, 12 and 13
    Reserved(u8),
}

impl SoundFormat {
    pub fn from_byte(b: u8) -> Self {
        match (b >> 4) & 0x0F {
            0 => SoundFormat::LinearPcmPlatform,
            1 => SoundFormat::Adpcm,
            2 => SoundFormat::Mp3,
            3 => SoundFormat::LinearPcmLe,
            4 => SoundFormat::Nellymoser16kMono,
            5 => SoundFormat::Nellymoser8kMono,
            6 => SoundFormat::Nellymoser,
            7 => SoundFormat::G711ALaw,
            8 => SoundFormat::G711MuLaw,
            10 => SoundFormat::Aac,
            11 => SoundFormat::Speex,
            14 => SoundFormat::Mp38k,
            15 => SoundFormat::DeviceSpecific,
            other => SoundFormat::Reserved(other),
        }
    }

    pub fn value(&self) -> u8 {
        match self {
            SoundFormat::LinearPcmPlatform => 0,
            SoundFormat::Adpcm => 1,
            SoundFormat::Mp3 => 2,
            SoundFormat::LinearPcmLe => 3,
            SoundFormat::Nellymoser16kMono => 4,
            SoundFormat::Nellymoser8kMono => 5,
            SoundFormat::Nellymoser => 6,
            SoundFormat::G711ALaw => 7,
            SoundFormat::G711MuLaw => 8,
            SoundFormat::Aac => 10,
            SoundFormat::Speex => 11,
            SoundFormat::Mp38k => 14,
            SoundFormat::DeviceSpecific => 15,
            SoundFormat::Reserved(v) => *v,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SoundFormat::LinearPcmPlatform => "Linear PCM, platform endian",
            SoundFormat::Adpcm => "ADPCM",
            SoundFormat::Mp3 => "MP3",
            SoundFormat::LinearPcmLe => "Linear PCM, little endian",
            SoundFormat::Nellymoser16kMono => "Nellymoser 16 kHz mono",
            SoundFormat::Nellymoser8kMono => "Nellymoser 8 kHz mono",
            SoundFormat::Nellymoser => "Nellymoser",
            SoundFormat::G711ALaw => "G.711 A-law logarithmic PCM",
            SoundFormat::G711MuLaw => "G.711 mu-law logarithmic PCM",
            SoundFormat::Aac => "AAC",
            SoundFormat::Speex => "Speex",
            SoundFormat::Mp38k => "MP3 8 kHz",
            SoundFormat::DeviceSpecific => "Device-specific sound",
            SoundFormat::Reserved(_) => "reserved",
        }
    }
}

impl fmt::Display for SoundFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name(), self.value())
    }
}

/// Audio sample rate (bits 2-3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundRate {
    Rate5512,
    Rate11025,
    Rate22050,
    Rate44100,
}

impl SoundRate {
    pub fn from_byte(b: u8) -> Self {
        match (b >> 2) & 0x03 {
            0 => SoundRate::Rate5512,
            1 => SoundRate::Rate11025,
            2 => SoundRate::Rate22050,
            _ => SoundRate::Rate44100,
        }
    }

    pub fn value(&self) -> u8 {
        match self {
            SoundRate::Rate5512 => 0,
            SoundRate::Rate11025 => 1,
            SoundRate::Rate22050 => 2,
            SoundRate::Rate44100 => 3,
        }
    }

    pub fn to_hz(&self) -> u32 {
        match self {
            SoundRate::Rate5512 => 5512,
            SoundRate::Rate11025 => 11025,
            SoundRate::Rate22050 => 22050,
            SoundRate::Rate44100 => 44100,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SoundRate::Rate5512 => "5.5 KHz",
            SoundRate::Rate11025 => "11 KHz",
            SoundRate::Rate22050 => "22 KHz",
            SoundRate::Rate44100 => "44 KHz",
        }
    }
}

impl fmt::Display for SoundRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name(), self.value())
    }
}

/// Sample size (bit 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundSize {
    Bits8,
    Bits16,
}

impl SoundSize {
    pub fn from_byte(b: u8) -> Self {
        if (b >> 1) & 0x01 == 0 {
            SoundSize::Bits8
        } else {
            SoundSize::Bits16
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            SoundSize::Bits8 => 8,
            SoundSize::Bits16 => 16,
        }
    }
}

/// Channel layout (bit 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundType {
    Mono,
    Stereo,
}

impl SoundType {
    pub fn from_byte(b: u8) -> Self {
        if b & 0x01 == 0 {
            SoundType::Mono
        } else {
            SoundType::Stereo
        }
    }

    pub fn channels(&self) -> u8 {
        match self {
            SoundType::Mono => 1,
            SoundType::Stereo => 2,
        }
    }
}

/// AAC packet type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AacPacketType {
    /// Sequence header (AudioSpecificConfig)
    SequenceHeader,
    /// Raw AAC frame data
    Raw,
    Unknown(u8),
}

impl AacPacketType {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => AacPacketType::SequenceHeader,
            1 => AacPacketType::Raw,
            other => AacPacketType::Unknown(other),
        }
    }

    pub fn value(&self) -> u8 {
        match self {
            AacPacketType::SequenceHeader => 0,
            AacPacketType::Raw => 1,
            AacPacketType::Unknown(v) => *v,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AacPacketType::SequenceHeader => "AAC sequence header",
            AacPacketType::Raw => "AAC raw",
            AacPacketType::Unknown(_) => "(unknown)",
        }
    }
}

impl fmt::Display for AacPacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name(), self.value())
    }
}

/// Classified audio tag payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioTagInfo {
    pub sound_format: SoundFormat,
    pub sound_rate: SoundRate,
    pub sound_size: SoundSize,
    pub sound_type: SoundType,
    /// Set only for AAC payloads with a second byte
    pub aac_packet_type: Option<AacPacketType>,
}

impl AudioTagInfo {
    /// Classify an audio payload (without the tag header).
    ///
    /// Returns `None` for an empty payload.
    pub fn classify(payload: &[u8]) -> Option<Self> {
        let first = *payload.first()?;
        let sound_format = SoundFormat::from_byte(first);
        let aac_packet_type = match sound_format {
            SoundFormat::Aac => payload.get(1).map(|&b| AacPacketType::from_byte(b)),
            _ => None,
        };

        Some(Self {
            sound_format,
            sound_rate: SoundRate::from_byte(first),
            sound_size: SoundSize::from_byte(first),
            sound_type: SoundType::from_byte(first),
            aac_packet_type,
        })
    }

    /// Check if this is an AAC sequence header
    pub fn is_sequence_header(&self) -> bool {
        self.aac_packet_type == Some(AacPacketType::SequenceHeader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_aac() {
        let info = AudioTagInfo::classify(&[0xAF, 0x00, 0x12, 0x10]).unwrap();
        assert_eq!(info.sound_format, SoundFormat::Aac);
        assert_eq!(info.sound_rate, SoundRate::Rate44100);
        assert_eq!(info.sound_size, SoundSize::Bits16);
        assert_eq!(info.sound_type, SoundType::Stereo);
        assert_eq!(info.aac_packet_type, Some(AacPacketType::SequenceHeader));
        assert!(info.is_sequence_header());

        let info = AudioTagInfo::classify(&[0xAF, 0x01, 0x21]).unwrap();
        assert_eq!(info.aac_packet_type, Some(AacPacketType::Raw));
        assert!(!info.is_sequence_header());
    }

    #[test]
    fn test_classify_aac_single_byte() {
        let info = AudioTagInfo::classify(&[0xAF]).unwrap();
        assert_eq!(info.sound_format, SoundFormat::Aac);
        assert!(info.aac_packet_type.is_none());
    }

    #[test]
    fn test_classify_mp3() {
        // MP3, 22 kHz, 8-bit, mono; second byte is not a packet type
        let info = AudioTagInfo::classify(&[0x28, 0x00]).unwrap();
        assert_eq!(info.sound_format, SoundFormat::Mp3);
        assert_eq!(info.sound_rate, SoundRate::Rate22050);
        assert_eq!(info.sound_size, SoundSize::Bits8);
        assert_eq!(info.sound_type, SoundType::Mono);
        assert!(info.aac_packet_type.is_none());
    }

    #[test]
    fn test_classify_empty() {
        assert!(AudioTagInfo::classify(&[]).is_none());
    }

    #[test]
    fn test_sound_format_all_values() {
        let expected = [
            (0x00, SoundFormat::LinearPcmPlatform),
            (0x10, SoundFormat::Adpcm),
            (0x20, SoundFormat::Mp3),
            (0x30, SoundFormat::LinearPcmLe),
            (0x40, SoundFormat::Nellymoser16kMono),
            (0x50, SoundFormat::Nellymoser8kMono),
            (0x60, SoundFormat::Nellymoser),
            (0x70, SoundFormat::G711ALaw),
            (0x80, SoundFormat::G711MuLaw),
            (0x90, SoundFormat::Reserved(9)),
            (0xA0, SoundFormat::Aac),
            (0xB0, SoundFormat::Speex),
            (0xC0, SoundFormat::Reserved(12)),
            (0xE0, SoundFormat::Mp38k),
            (0xF0, SoundFormat::DeviceSpecific),
        ];
        for (byte, format) in expected {
            assert_eq!(SoundFormat::from_byte(byte), format);
            assert_eq!(format.value(), byte >> 4);
        }
    }

    #[test]
    fn test_sound_rate() {
        assert_eq!(SoundRate::from_byte(0x00).to_hz(), 5512);
        assert_eq!(SoundRate::from_byte(0x04).to_hz(), 11025);
        assert_eq!(SoundRate::from_byte(0x08).to_hz(), 22050);
        assert_eq!(SoundRate::from_byte(0x0C).to_hz(), 44100);
        // Test masking
        assert_eq!(SoundRate::from_byte(0xFF).to_hz(), 44100);
    }

    #[test]
    fn test_names() {
        assert_eq!(SoundFormat::Aac.to_string(), "AAC [10]");
        assert_eq!(SoundRate::Rate44100.to_string(), "44 KHz [3]");
        assert_eq!(AacPacketType::Raw.to_string(), "AAC raw [1]");
        assert_eq!(AacPacketType::Unknown(7).to_string(), "(unknown) [7]");
        assert_eq!(SoundSize::Bits16.bits(), 16);
        assert_eq!(SoundType::Stereo.channels(), 2);
    }
}
