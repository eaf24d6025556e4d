//! CCSDS space packet primary header
//!
//! The layout follows the CCSDS 133.0-B Space Packet Protocol. The first
//! 32 bits of every packet form the header word:
//!
//! | Bits  | Field                   |
//! |-------|-------------------------|
//! | 31-29 | Packet version number   |
//! | 28    | Packet type (0 TM/1 TC) |
//! | 27    | Secondary header flag   |
//! | 26-16 | APID                    |
//! | 15-14 | Sequence flags          |
//! | 13-0  | Packet sequence count   |
//!
//! followed by a 16-bit packet data length equal to the number of bytes
//! after the primary header minus one.

use serde::{Deserialize, Serialize};

use crate::types::{Apid, SeqCount};

/// Length of the primary header in bytes
pub const PRIMARY_HEADER_LEN: usize = 6;

/// Length of the mission-elapsed time secondary header in bytes
pub const SECONDARY_TIME_HEADER_LEN: usize = 4;

/// Offset of the packet data length field
pub const DATA_LENGTH_OFFSET: usize = 4;

/// Difference between the total packet length and its data length field
pub const DATA_LENGTH_BIAS: usize = PRIMARY_HEADER_LEN + 1;

/// Largest packet whose data length still fits in 16 bits
pub const MAX_PACKET_LEN: usize = u16::MAX as usize + DATA_LENGTH_BIAS;

/// Sequence flags value for an unsegmented packet
pub const SEQ_FLAGS_UNSEGMENTED: u8 = 0b11;

/// Packet type bit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PacketType {
    Telemetry,
    Telecommand,
}

/// The leading 32 bits of a packet
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct HeaderWord(pub u32);

impl HeaderWord {
    /// Read the big-endian header word, if the buffer holds one
    pub fn read(bytes: &[u8]) -> Option<Self> {
        let word: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
        Some(Self(u32::from_be_bytes(word)))
    }

    /// Write the header word into the first four bytes of `buf`
    pub fn write(&self, buf: &mut [u8]) -> Option<()> {
        buf.get_mut(..4)?.copy_from_slice(&self.0.to_be_bytes());
        Some(())
    }

    pub fn apid(&self) -> Apid {
        Apid::new((self.0 >> 16) as u16)
    }

    pub fn seq_count(&self) -> SeqCount {
        SeqCount::new(self.0 as u16)
    }

    pub fn version(&self) -> u8 {
        (self.0 >> 29) as u8 & 0b111
    }

    pub fn packet_type(&self) -> PacketType {
        if self.0 & (1 << 28) == 0 {
            PacketType::Telemetry
        } else {
            PacketType::Telecommand
        }
    }

    pub fn has_secondary_header(&self) -> bool {
        self.0 & (1 << 27) != 0
    }

    pub fn sequence_flags(&self) -> u8 {
        (self.0 >> 14) as u8 & 0b11
    }

    /// Same word with the low 14 bits replaced; every other bit is kept
    pub fn with_seq_count(&self, seq: SeqCount) -> Self {
        Self((self.0 & !u32::from(SeqCount::MASK)) | u32::from(seq.value()))
    }
}

/// Read the packet data length field
pub fn read_data_length(bytes: &[u8]) -> Option<u16> {
    let field: [u8; 2] = bytes
        .get(DATA_LENGTH_OFFSET..DATA_LENGTH_OFFSET + 2)?
        .try_into()
        .ok()?;
    Some(u16::from_be_bytes(field))
}

/// Data length field value for a packet of `total_len` bytes
pub fn data_length_for(total_len: usize) -> Option<u16> {
    total_len
        .checked_sub(DATA_LENGTH_BIAS)
        .and_then(|len| u16::try_from(len).ok())
}

/// Fully decoded primary header
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrimaryHeader {
    pub version: u8,
    pub packet_type: PacketType,
    pub secondary_header: bool,
    pub apid: Apid,
    pub sequence_flags: u8,
    pub seq_count: SeqCount,
    pub data_length: u16,
}

impl PrimaryHeader {
    /// Header for an unsegmented version-0 telemetry packet
    pub fn telemetry(apid: Apid, seq_count: SeqCount, secondary_header: bool, data_len: usize) -> Self {
        Self {
            version: 0,
            packet_type: PacketType::Telemetry,
            secondary_header,
            apid,
            sequence_flags: SEQ_FLAGS_UNSEGMENTED,
            seq_count,
            data_length: data_len.saturating_sub(1).min(u16::MAX as usize) as u16,
        }
    }

    pub fn word(&self) -> HeaderWord {
        let type_bit = match self.packet_type {
            PacketType::Telemetry => 0,
            PacketType::Telecommand => 1,
        };
        HeaderWord(
            (u32::from(self.version & 0b111) << 29)
                | (type_bit << 28)
                | (u32::from(self.secondary_header) << 27)
                | (u32::from(self.apid.value()) << 16)
                | (u32::from(self.sequence_flags & 0b11) << 14)
                | u32::from(self.seq_count.value()),
        )
    }

    pub fn encode(&self) -> [u8; PRIMARY_HEADER_LEN] {
        let mut out = [0u8; PRIMARY_HEADER_LEN];
        out[..4].copy_from_slice(&self.word().0.to_be_bytes());
        out[4..].copy_from_slice(&self.data_length.to_be_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let word = HeaderWord::read(bytes)?;
        let data_length = read_data_length(bytes)?;
        Some(Self {
            version: word.version(),
            packet_type: word.packet_type(),
            secondary_header: word.has_secondary_header(),
            apid: word.apid(),
            sequence_flags: word.sequence_flags(),
            seq_count: word.seq_count(),
            data_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_word_fields() {
        let word = HeaderWord(0x1234ABCD);
        assert_eq!(word.apid().value(), ((0x1234ABCD_u32 >> 16) & 0x07FF) as u16);
        assert_eq!(word.seq_count().value(), (0x1234ABCD_u32 & 0x3FFF) as u16);
        assert_eq!(word.version(), 0);
        assert_eq!(word.packet_type(), PacketType::Telecommand);
        assert!(!word.has_secondary_header());
        assert_eq!(word.sequence_flags(), 0b10);
    }

    #[test]
    fn test_header_word_read_short() {
        assert_eq!(HeaderWord::read(&[0x12, 0x34, 0xAB]), None);
        assert_eq!(HeaderWord::read(&[0x12, 0x34, 0xAB, 0xCD, 0xFF]), Some(HeaderWord(0x1234ABCD)));
    }

    #[test]
    fn test_with_seq_count_keeps_upper_bits() {
        let word = HeaderWord(0xFFFF_FFFF).with_seq_count(SeqCount::new(0));
        assert_eq!(word.0, 0xFFFF_C000);
    }

    #[test]
    fn test_data_length_for() {
        assert_eq!(data_length_for(20), Some(13));
        assert_eq!(data_length_for(7), Some(0));
        assert_eq!(data_length_for(6), None);
        assert_eq!(data_length_for(MAX_PACKET_LEN), Some(u16::MAX));
        assert_eq!(data_length_for(MAX_PACKET_LEN + 1), None);
    }

    #[test]
    fn test_primary_header_layout() {
        // Version 0, TM, secondary header, APID 100, unsegmented, count 5, 11 data bytes
        let header = PrimaryHeader::telemetry(Apid::new(100), SeqCount::new(5), true, 11);
        assert_eq!(header.encode(), [0x08, 0x64, 0xC0, 0x05, 0x00, 0x0A]);
        assert_eq!(PrimaryHeader::decode(&header.encode()), Some(header));
    }
}
