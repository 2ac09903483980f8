//! Fixed-layout segment header shared by both ends of an exchange.
//!
//! All multi-byte fields are **little-endian** on the wire, which is the
//! in-memory layout of the reference C programs on x86 hosts.
//!
//! ```text
//!  0               1               2               3
//! +-------------------------------+-------------------------------+
//! |          Source Port          |       Destination Port        |
//! +-------------------------------+-------------------------------+
//! |                        Sequence Number                        |
//! +---------------------------------------------------------------+
//! |                     Acknowledgment Number                     |
//! +-------------------------------+-------------------------------+
//! |  Control (len|rsvd|flags)     |        Receive Window         |
//! +-------------------------------+-------------------------------+
//! |           Checksum            |        Urgent Pointer         |
//! +-------------------------------+-------------------------------+
//! |                            Options                            |
//! +---------------------------------------------------------------+
//! ```

use std::fmt;

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interface::SequenceSource;

/// Bit masks inside the 16-bit control word.
pub mod flags {
    pub const FIN: u16 = 0x0001;
    pub const SYN: u16 = 0x0002;
    pub const RST: u16 = 0x0004;
    pub const PSH: u16 = 0x0008;
    pub const ACK: u16 = 0x0010;
    pub const URG: u16 = 0x0020;

    /// All six flag bits.
    pub const MASK_FLAGS: u16 = 0x003F;
    pub const MASK_RESERVED: u16 = 0x0FC0;
    pub const MASK_OFFSET: u16 = 0xF000;
}

/// Size of an encoded segment in bytes.
pub const SEGMENT_LEN: usize = 24;

/// Header length in 32-bit words, stored in the top nibble of the control word.
pub const HEADER_WORDS: u16 = (SEGMENT_LEN / 4) as u16;

/// Exclusive upper bound for generated initial sequence numbers.
/// Keeps `isn + 1` clear of the 32-bit wraparound.
pub const SEQUENCE_LIMIT: u32 = 0xFFFF_FFF0;

/// Byte offset of the checksum field inside an encoded segment.
pub const CHECKSUM_OFFSET: usize = 16;

const RESERVED_SHIFT: u16 = 6;
const OFFSET_SHIFT: u16 = 12;

/// A single control flag, identified by its bit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Flag {
    Fin = 0,
    Syn = 1,
    Rst = 2,
    Psh = 3,
    Ack = 4,
    Urg = 5,
}

impl Flag {
    /// Every flag, ordered by bit position.
    pub const ALL: [Flag; 6] = [
        Flag::Fin,
        Flag::Syn,
        Flag::Rst,
        Flag::Psh,
        Flag::Ack,
        Flag::Urg,
    ];

    pub const fn bit(self) -> u8 {
        self as u8
    }

    pub const fn mask(self) -> u16 {
        match self {
            Flag::Fin => flags::FIN,
            Flag::Syn => flags::SYN,
            Flag::Rst => flags::RST,
            Flag::Psh => flags::PSH,
            Flag::Ack => flags::ACK,
            Flag::Urg => flags::URG,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Flag::Fin => "FIN",
            Flag::Syn => "SYN",
            Flag::Rst => "RST",
            Flag::Psh => "PSH",
            Flag::Ack => "ACK",
            Flag::Urg => "URG",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The packed 16-bit word holding header length, reserved bits and flags.
///
/// ```text
///  15    12 11         6 5           0
/// +--------+------------+-------------+
/// | offset |  reserved  | U A P R S F |
/// +--------+------------+-------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlWord(u16);

impl ControlWord {
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    /// A control word with only the header length filled in.
    pub const fn with_header_len() -> Self {
        Self(HEADER_WORDS << OFFSET_SHIFT)
    }

    pub fn set(&mut self, flag: Flag) {
        self.0 |= flag.mask();
    }

    /// Clears exactly one flag bit; header length and the other flags are untouched.
    pub fn clear(&mut self, flag: Flag) {
        self.0 &= !flag.mask();
    }

    pub const fn is_set(self, flag: Flag) -> bool {
        self.0 & flag.mask() != 0
    }

    pub const fn header_len(self) -> u8 {
        ((self.0 & flags::MASK_OFFSET) >> OFFSET_SHIFT) as u8
    }

    pub const fn reserved(self) -> u8 {
        ((self.0 & flags::MASK_RESERVED) >> RESERVED_SHIFT) as u8
    }

    pub const fn flag_bits(self) -> u8 {
        (self.0 & flags::MASK_FLAGS) as u8
    }

    /// Flags currently set, in bit order.
    pub fn set_flags(self) -> impl Iterator<Item = Flag> {
        Flag::ALL.into_iter().filter(move |flag| self.is_set(*flag))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("segment must be exactly 24 bytes, got {0}")]
    Length(usize),
}

/// One segment header. No payload is ever attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Segment {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq_num: u32,
    pub ack_num: u32,
    pub control: ControlWord,
    /// Receive window. Always zero.
    pub window: u16,
    pub checksum: u16,
    /// Urgent pointer. Always zero.
    pub urgent_ptr: u16,
    /// Options word. Always zero.
    pub options: u32,
}

impl Segment {
    /// A zeroed segment with ports assigned, a fresh initial sequence number
    /// and the header length filled in.
    pub fn create(src_port: u16, dst_port: u16, sequence: &mut dyn SequenceSource) -> Self {
        Self {
            src_port,
            dst_port,
            seq_num: sequence.next_sequence(),
            control: ControlWord::with_header_len(),
            ..Default::default()
        }
    }

    pub fn set_flag(&mut self, flag: Flag) {
        self.control.set(flag);
    }

    pub fn clear_flag(&mut self, flag: Flag) {
        self.control.clear(flag);
    }

    pub fn check_flag(&self, flag: Flag) -> bool {
        self.control.is_set(flag)
    }

    pub fn header_len(&self) -> u8 {
        self.control.header_len()
    }

    pub fn reserved(&self) -> u8 {
        self.control.reserved()
    }

    pub fn encode(&self) -> [u8; SEGMENT_LEN] {
        let mut out = [0u8; SEGMENT_LEN];
        let mut buf = &mut out[..];
        buf.put_u16_le(self.src_port);
        buf.put_u16_le(self.dst_port);
        buf.put_u32_le(self.seq_num);
        buf.put_u32_le(self.ack_num);
        buf.put_u16_le(self.control.bits());
        buf.put_u16_le(self.window);
        buf.put_u16_le(self.checksum);
        buf.put_u16_le(self.urgent_ptr);
        buf.put_u32_le(self.options);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != SEGMENT_LEN {
            return Err(DecodeError::Length(bytes.len()));
        }

        let mut buf = bytes;
        Ok(Self {
            src_port: buf.get_u16_le(),
            dst_port: buf.get_u16_le(),
            seq_num: buf.get_u32_le(),
            ack_num: buf.get_u32_le(),
            control: ControlWord::from_bits(buf.get_u16_le()),
            window: buf.get_u16_le(),
            checksum: buf.get_u16_le(),
            urgent_ptr: buf.get_u16_le(),
            options: buf.get_u32_le(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(u32);

    impl SequenceSource for Constant {
        fn next_sequence(&mut self) -> u32 {
            self.0
        }
    }

    #[test]
    fn create_fills_ports_sequence_and_header_len_only() {
        let seg = Segment::create(27015, 80, &mut Constant(1234));
        assert_eq!(seg.src_port, 27015);
        assert_eq!(seg.dst_port, 80);
        assert_eq!(seg.seq_num, 1234);
        assert_eq!(seg.ack_num, 0);
        assert_eq!(seg.header_len(), 6);
        assert_eq!(seg.reserved(), 0);
        assert_eq!(seg.control.flag_bits(), 0);
        assert_eq!(seg.control.bits(), 0x6000);
        assert_eq!((seg.window, seg.checksum, seg.urgent_ptr, seg.options), (0, 0, 0, 0));
    }

    #[test]
    fn setting_one_flag_never_reports_another() {
        for set in Flag::ALL {
            let mut word = ControlWord::with_header_len();
            word.set(set);
            for other in Flag::ALL.into_iter().filter(|f| *f != set) {
                assert!(!word.is_set(other), "{set} leaked into {other}");
            }
            assert!(word.is_set(set));
        }
    }

    #[test]
    fn clearing_one_flag_keeps_the_rest_of_the_word() {
        let mut word = ControlWord::with_header_len();
        word.set(Flag::Syn);
        word.set(Flag::Ack);
        word.clear(Flag::Ack);

        assert!(word.is_set(Flag::Syn));
        assert!(!word.is_set(Flag::Ack));
        assert_eq!(word.header_len(), HEADER_WORDS as u8);
    }

    #[test]
    fn clearing_an_unset_flag_is_a_no_op() {
        let mut word = ControlWord::with_header_len();
        word.set(Flag::Fin);
        let before = word;
        word.clear(Flag::Urg);
        assert_eq!(word, before);
    }

    #[test]
    fn subfields_are_extracted_by_mask() {
        let word = ControlWord::from_bits(0xA000 | (0x2A << 6) | flags::ACK | flags::FIN);
        assert_eq!(word.header_len(), 0xA);
        assert_eq!(word.reserved(), 0x2A);
        assert_eq!(word.flag_bits(), 0b01_0001);
        assert_eq!(word.set_flags().collect::<Vec<_>>(), vec![Flag::Fin, Flag::Ack]);
    }

    #[test]
    fn encode_is_little_endian_in_field_order() {
        let seg = Segment {
            src_port: 0x0102,
            dst_port: 0x0304,
            seq_num: 0x0506_0708,
            ack_num: 0x090A_0B0C,
            control: ControlWord::from_bits(0x6012),
            checksum: 0xBEEF,
            ..Default::default()
        };

        let bytes = seg.encode();
        assert_eq!(&bytes[0..4], &[0x02, 0x01, 0x04, 0x03]);
        assert_eq!(&bytes[4..8], &[0x08, 0x07, 0x06, 0x05]);
        assert_eq!(&bytes[8..12], &[0x0C, 0x0B, 0x0A, 0x09]);
        assert_eq!(&bytes[12..14], &[0x12, 0x60]);
        assert_eq!(&bytes[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2], &[0xEF, 0xBE]);
        assert_eq!(Segment::decode(&bytes), Ok(seg));
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert_eq!(Segment::decode(&[0u8; 23]), Err(DecodeError::Length(23)));
        assert_eq!(Segment::decode(&[0u8; 25]), Err(DecodeError::Length(25)));
    }
}
