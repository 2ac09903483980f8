//! 16-bit ones'-complement style checksum over a whole segment.
//!
//! The segment is read as twelve little-endian 16-bit words with the checksum
//! field zeroed. Words are summed into a 32-bit accumulator, the carry is
//! folded back twice and the low 16 bits are complemented.

use tcp_mock_abstract::{CHECKSUM_OFFSET, SEGMENT_LEN, Segment};

pub fn checksum_bytes(bytes: &[u8; SEGMENT_LEN]) -> u16 {
    let mut sum: u32 = 0;
    for (i, chunk) in bytes.chunks_exact(2).enumerate() {
        if i * 2 == CHECKSUM_OFFSET {
            continue;
        }
        sum = sum.wrapping_add(u16::from_le_bytes([chunk[0], chunk[1]]) as u32);
    }

    // Twelve words never carry past two folds.
    sum = (sum & 0xFFFF) + (sum >> 16);
    sum = (sum & 0xFFFF) + (sum >> 16);

    !(sum as u16)
}

/// Checksum of `segment` as if its checksum field were zero.
pub fn checksum(segment: &Segment) -> u16 {
    checksum_bytes(&segment.encode())
}

/// Writes the checksum into the segment. Must be the last change before sending.
pub fn stamp(segment: &mut Segment) {
    segment.checksum = 0;
    segment.checksum = checksum(segment);
}

pub fn verify(segment: &Segment) -> bool {
    checksum(segment) == segment.checksum
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcp_mock_abstract::{ControlWord, Flag};

    fn sample() -> Segment {
        let mut seg = Segment {
            src_port: 27015,
            dst_port: 27015,
            seq_num: 1000,
            ack_num: 0,
            control: ControlWord::with_header_len(),
            ..Default::default()
        };
        seg.set_flag(Flag::Syn);
        seg
    }

    #[test]
    fn known_value() {
        // 0x6987 * 2 + 0x03E8 + 0x6002 = 0x1_36F8, folds to 0x36F9
        assert_eq!(checksum(&sample()), 0xC906);
    }

    #[test]
    fn ignores_current_checksum_field() {
        let mut seg = sample();
        let clean = checksum(&seg);
        seg.checksum = 0xABCD;
        assert_eq!(checksum(&seg), clean);
    }

    #[test]
    fn stamped_segment_verifies() {
        let mut seg = sample();
        stamp(&mut seg);
        assert!(verify(&seg));

        seg.ack_num = 77;
        seg.set_flag(Flag::Ack);
        stamp(&mut seg);
        assert!(verify(&seg));
    }

    #[test]
    fn any_single_byte_flip_breaks_verification() {
        let mut seg = sample();
        stamp(&mut seg);
        let wire = seg.encode();

        for idx in 0..SEGMENT_LEN {
            let mut corrupted = wire;
            corrupted[idx] ^= 0x01;
            let decoded = Segment::decode(&corrupted).expect("length is fixed");
            assert!(!verify(&decoded), "flip at byte {idx} went unnoticed");
        }
    }

    #[test]
    fn carries_are_folded() {
        let seg = Segment {
            src_port: 0xFFFF,
            dst_port: 0xFFFF,
            seq_num: 0xFFFF_FFFF,
            ack_num: 0xFFFF_FFFF,
            control: ControlWord::from_bits(0xFFFF),
            window: 0xFFFF,
            urgent_ptr: 0xFFFF,
            options: 0xFFFF_FFFF,
            ..Default::default()
        };
        // Eleven 0xFFFF words fold to 0xFFFF, whose complement is zero.
        assert_eq!(checksum(&seg), 0x0000);
    }
}
