//! Checks applied to received segments. Each returns the first violation as an error.

use tcp_mock_abstract::{Flag, Segment};

use crate::checksum;
use crate::error::{ExchangeError, Result, Step};

pub fn expect_checksum(step: Step, segment: &Segment) -> Result<()> {
    let computed = checksum::checksum(segment);
    if computed != segment.checksum {
        return Err(ExchangeError::ChecksumMismatch {
            step,
            carried: segment.checksum,
            computed,
        });
    }
    Ok(())
}

pub fn expect_flag(step: Step, segment: &Segment, flag: Flag) -> Result<()> {
    if !segment.check_flag(flag) {
        return Err(ExchangeError::FlagMismatch {
            step,
            flag,
            expected_set: true,
        });
    }
    Ok(())
}

pub fn expect_seq(step: Step, segment: &Segment, expected: u32) -> Result<()> {
    if segment.seq_num != expected {
        return Err(ExchangeError::SequenceMismatch {
            step,
            expected,
            actual: segment.seq_num,
        });
    }
    Ok(())
}

pub fn expect_ack(step: Step, segment: &Segment, expected: u32) -> Result<()> {
    if segment.ack_num != expected {
        return Err(ExchangeError::AcknowledgmentMismatch {
            step,
            expected,
            actual: segment.ack_num,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcp_mock_abstract::ControlWord;

    fn stamped() -> Segment {
        let mut seg = Segment {
            seq_num: 10,
            ack_num: 20,
            control: ControlWord::with_header_len(),
            ..Default::default()
        };
        seg.set_flag(Flag::Ack);
        checksum::stamp(&mut seg);
        seg
    }

    #[test]
    fn accepts_matching_segment() {
        let seg = stamped();
        expect_checksum(Step::ConnAck, &seg).unwrap();
        expect_flag(Step::ConnAck, &seg, Flag::Ack).unwrap();
        expect_seq(Step::ConnAck, &seg, 10).unwrap();
        expect_ack(Step::ConnAck, &seg, 20).unwrap();
    }

    #[test]
    fn reports_expected_and_observed() {
        let seg = stamped();
        match expect_ack(Step::ConnAck, &seg, 21) {
            Err(ExchangeError::AcknowledgmentMismatch { expected, actual, .. }) => {
                assert_eq!((expected, actual), (21, 20));
            }
            other => panic!("unexpected {other:?}"),
        }
        match expect_seq(Step::ConnAck, &seg, 11) {
            Err(ExchangeError::SequenceMismatch { expected, actual, .. }) => {
                assert_eq!((expected, actual), (11, 10));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            expect_flag(Step::ConnAck, &seg, Flag::Syn),
            Err(ExchangeError::FlagMismatch { flag: Flag::Syn, expected_set: true, .. })
        ));
    }

    #[test]
    fn tampered_segment_fails_checksum() {
        let mut seg = stamped();
        seg.ack_num += 1;
        assert!(matches!(
            expect_checksum(Step::ConnAck, &seg),
            Err(ExchangeError::ChecksumMismatch { .. })
        ));
    }
}
