pub mod config;
pub mod interface;
pub mod segment;

pub use interface::{Channel, Direction, NoopObserver, SegmentObserver, SequenceSource};
pub use segment::{ControlWord, DecodeError, Flag, Segment};
// Re-export the raw control word masks so callers can reach them as `tcp_mock_abstract::flags`
pub use segment::flags;
pub use segment::{CHECKSUM_OFFSET, HEADER_WORDS, SEGMENT_LEN, SEQUENCE_LIMIT};

pub use config::{MockConfig, MockConfigOverride};
