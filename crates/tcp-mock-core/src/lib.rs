//! Mock TCP connection establishment and teardown over an existing byte stream.
//!
//! - [`checksum`]  — stamp and verify segment checksums
//! - [`handshake`] — three-step open, both roles
//! - [`teardown`]  — four-step close, both roles
//! - [`exchange`]  — [`Endpoint`] plus the `perform_*` entry points
//! - [`report`]    — human-readable dumps and JSON-friendly traces
//! - [`memory`]    — in-process duplex stream

pub mod checksum;
pub mod error;
pub mod exchange;
pub mod handshake;
pub mod memory;
pub mod report;
pub mod sequence;
pub mod teardown;
pub mod validate;

pub use error::{ExchangeError, IoOp, Step};
pub use exchange::{Endpoint, Exchange, Outcome, Role, perform, perform_close, perform_open};
pub use memory::{MemoryChannel, duplex};
pub use report::{ExchangeTrace, SegmentReport, TraceEntry};
pub use sequence::{FixedSequence, RandomSequence};

pub use tcp_mock_abstract::{
    Channel, ControlWord, Direction, Flag, NoopObserver, SEGMENT_LEN, Segment, SegmentObserver,
    SequenceSource,
};
