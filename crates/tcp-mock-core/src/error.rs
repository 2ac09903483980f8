use std::fmt;
use std::io;

use tcp_mock_abstract::Flag;
use thiserror::Error;

/// One message of the open or close exchange, named from the initiator's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ConnRequest,
    ConnGranted,
    ConnAck,
    CloseRequest,
    CloseAck,
    PeerCloseRequest,
    FinalCloseAck,
}

impl Step {
    /// Label used when the segment is shown to a human.
    pub fn title(self) -> &'static str {
        match self {
            Step::ConnRequest => "connection request",
            Step::ConnGranted => "connection granted",
            Step::ConnAck => "connection acknowledgment",
            Step::CloseRequest | Step::PeerCloseRequest => "close request",
            Step::CloseAck | Step::FinalCloseAck => "close acknowledgment",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::ConnRequest => "conn request",
            Step::ConnGranted => "conn granted",
            Step::ConnAck => "conn ack",
            Step::CloseRequest => "close request",
            Step::CloseAck => "close ack",
            Step::PeerCloseRequest => "peer close request",
            Step::FinalCloseAck => "final close ack",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    Send,
    Receive,
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoOp::Send => f.write_str("sent"),
            IoOp::Receive => f.write_str("received"),
        }
    }
}

fn disconnect_note(op: &IoOp, actual: &usize) -> &'static str {
    if *op == IoOp::Receive && *actual == 0 {
        " (peer disconnected)"
    } else {
        ""
    }
}

fn flag_state(expected_set: &bool) -> &'static str {
    if *expected_set { "not set" } else { "unexpectedly set" }
}

/// Why an exchange stopped. Every variant is terminal.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("{step}: {op} {actual}/{expected} bytes{}", disconnect_note(.op, .actual))]
    ShortIo {
        step: Step,
        op: IoOp,
        expected: usize,
        actual: usize,
    },

    #[error("{step}: channel error")]
    Io {
        step: Step,
        op: IoOp,
        #[source]
        source: io::Error,
    },

    #[error("{step}: invalid checksum (carried 0x{carried:04X}, computed 0x{computed:04X})")]
    ChecksumMismatch {
        step: Step,
        carried: u16,
        computed: u16,
    },

    #[error("{step}: sequence {actual} != expected {expected}")]
    SequenceMismatch {
        step: Step,
        expected: u32,
        actual: u32,
    },

    #[error("{step}: ack {actual} != expected {expected}")]
    AcknowledgmentMismatch {
        step: Step,
        expected: u32,
        actual: u32,
    },

    #[error("{step}: {flag} {}", flag_state(.expected_set))]
    FlagMismatch {
        step: Step,
        flag: Flag,
        expected_set: bool,
    },
}

impl ExchangeError {
    pub fn step(&self) -> Step {
        match self {
            ExchangeError::ShortIo { step, .. }
            | ExchangeError::Io { step, .. }
            | ExchangeError::ChecksumMismatch { step, .. }
            | ExchangeError::SequenceMismatch { step, .. }
            | ExchangeError::AcknowledgmentMismatch { step, .. }
            | ExchangeError::FlagMismatch { step, .. } => *step,
        }
    }

    /// True when the peer closed the stream before a segment arrived.
    pub fn is_peer_disconnect(&self) -> bool {
        matches!(
            self,
            ExchangeError::ShortIo {
                op: IoOp::Receive,
                actual: 0,
                ..
            }
        )
    }
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
