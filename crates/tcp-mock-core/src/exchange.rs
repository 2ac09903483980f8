use std::fmt;

use tcp_mock_abstract::{
    Channel, ControlWord, Direction, SEGMENT_LEN, Segment, SegmentObserver, SequenceSource,
};
use tracing::{info, warn};

use crate::checksum;
use crate::error::{ExchangeError, IoOp, Result, Step};
use crate::{handshake, teardown};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Sends first; the client.
    Initiator,
    /// Receives first; the server.
    Responder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => f.write_str("initiator"),
            Role::Responder => f.write_str("responder"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    Open,
    Close,
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exchange::Open => f.write_str("open"),
            Exchange::Close => f.write_str("close"),
        }
    }
}

/// What a completed exchange agreed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub exchange: Exchange,
    pub role: Role,
    /// Initial sequence number this end generated.
    pub local_seq: u32,
    /// Sequence number observed from the peer's first segment.
    pub peer_seq: u32,
}

/// Everything one end needs to run an exchange: the stream, where segment dumps
/// go, where initial sequence numbers come from, and the ports to stamp.
pub struct Endpoint<'a> {
    channel: &'a mut dyn Channel,
    observer: &'a mut dyn SegmentObserver,
    sequence: &'a mut dyn SequenceSource,
    local_port: u16,
    peer_port: u16,
}

impl<'a> Endpoint<'a> {
    pub fn new(
        channel: &'a mut dyn Channel,
        observer: &'a mut dyn SegmentObserver,
        sequence: &'a mut dyn SequenceSource,
        local_port: u16,
        peer_port: u16,
    ) -> Self {
        Self {
            channel,
            observer,
            sequence,
            local_port,
            peer_port,
        }
    }

    /// Fresh segment carrying a newly generated initial sequence number.
    pub(crate) fn create_segment(&mut self) -> Segment {
        Segment::create(self.local_port, self.peer_port, &mut *self.sequence)
    }

    /// Segment with explicit sequence and acknowledgment numbers.
    pub(crate) fn reply_segment(&self, seq_num: u32, ack_num: u32) -> Segment {
        Segment {
            src_port: self.local_port,
            dst_port: self.peer_port,
            seq_num,
            ack_num,
            control: ControlWord::with_header_len(),
            ..Default::default()
        }
    }

    /// Stamps the checksum and writes the whole segment.
    pub(crate) fn transmit(&mut self, step: Step, segment: &mut Segment) -> Result<()> {
        checksum::stamp(segment);
        let bytes = segment.encode();
        let sent = self
            .channel
            .send(&bytes)
            .map_err(|source| ExchangeError::Io {
                step,
                op: IoOp::Send,
                source,
            })?;
        if sent != SEGMENT_LEN {
            return Err(ExchangeError::ShortIo {
                step,
                op: IoOp::Send,
                expected: SEGMENT_LEN,
                actual: sent,
            });
        }

        let title = format!("{} {}", Direction::Outgoing, step.title());
        self.observer.on_segment(Direction::Outgoing, &title, segment);
        Ok(())
    }

    /// Reads exactly one segment. The caller validates it, then calls [`Self::accept`].
    pub(crate) fn receive(&mut self, step: Step) -> Result<Segment> {
        let mut buf = [0u8; SEGMENT_LEN];
        let received = self
            .channel
            .receive(&mut buf)
            .map_err(|source| ExchangeError::Io {
                step,
                op: IoOp::Receive,
                source,
            })?;
        match Segment::decode(&buf[..received]) {
            Ok(segment) => Ok(segment),
            Err(_) => Err(ExchangeError::ShortIo {
                step,
                op: IoOp::Receive,
                expected: SEGMENT_LEN,
                actual: received,
            }),
        }
    }

    /// Reports a received segment that passed all of its checks.
    pub(crate) fn accept(&mut self, step: Step, segment: &Segment) {
        let title = format!("{} {}", Direction::Incoming, step.title());
        self.observer.on_segment(Direction::Incoming, &title, segment);
    }
}

/// Runs the three-step open exchange in the given role.
pub fn perform_open(role: Role, endpoint: &mut Endpoint<'_>) -> Result<Outcome> {
    info!("simulating opening a TCP connection as {}", role);
    let result = match role {
        Role::Initiator => handshake::OpenInitiator::new(endpoint).run(),
        Role::Responder => handshake::OpenResponder::new(endpoint).run(),
    };
    finish(Exchange::Open, role, result)
}

/// Runs the four-step close exchange in the given role.
pub fn perform_close(role: Role, endpoint: &mut Endpoint<'_>) -> Result<Outcome> {
    info!("simulating closing a TCP connection as {}", role);
    let result = match role {
        Role::Initiator => teardown::CloseInitiator::new(endpoint).run(),
        Role::Responder => teardown::CloseResponder::new(endpoint).run(),
    };
    finish(Exchange::Close, role, result)
}

pub fn perform(exchange: Exchange, role: Role, endpoint: &mut Endpoint<'_>) -> Result<Outcome> {
    match exchange {
        Exchange::Open => perform_open(role, endpoint),
        Exchange::Close => perform_close(role, endpoint),
    }
}

fn finish(exchange: Exchange, role: Role, result: Result<Outcome>) -> Result<Outcome> {
    match &result {
        Ok(outcome) => info!(
            "{} exchange complete as {} (local seq {}, peer seq {})",
            exchange, role, outcome.local_seq, outcome.peer_seq
        ),
        Err(e) => warn!("{} exchange aborted as {}: {}", exchange, role, e),
    }
    result
}
