//! Three-step open exchange.
//!
//! ```text
//!  initiator                          responder
//!      | ---- SYN  seq=s ------------------> |
//!      | <--- SYN+ACK seq=t ack=s+1 -------- |
//!      | ---- ACK seq=s+1 ack=t+1 ---------> |
//! ```

use tcp_mock_abstract::Flag;
use tracing::debug;

use crate::error::{Result, Step};
use crate::exchange::{Endpoint, Exchange, Outcome, Role};
use crate::validate::{expect_ack, expect_checksum, expect_flag, expect_seq};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenInitiatorState {
    SendRequest,
    AwaitGrant { init_seq: u32 },
    SendAck { init_seq: u32, peer_seq: u32 },
    Done { init_seq: u32, peer_seq: u32 },
}

pub struct OpenInitiator<'e, 'a> {
    endpoint: &'e mut Endpoint<'a>,
    state: OpenInitiatorState,
}

impl<'e, 'a> OpenInitiator<'e, 'a> {
    pub fn new(endpoint: &'e mut Endpoint<'a>) -> Self {
        Self {
            endpoint,
            state: OpenInitiatorState::SendRequest,
        }
    }

    pub fn state(&self) -> OpenInitiatorState {
        self.state
    }

    /// Performs the current step and moves to the next state.
    pub fn step(&mut self) -> Result<OpenInitiatorState> {
        let next = match self.state {
            OpenInitiatorState::SendRequest => {
                let mut segment = self.endpoint.create_segment();
                let init_seq = segment.seq_num;
                segment.set_flag(Flag::Syn);
                self.endpoint.transmit(Step::ConnRequest, &mut segment)?;
                OpenInitiatorState::AwaitGrant { init_seq }
            }
            OpenInitiatorState::AwaitGrant { init_seq } => {
                let step = Step::ConnGranted;
                let segment = self.endpoint.receive(step)?;
                expect_ack(step, &segment, init_seq.wrapping_add(1))?;
                expect_flag(step, &segment, Flag::Syn)?;
                expect_flag(step, &segment, Flag::Ack)?;
                expect_checksum(step, &segment)?;
                self.endpoint.accept(step, &segment);
                OpenInitiatorState::SendAck {
                    init_seq,
                    peer_seq: segment.seq_num,
                }
            }
            OpenInitiatorState::SendAck { init_seq, peer_seq } => {
                let mut segment = self
                    .endpoint
                    .reply_segment(init_seq.wrapping_add(1), peer_seq.wrapping_add(1));
                segment.set_flag(Flag::Ack);
                self.endpoint.transmit(Step::ConnAck, &mut segment)?;
                OpenInitiatorState::Done { init_seq, peer_seq }
            }
            done @ OpenInitiatorState::Done { .. } => done,
        };
        debug!("open initiator: {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(next)
    }

    pub fn run(mut self) -> Result<Outcome> {
        loop {
            if let OpenInitiatorState::Done { init_seq, peer_seq } = self.step()? {
                return Ok(Outcome {
                    exchange: Exchange::Open,
                    role: Role::Initiator,
                    local_seq: init_seq,
                    peer_seq,
                });
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenResponderState {
    AwaitRequest,
    SendGrant { client_seq: u32 },
    AwaitAck { client_seq: u32, server_seq: u32 },
    Done { client_seq: u32, server_seq: u32 },
}

pub struct OpenResponder<'e, 'a> {
    endpoint: &'e mut Endpoint<'a>,
    state: OpenResponderState,
}

impl<'e, 'a> OpenResponder<'e, 'a> {
    pub fn new(endpoint: &'e mut Endpoint<'a>) -> Self {
        Self {
            endpoint,
            state: OpenResponderState::AwaitRequest,
        }
    }

    pub fn state(&self) -> OpenResponderState {
        self.state
    }

    pub fn step(&mut self) -> Result<OpenResponderState> {
        let next = match self.state {
            OpenResponderState::AwaitRequest => {
                let step = Step::ConnRequest;
                let segment = self.endpoint.receive(step)?;
                expect_checksum(step, &segment)?;
                expect_flag(step, &segment, Flag::Syn)?;
                self.endpoint.accept(step, &segment);
                OpenResponderState::SendGrant {
                    client_seq: segment.seq_num,
                }
            }
            OpenResponderState::SendGrant { client_seq } => {
                let mut segment = self.endpoint.create_segment();
                let server_seq = segment.seq_num;
                segment.ack_num = client_seq.wrapping_add(1);
                segment.set_flag(Flag::Syn);
                segment.set_flag(Flag::Ack);
                self.endpoint.transmit(Step::ConnGranted, &mut segment)?;
                OpenResponderState::AwaitAck {
                    client_seq,
                    server_seq,
                }
            }
            OpenResponderState::AwaitAck {
                client_seq,
                server_seq,
            } => {
                let step = Step::ConnAck;
                let segment = self.endpoint.receive(step)?;
                expect_checksum(step, &segment)?;
                expect_seq(step, &segment, client_seq.wrapping_add(1))?;
                expect_ack(step, &segment, server_seq.wrapping_add(1))?;
                expect_flag(step, &segment, Flag::Ack)?;
                self.endpoint.accept(step, &segment);
                OpenResponderState::Done {
                    client_seq,
                    server_seq,
                }
            }
            done @ OpenResponderState::Done { .. } => done,
        };
        debug!("open responder: {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(next)
    }

    pub fn run(mut self) -> Result<Outcome> {
        loop {
            if let OpenResponderState::Done {
                client_seq,
                server_seq,
            } = self.step()?
            {
                return Ok(Outcome {
                    exchange: Exchange::Open,
                    role: Role::Responder,
                    local_seq: server_seq,
                    peer_seq: client_seq,
                });
            }
        }
    }
}
