//! Four-step close exchange.
//!
//! ```text
//!  initiator                          responder
//!      | ---- FIN seq=s ack=0 -------------> |
//!      | <--- ACK seq=t ack=s+1 ------------ |
//!      | <--- FIN seq=t ack=s+1 ------------ |
//!      | ---- ACK seq=s+1 ack=t+1 ---------> |
//! ```
//!
//! The responder's FIN is its ACK segment with the ACK bit swapped for FIN.

use tcp_mock_abstract::{Flag, Segment};
use tracing::debug;

use crate::error::{Result, Step};
use crate::exchange::{Endpoint, Exchange, Outcome, Role};
use crate::validate::{expect_ack, expect_checksum, expect_flag, expect_seq};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseInitiatorState {
    SendFin,
    AwaitAck { init_seq: u32 },
    AwaitFin { init_seq: u32, peer_seq: u32 },
    SendAck { init_seq: u32, peer_seq: u32 },
    Done { init_seq: u32, peer_seq: u32 },
}

pub struct CloseInitiator<'e, 'a> {
    endpoint: &'e mut Endpoint<'a>,
    state: CloseInitiatorState,
}

impl<'e, 'a> CloseInitiator<'e, 'a> {
    pub fn new(endpoint: &'e mut Endpoint<'a>) -> Self {
        Self {
            endpoint,
            state: CloseInitiatorState::SendFin,
        }
    }

    pub fn state(&self) -> CloseInitiatorState {
        self.state
    }

    pub fn step(&mut self) -> Result<CloseInitiatorState> {
        let next = match self.state {
            CloseInitiatorState::SendFin => {
                let mut segment = self.endpoint.create_segment();
                let init_seq = segment.seq_num;
                segment.set_flag(Flag::Fin);
                self.endpoint.transmit(Step::CloseRequest, &mut segment)?;
                CloseInitiatorState::AwaitAck { init_seq }
            }
            CloseInitiatorState::AwaitAck { init_seq } => {
                let step = Step::CloseAck;
                let segment = self.endpoint.receive(step)?;
                expect_checksum(step, &segment)?;
                expect_ack(step, &segment, init_seq.wrapping_add(1))?;
                expect_flag(step, &segment, Flag::Ack)?;
                self.endpoint.accept(step, &segment);
                CloseInitiatorState::AwaitFin {
                    init_seq,
                    peer_seq: segment.seq_num,
                }
            }
            CloseInitiatorState::AwaitFin { init_seq, peer_seq } => {
                let step = Step::PeerCloseRequest;
                let segment = self.endpoint.receive(step)?;
                expect_checksum(step, &segment)?;
                expect_ack(step, &segment, init_seq.wrapping_add(1))?;
                expect_flag(step, &segment, Flag::Fin)?;
                self.endpoint.accept(step, &segment);
                CloseInitiatorState::SendAck { init_seq, peer_seq }
            }
            CloseInitiatorState::SendAck { init_seq, peer_seq } => {
                let mut segment = self
                    .endpoint
                    .reply_segment(init_seq.wrapping_add(1), peer_seq.wrapping_add(1));
                segment.set_flag(Flag::Ack);
                self.endpoint.transmit(Step::FinalCloseAck, &mut segment)?;
                CloseInitiatorState::Done { init_seq, peer_seq }
            }
            done @ CloseInitiatorState::Done { .. } => done,
        };
        debug!("close initiator: {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(next)
    }

    pub fn run(mut self) -> Result<Outcome> {
        loop {
            if let CloseInitiatorState::Done { init_seq, peer_seq } = self.step()? {
                return Ok(Outcome {
                    exchange: Exchange::Close,
                    role: Role::Initiator,
                    local_seq: init_seq,
                    peer_seq,
                });
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseResponderState {
    AwaitFin,
    SendAck { client_seq: u32 },
    /// `template` is the ACK just sent, reused for the FIN.
    SendFin { client_seq: u32, template: Segment },
    AwaitAck { client_seq: u32, server_seq: u32 },
    Done { client_seq: u32, server_seq: u32 },
}

pub struct CloseResponder<'e, 'a> {
    endpoint: &'e mut Endpoint<'a>,
    state: CloseResponderState,
}

impl<'e, 'a> CloseResponder<'e, 'a> {
    pub fn new(endpoint: &'e mut Endpoint<'a>) -> Self {
        Self {
            endpoint,
            state: CloseResponderState::AwaitFin,
        }
    }

    pub fn state(&self) -> CloseResponderState {
        self.state
    }

    pub fn step(&mut self) -> Result<CloseResponderState> {
        let next = match self.state {
            CloseResponderState::AwaitFin => {
                let step = Step::CloseRequest;
                let segment = self.endpoint.receive(step)?;
                expect_checksum(step, &segment)?;
                expect_ack(step, &segment, 0)?;
                expect_flag(step, &segment, Flag::Fin)?;
                self.endpoint.accept(step, &segment);
                CloseResponderState::SendAck {
                    client_seq: segment.seq_num,
                }
            }
            CloseResponderState::SendAck { client_seq } => {
                let mut segment = self.endpoint.create_segment();
                segment.ack_num = client_seq.wrapping_add(1);
                segment.set_flag(Flag::Ack);
                self.endpoint.transmit(Step::CloseAck, &mut segment)?;
                CloseResponderState::SendFin {
                    client_seq,
                    template: segment,
                }
            }
            CloseResponderState::SendFin {
                client_seq,
                template,
            } => {
                let mut segment = template;
                segment.clear_flag(Flag::Ack);
                segment.set_flag(Flag::Fin);
                self.endpoint.transmit(Step::PeerCloseRequest, &mut segment)?;
                CloseResponderState::AwaitAck {
                    client_seq,
                    server_seq: segment.seq_num,
                }
            }
            CloseResponderState::AwaitAck {
                client_seq,
                server_seq,
            } => {
                let step = Step::FinalCloseAck;
                let segment = self.endpoint.receive(step)?;
                expect_checksum(step, &segment)?;
                expect_seq(step, &segment, client_seq.wrapping_add(1))?;
                expect_ack(step, &segment, server_seq.wrapping_add(1))?;
                expect_flag(step, &segment, Flag::Ack)?;
                self.endpoint.accept(step, &segment);
                CloseResponderState::Done {
                    client_seq,
                    server_seq,
                }
            }
            done @ CloseResponderState::Done { .. } => done,
        };
        debug!("close responder: {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(next)
    }

    pub fn run(mut self) -> Result<Outcome> {
        loop {
            if let CloseResponderState::Done {
                client_seq,
                server_seq,
            } = self.step()?
            {
                return Ok(Outcome {
                    exchange: Exchange::Close,
                    role: Role::Responder,
                    local_seq: server_seq,
                    peer_seq: client_seq,
                });
            }
        }
    }
}
