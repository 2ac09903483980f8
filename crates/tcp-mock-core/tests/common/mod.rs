#![allow(dead_code)]

use std::thread::{self, JoinHandle};

use tcp_mock_core::checksum;
use tcp_mock_core::{
    Channel, ControlWord, Endpoint, Exchange, ExchangeError, ExchangeTrace, FixedSequence, Flag,
    MemoryChannel, Outcome, Role, SEGMENT_LEN, Segment, perform,
};

pub const CLIENT_PORT: u16 = 40000;
pub const SERVER_PORT: u16 = 27015;

pub type RoleResult = (Result<Outcome, ExchangeError>, ExchangeTrace);

/// Runs one role on its own thread over `channel`, with every generated
/// sequence number fixed to `seq`. The channel is dropped when the role ends.
pub fn spawn_role(
    exchange: Exchange,
    role: Role,
    channel: MemoryChannel,
    seq: u32,
) -> JoinHandle<RoleResult> {
    thread::spawn(move || run_role(exchange, role, channel, seq))
}

pub fn run_role(exchange: Exchange, role: Role, mut channel: MemoryChannel, seq: u32) -> RoleResult {
    let (local, peer) = match role {
        Role::Initiator => (CLIENT_PORT, SERVER_PORT),
        Role::Responder => (SERVER_PORT, CLIENT_PORT),
    };
    let mut trace = ExchangeTrace::new();
    let mut sequence = FixedSequence::constant(seq);
    let result = {
        let mut endpoint = Endpoint::new(&mut channel, &mut trace, &mut sequence, local, peer);
        perform(exchange, role, &mut endpoint)
    };
    (result, trace)
}

/// A stamped segment with the given numbers and flags, as a hand-driven peer would send.
pub fn peer_segment(seq: u32, ack: u32, flags: &[Flag]) -> Segment {
    let mut seg = Segment {
        src_port: SERVER_PORT,
        dst_port: CLIENT_PORT,
        seq_num: seq,
        ack_num: ack,
        control: ControlWord::with_header_len(),
        ..Default::default()
    };
    for flag in flags {
        seg.set_flag(*flag);
    }
    checksum::stamp(&mut seg);
    seg
}

pub fn send_segment(channel: &mut MemoryChannel, segment: &Segment) {
    let sent = channel.send(&segment.encode()).expect("send to role");
    assert_eq!(sent, SEGMENT_LEN);
}

/// Next segment from the role, or `None` once it has hung up.
pub fn read_segment(channel: &mut MemoryChannel) -> Option<Segment> {
    let mut buf = [0u8; SEGMENT_LEN];
    let n = channel.receive(&mut buf).expect("receive from role");
    if n == 0 {
        return None;
    }
    Some(Segment::decode(&buf[..n]).expect("role sent a partial segment"))
}

pub fn flags_of(segment: &Segment) -> Vec<Flag> {
    segment.control.set_flags().collect()
}
