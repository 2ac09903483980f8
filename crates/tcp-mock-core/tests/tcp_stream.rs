//! Both exchanges over a real loopback socket.

use std::net::{TcpListener, TcpStream};
use std::thread;

use tcp_mock_core::{
    Endpoint, Exchange, ExchangeTrace, FixedSequence, NoopObserver, Role, perform,
};

fn run_over_loopback(exchange: Exchange, client_seq: u32, server_seq: u32) -> ExchangeTrace {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut observer = NoopObserver;
        let mut sequence = FixedSequence::constant(server_seq);
        let mut endpoint = Endpoint::new(&mut stream, &mut observer, &mut sequence, 27015, 27015);
        perform(exchange, Role::Responder, &mut endpoint)
    });

    let mut stream = TcpStream::connect(addr).expect("connect");
    let mut trace = ExchangeTrace::new();
    let mut sequence = FixedSequence::constant(client_seq);
    let outcome = {
        let mut endpoint = Endpoint::new(&mut stream, &mut trace, &mut sequence, 27015, 27015);
        perform(exchange, Role::Initiator, &mut endpoint).expect("client exchange")
    };
    assert_eq!(outcome.peer_seq, server_seq);

    let server_outcome = server.join().unwrap().expect("server exchange");
    assert_eq!(server_outcome.peer_seq, client_seq);
    trace
}

#[test]
fn open_over_tcp() {
    let trace = run_over_loopback(Exchange::Open, 1000, 5000);
    let last = trace.sent().last().copied().unwrap();
    assert_eq!((last.seq_num, last.ack_num), (1001, 5001));
}

#[test]
fn close_over_tcp() {
    let trace = run_over_loopback(Exchange::Close, 2000, 9000);
    assert_eq!(trace.received().count(), 2);
    let last = trace.sent().last().copied().unwrap();
    assert_eq!((last.seq_num, last.ack_num), (2001, 9001));
}

#[test]
fn trace_serializes_to_json() {
    let trace = run_over_loopback(Exchange::Open, 10, 20);
    let json = serde_json::to_value(&trace).unwrap();
    let entries = json["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["direction"], "outgoing");
    assert_eq!(entries[0]["title"], "outgoing connection request");
    assert_eq!(entries[0]["segment"]["seq_num"], 10);
    assert_eq!(entries[1]["segment"]["ack_num"], 11);
    assert_eq!(entries[0]["wire"].as_str().unwrap().len(), 48);
}
