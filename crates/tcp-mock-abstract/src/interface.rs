use std::fmt;
use std::io::{self, ErrorKind, Read, Write};

use serde::Serialize;

use crate::segment::Segment;

/// An already established, reliable, ordered byte stream between the two roles.
/// Both calls block.
pub trait Channel {
    /// Write `bytes` to the peer.
    /// Returns how many bytes actually went out; fewer than `bytes.len()` means the
    /// stream stopped accepting data.
    fn send(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Fill `buf` from the peer.
    /// Returns how many bytes arrived before the stream ended; `0` means the peer
    /// closed its side before sending anything.
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<T: Read + Write> Channel for T {
    fn send(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < bytes.len() {
            match self.write(&bytes[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.flush()?;
        Ok(written)
    }

    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outgoing,
    Incoming,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outgoing => f.write_str("outgoing"),
            Direction::Incoming => f.write_str("incoming"),
        }
    }
}

/// Receives every segment an exchange handles, for display or recording.
pub trait SegmentObserver {
    /// Called after a segment was fully sent, or after a received segment passed
    /// all of its checks.
    fn on_segment(&mut self, direction: Direction, title: &str, segment: &Segment);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SegmentObserver for NoopObserver {
    fn on_segment(&mut self, _direction: Direction, _title: &str, _segment: &Segment) {}
}

/// Forwards each segment to both observers, left first.
impl<A: SegmentObserver, B: SegmentObserver> SegmentObserver for (A, B) {
    fn on_segment(&mut self, direction: Direction, title: &str, segment: &Segment) {
        self.0.on_segment(direction, title, segment);
        self.1.on_segment(direction, title, segment);
    }
}

/// Supplies initial sequence numbers for newly created segments.
pub trait SequenceSource {
    /// Must stay below [`crate::SEQUENCE_LIMIT`].
    fn next_sequence(&mut self) -> u32;
}
