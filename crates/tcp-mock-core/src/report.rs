use std::fmt;

use serde::Serialize;
use tcp_mock_abstract::{Direction, Flag, Segment, SegmentObserver};

/// Human-readable dump of one segment under a title.
pub struct SegmentReport<'a> {
    pub title: &'a str,
    pub segment: &'a Segment,
}

impl<'a> SegmentReport<'a> {
    pub fn new(title: &'a str, segment: &'a Segment) -> Self {
        Self { title, segment }
    }
}

impl fmt::Display for SegmentReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seg = self.segment;

        // URG first, FIN last
        let bits: String = Flag::ALL
            .iter()
            .rev()
            .map(|flag| if seg.check_flag(*flag) { '1' } else { '0' })
            .collect();
        let names: String = seg
            .control
            .set_flags()
            .map(|flag| format!(" {flag}"))
            .collect();

        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", "-".repeat(self.title.chars().count()))?;
        writeln!(f, "srcport:         {}", seg.src_port)?;
        writeln!(f, "destport:        {}", seg.dst_port)?;
        writeln!(f, "sequence:        {}", seg.seq_num)?;
        writeln!(f, "acknowledgment:  {}", seg.ack_num)?;
        writeln!(f, "offset:          {}", seg.header_len())?;
        writeln!(f, "reserved:        0x{:06X}", seg.reserved())?;
        writeln!(f, "flags:           0b{bits}{names}")?;
        writeln!(f, "receive:         0x{:04X}", seg.window)?;
        writeln!(f, "checksum:        0x{:04X}", seg.checksum)?;
        writeln!(f, "urgent:          0x{:04X}", seg.urgent_ptr)?;
        writeln!(f, "options:         0x{:08X}", seg.options)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceEntry {
    pub direction: Direction,
    pub title: String,
    pub segment: Segment,
    /// Encoded bytes as lowercase hex.
    pub wire: String,
}

/// Records every segment of an exchange; serializable for export.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExchangeTrace {
    pub entries: Vec<TraceEntry>,
}

impl ExchangeTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Segments that went out, in order.
    pub fn sent(&self) -> impl Iterator<Item = &Segment> {
        self.entries
            .iter()
            .filter(|e| e.direction == Direction::Outgoing)
            .map(|e| &e.segment)
    }

    /// Segments that were received and accepted, in order.
    pub fn received(&self) -> impl Iterator<Item = &Segment> {
        self.entries
            .iter()
            .filter(|e| e.direction == Direction::Incoming)
            .map(|e| &e.segment)
    }
}

impl SegmentObserver for ExchangeTrace {
    fn on_segment(&mut self, direction: Direction, title: &str, segment: &Segment) {
        let wire = segment
            .encode()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        self.entries.push(TraceEntry {
            direction,
            title: title.to_string(),
            segment: *segment,
            wire,
        });
    }
}
