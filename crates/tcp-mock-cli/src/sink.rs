use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tcp_mock_abstract::{Direction, Segment, SegmentObserver};
use tcp_mock_core::SegmentReport;
use tracing::warn;

/// Writes every segment report to the console and to a log file.
pub struct DualSink<C: Write, F: Write> {
    console: C,
    file: F,
    failed: Option<io::Error>,
}

impl DualSink<Stdout, BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;
        println!("writing output to {} as well as console", path.display());
        Ok(Self::new(io::stdout(), BufWriter::new(file)))
    }
}

impl<C: Write, F: Write> DualSink<C, F> {
    pub fn new(console: C, file: F) -> Self {
        Self {
            console,
            file,
            failed: None,
        }
    }

    /// Flushes both sinks and surfaces the first write error, if any.
    pub fn finish(mut self) -> io::Result<(C, F)> {
        if let Some(e) = self.failed.take() {
            return Err(e);
        }
        self.console.flush()?;
        self.file.flush()?;
        Ok((self.console, self.file))
    }

    fn write_both(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.file, "{text}")?;
        writeln!(self.console, "{text}")
    }
}

impl<C: Write, F: Write> SegmentObserver for DualSink<C, F> {
    fn on_segment(&mut self, _direction: Direction, title: &str, segment: &Segment) {
        let text = SegmentReport::new(title, segment).to_string();
        if let Err(e) = self.write_both(&text) {
            warn!("failed to log segment \"{}\": {}", title, e);
            self.failed.get_or_insert(e);
        }
    }
}
