/*
[INPUT]:  Formatted tracing output from the subscriber
[OUTPUT]: Bounded in-memory line buffer shown in the diagnostics pane
[POS]:    TUI tracing sink (keeps log output off the alternate screen)
[UPDATE]: When changing diagnostics capacity or line splitting
*/

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing_subscriber::fmt::MakeWriter;

pub(crate) const DIAGNOSTICS_CAPACITY: usize = 2000;

pub(crate) type DiagnosticsHandle = Arc<Mutex<DiagnosticLines>>;

#[derive(Debug, Default)]
pub(crate) struct DiagnosticLines {
    lines: VecDeque<String>,
    capacity: usize,
}

impl DiagnosticLines {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity,
        }
    }

    pub(crate) fn handle(capacity: usize) -> DiagnosticsHandle {
        Arc::new(Mutex::new(Self::new(capacity)))
    }

    pub(crate) fn push_line(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// The newest `limit` lines, oldest first.
    pub(crate) fn tail(&self, limit: usize) -> Vec<String> {
        let start = self.lines.len().saturating_sub(limit);
        self.lines.iter().skip(start).cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.lines.len()
    }
}

pub(crate) fn lock(handle: &DiagnosticsHandle) -> MutexGuard<'_, DiagnosticLines> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
pub(crate) struct DiagnosticsWriterFactory {
    lines: DiagnosticsHandle,
}

impl DiagnosticsWriterFactory {
    pub(crate) fn new(lines: DiagnosticsHandle) -> Self {
        Self { lines }
    }
}

/// Splits writes into lines; a trailing partial line is kept until flush or drop.
pub(crate) struct DiagnosticsWriter {
    lines: DiagnosticsHandle,
    partial: String,
}

impl DiagnosticsWriter {
    fn emit(&mut self, line: String) {
        let plain: String = line
            .chars()
            .map(|ch| if ch.is_control() { ' ' } else { ch })
            .collect();
        lock(&self.lines).push_line(plain);
    }
}

impl Write for DiagnosticsWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.partial.push_str(&String::from_utf8_lossy(buf));
        while let Some(pos) = self.partial.find('\n') {
            let line = self.partial[..pos].trim_end_matches('\r').to_string();
            self.partial.drain(..=pos);
            self.emit(line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.partial.is_empty() {
            let line = std::mem::take(&mut self.partial);
            self.emit(line);
        }
        Ok(())
    }
}

impl Drop for DiagnosticsWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for DiagnosticsWriterFactory {
    type Writer = DiagnosticsWriter;

    fn make_writer(&'a self) -> Self::Writer {
        DiagnosticsWriter {
            lines: self.lines.clone(),
            partial: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_splits_lines_and_keeps_capacity() {
        let handle = DiagnosticLines::handle(2);
        let factory = DiagnosticsWriterFactory::new(handle.clone());
        {
            let mut writer = factory.make_writer();
            writer.write_all(b"one\ntwo\r\nthr").expect("write");
            writer.write_all(b"ee\nfour").expect("write");
        }
        let lines = lock(&handle);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines.tail(10), vec!["three", "four"]);
    }

    #[test]
    fn escape_sequences_are_neutralized() {
        let handle = DiagnosticLines::handle(10);
        let mut writer = DiagnosticsWriterFactory::new(handle.clone()).make_writer();
        writer.write_all(b"\x1b[2mWARN\x1b[0m poll failed\n").expect("write");
        assert_eq!(lock(&handle).tail(1), vec![" [2mWARN [0m poll failed"]);
    }
}
