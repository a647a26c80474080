//! History Logger
//!
//! Append-only JSONL output of turn history entries.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use turf_events::TurnLogEntry;

/// Writes history entries to a JSONL file, one entry per line
pub struct HistoryLogger {
    writer: Option<BufWriter<File>>,
    entry_count: u64,
}

impl HistoryLogger {
    /// Create a logger writing to `path`, truncating any earlier run
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            entry_count: 0,
        })
    }

    /// Create a logger that discards entries (for testing)
    pub fn null() -> Self {
        Self {
            writer: None,
            entry_count: 0,
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn log(&mut self, entry: &TurnLogEntry) -> std::io::Result<()> {
        self.entry_count += 1;
        if let Some(ref mut writer) = self.writer {
            writeln!(writer, "{}", entry.to_jsonl()?)?;
        }
        Ok(())
    }

    pub fn log_batch(&mut self, entries: &[TurnLogEntry]) -> std::io::Result<()> {
        for entry in entries {
            self.log(entry)?;
        }
        Ok(())
    }

    /// Flush the buffer to disk
    pub fn flush(&mut self) -> std::io::Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for HistoryLogger {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            eprintln!("Warning: Failed to flush history logger: {}", e);
        }
    }
}

/// Entries written during an open phase, held until the phase commits
#[derive(Debug, Default)]
pub struct PendingHistory {
    entries: Vec<TurnLogEntry>,
}

impl PendingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TurnLogEntry) {
        self.entries.push(entry);
    }

    pub fn drain(&mut self) -> Vec<TurnLogEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Forget everything; the phase was rolled back
    pub fn discard(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
