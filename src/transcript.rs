//! # Transcript and Line Sinks
//!
//! Completed lines leave the decoder through a [`LineSink`]. Three sinks are
//! provided:
//!
//! - [`Transcript`]: append-only text, the decoded printout
//! - `Vec<String>`: one entry per completed line
//! - `tokio::sync::mpsc::UnboundedSender<String>`: FIFO hand-off to a
//!   consumer on another thread or task
//!
//! Sinks only ever see whole lines. Partial lines are never exposed.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::error::Hp41PrintError;

/// Receiver of completed lines, in completion order.
pub trait LineSink {
    fn push_line(&mut self, line: String);
}

impl LineSink for Vec<String> {
    fn push_line(&mut self, line: String) {
        self.push(line);
    }
}

impl LineSink for UnboundedSender<String> {
    fn push_line(&mut self, line: String) {
        // A closed receiver means the consumer is gone; the line has nowhere to go.
        if self.send(line).is_err() {
            debug!("line receiver dropped, discarding line");
        }
    }
}

/// Append-only decoded printout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    text: String,
    line_count: usize,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// The whole transcript as text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of completed lines appended so far.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Iterate over the transcript's text lines.
    pub fn lines(&self) -> std::str::Lines<'_> {
        self.text.lines()
    }

    /// Write the transcript to `path`, replacing any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Hp41PrintError> {
        let mut file = File::create(path.as_ref())?;
        file.write_all(self.text.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

impl LineSink for Transcript {
    fn push_line(&mut self, line: String) {
        self.text.push_str(&line);
        self.line_count += 1;
    }
}

/// One completed line as emitted by `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct LineRecord<'a> {
    /// 1-based position in the session
    pub seq: usize,
    /// RFC 3339 local time the line was received
    pub time: String,
    /// Line text without its trailing newline
    pub text: &'a str,
}

impl<'a> LineRecord<'a> {
    pub fn new(seq: usize, line: &'a str, received: DateTime<Local>) -> Self {
        Self {
            seq,
            time: received.to_rfc3339(),
            text: line.strip_suffix('\n').unwrap_or(line),
        }
    }

    /// Serialize as a single JSON line (no trailing newline).
    pub fn to_json(&self) -> Result<String, Hp41PrintError> {
        Ok(serde_json::to_string(self)?)
    }
}
