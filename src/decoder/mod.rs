//! # Line Decoder
//!
//! Turns the raw print stream into completed transcript lines.
//!
//! ## Framing
//!
//! The decoder consumes one byte at a time and accumulates a line buffer.
//! A line is complete when the stream sends an end-of-line sentinel (224),
//! a DTR separator (162, DTR interface only) or, on the DTR interface, a
//! right-justify sentinel (232). Completion sentinels arriving on an empty
//! buffer are dropped so the transcript never gets spurious blank lines.
//!
//! The buffer is cleared when the *next* byte starts processing, not when
//! the line completes.
//!
//! ## Chunking
//!
//! Transports deliver bytes in whatever groups the hardware produces (one
//! byte per read on some adapters, hundreds on others). [`LineDecoder::process_chunk`]
//! walks every chunk byte by byte, so the transcript is identical for any
//! split of the same stream.
//!
//! ## Example
//!
//! ```
//! use hp41print::decoder::{LineDecoder, Mode};
//! use hp41print::transcript::Transcript;
//!
//! let mut decoder = LineDecoder::new(Mode::Dtr);
//! let mut transcript = Transcript::new();
//!
//! decoder.process_chunk(&[80, 82, 80, 32, 84, 69, 83, 84, 224], &mut transcript);
//! decoder.process_chunk(&[65, 224], &mut transcript);
//!
//! assert_eq!(transcript.as_str(), "PRP TEST\n 01 A\n");
//! ```

pub mod listing;
mod mode;

pub use listing::{ListingAnnotator, ListingState};
pub use mode::Mode;

use tracing::{debug, trace, warn};

use crate::protocol::charset;
use crate::protocol::codes::{self, ByteCode, LINE_WIDTH};
use crate::transcript::LineSink;

/// Per-connection decoding state machine.
#[derive(Debug, Clone)]
pub struct LineDecoder {
    mode: Mode,
    line: String,
    line_end: bool,
    listing: ListingAnnotator,
}

impl LineDecoder {
    /// Create a decoder for a freshly established connection.
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            line: String::new(),
            line_end: false,
            listing: ListingAnnotator::new(),
        }
    }

    /// Interface mode this decoder was created with.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The line being assembled.
    ///
    /// Empty right after a line completes; completed lines only ever leave
    /// through the sink.
    pub fn pending(&self) -> &str {
        &self.line
    }

    /// Current listing state (always idle on the legacy interface).
    pub fn listing(&self) -> ListingState {
        self.listing.state()
    }

    /// Process a delivered chunk, byte by byte.
    ///
    /// Returns the number of lines completed.
    pub fn process_chunk<S: LineSink + ?Sized>(&mut self, chunk: &[u8], sink: &mut S) -> usize {
        let mut completed = 0;
        for &b in chunk {
            if self.process_byte(b, sink) {
                completed += 1;
            }
        }
        completed
    }

    /// Process one byte. Returns `true` if it completed a line.
    pub fn process_byte<S: LineSink + ?Sized>(&mut self, b: u8, sink: &mut S) -> bool {
        if self.line_end {
            self.line_end = false;
            self.line.clear();
        }

        let code = codes::classify(b, self.mode);
        trace!(
            "raw byte {:02X} value {} glyph {:?} -> {:?}",
            b,
            b,
            charset::lookup(usize::from(b)).ok(),
            code
        );

        match code {
            ByteCode::Glyph(index) => match charset::lookup(usize::from(index)) {
                Ok(glyph) => self.line.push(glyph),
                Err(e) => warn!("skipping byte {}: {}", b, e),
            },
            ByteCode::SpaceRun(count) => {
                self.line.extend(std::iter::repeat_n(' ', count));
            }
            ByteCode::Separator => self.end_line(),
            ByteCode::LineEnd => {
                if !self.line.is_empty() {
                    self.end_line();
                }
            }
            ByteCode::RightJustify => {
                if !self.line.is_empty() {
                    self.right_justify();
                }
            }
            ByteCode::Ignored => {}
        }

        if !self.line_end {
            return false;
        }

        let line = std::mem::take(&mut self.line);
        let line = if self.mode.is_dtr() {
            self.listing.annotate(line)
        } else {
            line
        };
        debug!("line complete: {:?}", line);
        sink.push_line(line);
        true
    }

    /// Tear down the connection state.
    ///
    /// A partially assembled line is dropped, not flushed.
    pub fn disconnect(&mut self) {
        let pending = self.pending().chars().count();
        if pending > 0 {
            debug!("disconnect: discarding {} pending characters", pending);
        }
        self.line.clear();
        self.line_end = false;
        self.listing.reset();
    }

    fn end_line(&mut self) {
        self.line.push('\n');
        self.line_end = true;
    }

    fn right_justify(&mut self) {
        match self.mode {
            Mode::Dtr => {
                let width = self.line.chars().count();
                let pad = LINE_WIDTH.saturating_sub(width);
                self.line.insert_str(0, &" ".repeat(pad));
                self.end_line();
            }
            // Completed later by a 224.
            Mode::Legacy => self.line.insert_str(0, &" ".repeat(LINE_WIDTH)),
        }
    }
}
