//! # Error Types
//!
//! This module defines error types used throughout the hp41print library.
//!
//! Only the outer layers (configuration, transport, file I/O) surface errors
//! to callers. The decoder itself recovers from everything it can see: an
//! out-of-table glyph index is logged and skipped, unknown byte values are
//! ignored.

use thiserror::Error;

/// Main error type for hp41print operations
#[derive(Debug, Error)]
pub enum Hp41PrintError {
    /// Glyph table lookup outside `0..128`
    #[error("Glyph index out of range: {0}")]
    GlyphIndexOutOfRange(usize),

    /// Transport-level errors (open, TTY setup, read)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid serial settings
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file or JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
