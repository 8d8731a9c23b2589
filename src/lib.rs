//! # hp41print - HP-41 Thermal Printer Stream Decoder
//!
//! hp41print turns the byte stream an HP-41 calculator sends to its 82143A
//! thermal printer into a readable, line-structured transcript. It provides:
//!
//! - **Protocol tables**: the 128-entry printer character set and byte classification
//! - **Line decoding**: a per-connection state machine, indifferent to chunk sizes
//! - **Listing annotation**: reconstructed step numbers for program listings (DTR interface)
//! - **Transport**: raw serial TTY reads with optional DTR handshake
//!
//! ## Quick Start
//!
//! ```no_run
//! use hp41print::{
//!     config::SerialConfig,
//!     decoder::LineDecoder,
//!     session,
//!     transcript::Transcript,
//!     transport::SerialTransport,
//! };
//!
//! let config = SerialConfig {
//!     device: Some("/dev/ttyUSB0".to_string()),
//!     dtr: true,
//!     ..Default::default()
//! };
//!
//! let mut transport = SerialTransport::open_config(&config)?;
//! let mut decoder = LineDecoder::new(config.mode());
//! let mut transcript = Transcript::new();
//!
//! session::pump(&mut transport, &mut decoder, &mut transcript)?;
//! print!("{}", transcript.as_str());
//!
//! # Ok::<(), hp41print::error::Hp41PrintError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | Character set and byte codes |
//! | [`decoder`] | Line decoder, interface modes, listing annotator |
//! | [`transcript`] | Transcript and line sinks |
//! | [`transport`] | Byte sources (serial, readers) |
//! | [`session`] | Source → decoder → sink plumbing |
//! | [`config`] | Serial link settings |
//! | [`error`] | Error types |
//!
//! ## Supported Interfaces
//!
//! - Legacy USB serial interface (no DTR)
//! - DTR-handshake interface (TULIP4041)

pub mod config;
pub mod decoder;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transcript;
pub mod transport;

// Re-exports for convenience
pub use config::SerialConfig;
pub use decoder::{LineDecoder, Mode};
pub use error::Hp41PrintError;
pub use transcript::{LineSink, Transcript};
pub use transport::{ByteSource, SerialTransport};
