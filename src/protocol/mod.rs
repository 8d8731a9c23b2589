//! # HP 82143A Print Stream Protocol
//!
//! This module describes the byte stream an HP-41 sends to its thermal
//! printer, as captured from the serial side of a printer interface.
//!
//! ## Module Structure
//!
//! - [`charset`]: 128-entry character code to glyph table
//! - [`codes`]: Classification of raw bytes into glyphs, spacing and sentinels
//!
//! ## Usage Example
//!
//! ```
//! use hp41print::decoder::Mode;
//! use hp41print::protocol::{charset, codes::{self, ByteCode}};
//!
//! assert_eq!(charset::lookup(65).unwrap(), 'A');
//! assert_eq!(codes::classify(224, Mode::Legacy), ByteCode::LineEnd);
//! assert_eq!(codes::classify(162, Mode::Dtr), ByteCode::Separator);
//! ```
//!
//! ## Interface Variants
//!
//! The same byte codes arrive through two kinds of interface. The legacy
//! USB interface sends every line end as 224. The DTR-handshake interface
//! (TULIP4041) batches line ends as 162 and completes right-justified lines
//! on 232 by itself. See [`Mode`](crate::decoder::Mode).

pub mod charset;
pub mod codes;
