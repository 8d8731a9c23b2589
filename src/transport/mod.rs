//! # Byte Sources
//!
//! The decoder needs nothing from a transport except ordered chunks of
//! bytes. [`ByteSource`] is that contract.
//!
//! ## Available Sources
//!
//! - [`serial`]: raw serial TTY (USB adapter or DTR interface)
//! - [`ReadSource`]: any [`std::io::Read`], e.g. a captured byte file or stdin

pub mod serial;

pub use serial::SerialTransport;

use std::io::{self, Read};

use crate::error::Hp41PrintError;

/// Ordered source of byte chunks.
pub trait ByteSource {
    /// Read the next chunk into `buf`.
    ///
    /// - `Ok(Some(n))` with `n > 0`: `buf[..n]` holds the next bytes
    /// - `Ok(Some(0))`: nothing arrived this poll, try again
    /// - `Ok(None)`: the source is closed
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Hp41PrintError>;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Hp41PrintError> {
        (**self).read_chunk(buf)
    }
}

/// Adapts an [`io::Read`] into a [`ByteSource`].
///
/// End of stream closes the source. An optional chunk size caps each read,
/// which replays a capture with a specific delivery granularity.
#[derive(Debug)]
pub struct ReadSource<R> {
    reader: R,
    chunk_size: Option<usize>,
}

impl<R: Read> ReadSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            chunk_size: None,
        }
    }

    /// Deliver at most `size` bytes per chunk (minimum 1).
    pub fn with_chunk_size(reader: R, size: usize) -> Self {
        Self {
            reader,
            chunk_size: Some(size.max(1)),
        }
    }
}

impl<R: Read> ByteSource for ReadSource<R> {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Hp41PrintError> {
        let limit = self.chunk_size.map_or(buf.len(), |size| size.min(buf.len()));
        match self.reader.read(&mut buf[..limit]) {
            Ok(0) => Ok(None),
            Ok(n) => Ok(Some(n)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(Some(0)),
            Err(e) => Err(e.into()),
        }
    }
}
