//! # Connection Sessions
//!
//! Wires a [`ByteSource`] to a [`LineDecoder`] and a [`LineSink`].
//!
//! [`pump`] runs the loop on the calling thread. [`spawn_listener`] runs it
//! on a blocking worker and hands completed lines to async code over an
//! unbounded FIFO channel, so lines reach the consumer in completion order.
//!
//! When the source closes or the session is stopped the decoder is
//! disconnected: a partial line still in the buffer is discarded. Lines
//! completed before that point are never dropped; [`Listener::finish`]
//! hands over whatever is still queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::decoder::{LineDecoder, Mode};
use crate::error::Hp41PrintError;
use crate::transcript::LineSink;
use crate::transport::ByteSource;

/// Read buffer size per chunk
pub const READ_BUFFER_SIZE: usize = 4096;

/// Counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub mode: Mode,
    /// Bytes received
    pub bytes: usize,
    /// Non-empty chunks received
    pub chunks: usize,
    /// Lines completed
    pub lines: usize,
}

/// Pump `source` through `decoder` into `sink` until the source closes.
pub fn pump<S, K>(
    source: &mut S,
    decoder: &mut LineDecoder,
    sink: &mut K,
) -> Result<SessionStats, Hp41PrintError>
where
    S: ByteSource + ?Sized,
    K: LineSink + ?Sized,
{
    pump_until(source, decoder, sink, &AtomicBool::new(false))
}

/// Like [`pump`], but also returns once `stop` is set.
pub fn pump_until<S, K>(
    source: &mut S,
    decoder: &mut LineDecoder,
    sink: &mut K,
    stop: &AtomicBool,
) -> Result<SessionStats, Hp41PrintError>
where
    S: ByteSource + ?Sized,
    K: LineSink + ?Sized,
{
    let mut stats = SessionStats {
        mode: decoder.mode(),
        ..Default::default()
    };
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    let result = loop {
        if stop.load(Ordering::Relaxed) {
            debug!("session stopped");
            break Ok(());
        }
        match source.read_chunk(&mut buf) {
            Ok(None) => break Ok(()),
            Ok(Some(0)) => {}
            Ok(Some(n)) => {
                stats.bytes += n;
                stats.chunks += 1;
                stats.lines += decoder.process_chunk(&buf[..n], sink);
            }
            Err(e) => break Err(e),
        }
    };

    decoder.disconnect();
    info!(
        "session ended: {} bytes in {} chunks, {} lines",
        stats.bytes, stats.chunks, stats.lines
    );
    result.map(|()| stats)
}

/// A session running on a blocking worker.
#[derive(Debug)]
pub struct Listener {
    lines: UnboundedReceiver<String>,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Result<SessionStats, Hp41PrintError>>,
}

/// Start decoding `source` on a blocking worker.
///
/// Must be called from within a tokio runtime.
pub fn spawn_listener<S>(mut source: S, mode: Mode) -> Listener
where
    S: ByteSource + Send + 'static,
{
    let (mut tx, rx) = mpsc::unbounded_channel();
    let stop = Arc::new(AtomicBool::new(false));
    let worker_stop = Arc::clone(&stop);

    let handle = tokio::task::spawn_blocking(move || {
        let mut decoder = LineDecoder::new(mode);
        pump_until(&mut source, &mut decoder, &mut tx, &worker_stop)
    });

    Listener {
        lines: rx,
        stop,
        handle,
    }
}

impl Listener {
    /// Next completed line; `None` once the session has ended and every
    /// line has been delivered.
    pub async fn recv(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Ask the worker to stop after its current read.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Wait for the worker to finish, pushing every line still queued into
    /// `sink` in completion order.
    pub async fn finish<K>(mut self, sink: &mut K) -> Result<SessionStats, Hp41PrintError>
    where
        K: LineSink + ?Sized,
    {
        // The worker owns the sender, so the channel closes when it exits.
        let mut drained = 0;
        while let Some(line) = self.lines.recv().await {
            sink.push_line(line);
            drained += 1;
        }
        if drained > 0 {
            debug!("delivered {} queued lines after stop", drained);
        }
        self.handle
            .await
            .map_err(|e| Hp41PrintError::Transport(format!("Listener task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Transcript;
    use crate::transport::ReadSource;
    use std::io::Cursor;

    /// Yields scripted reads, including idle polls.
    struct Scripted(Vec<Option<Vec<u8>>>);

    impl ByteSource for Scripted {
        fn read_chunk(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Hp41PrintError> {
            if self.0.is_empty() {
                return Ok(None);
            }
            match self.0.remove(0) {
                Some(bytes) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(Some(bytes.len()))
                }
                None => Ok(Some(0)),
            }
        }
    }

    struct Failing;

    impl ByteSource for Failing {
        fn read_chunk(&mut self, _buf: &mut [u8]) -> Result<Option<usize>, Hp41PrintError> {
            Err(Hp41PrintError::Transport("unplugged".to_string()))
        }
    }

    #[test]
    fn test_pump_counts() {
        let mut source = ReadSource::with_chunk_size(Cursor::new(vec![65, 224, 66, 224, 67]), 2);
        let mut decoder = LineDecoder::new(Mode::Legacy);
        let mut transcript = Transcript::new();

        let stats = pump(&mut source, &mut decoder, &mut transcript).unwrap();

        assert_eq!(transcript.as_str(), "A\nB\n");
        assert_eq!(
            stats,
            SessionStats {
                mode: Mode::Legacy,
                bytes: 5,
                chunks: 3,
                lines: 2
            }
        );
    }

    #[test]
    fn test_pump_skips_idle_polls() {
        let mut source = Scripted(vec![None, Some(vec![65]), None, None, Some(vec![224])]);
        let mut decoder = LineDecoder::new(Mode::Legacy);
        let mut lines = Vec::new();

        let stats = pump(&mut source, &mut decoder, &mut lines).unwrap();

        assert_eq!(lines, vec!["A\n"]);
        assert_eq!(stats.chunks, 2);
    }

    #[test]
    fn test_pump_discards_partial_line_at_close() {
        let mut source = ReadSource::new(Cursor::new(vec![65, 224, 66, 67]));
        let mut decoder = LineDecoder::new(Mode::Legacy);
        let mut lines = Vec::new();

        pump(&mut source, &mut decoder, &mut lines).unwrap();

        assert_eq!(lines, vec!["A\n"]);
        assert_eq!(decoder.pending(), "");
    }

    #[test]
    fn test_pump_propagates_transport_error() {
        let mut decoder = LineDecoder::new(Mode::Dtr);
        let mut lines = Vec::new();
        let err = pump(&mut Failing, &mut decoder, &mut lines).unwrap_err();
        assert!(matches!(err, Hp41PrintError::Transport(_)));
    }

    #[test]
    fn test_pump_until_honors_stop() {
        let mut source = Scripted(vec![Some(vec![65, 224])]);
        let mut decoder = LineDecoder::new(Mode::Legacy);
        let mut lines = Vec::new();

        let stats =
            pump_until(&mut source, &mut decoder, &mut lines, &AtomicBool::new(true)).unwrap();

        assert!(lines.is_empty());
        assert_eq!(stats.bytes, 0);
    }

    #[tokio::test]
    async fn test_listener_delivers_lines_in_order() {
        let bytes: Vec<u8> = (0..50u8)
            .flat_map(|i| [48 + i % 10, 224])
            .collect();
        let source = ReadSource::with_chunk_size(Cursor::new(bytes), 3);
        let mut listener = spawn_listener(source, Mode::Legacy);

        let mut received = Vec::new();
        while let Some(line) = listener.recv().await {
            received.push(line);
        }
        let stats = listener.finish(&mut received).await.unwrap();

        let expected: Vec<String> = (0..50u8).map(|i| format!("{}\n", i % 10)).collect();
        assert_eq!(received, expected);
        assert_eq!(stats.lines, 50);
    }

    #[tokio::test]
    async fn test_listener_stop() {
        struct Idle;
        impl ByteSource for Idle {
            fn read_chunk(&mut self, _buf: &mut [u8]) -> Result<Option<usize>, Hp41PrintError> {
                std::thread::sleep(std::time::Duration::from_millis(5));
                Ok(Some(0))
            }
        }

        let listener = spawn_listener(Idle, Mode::Dtr);
        listener.stop();
        let mut lines = Vec::new();
        let stats = listener.finish(&mut lines).await.unwrap();
        assert!(lines.is_empty());
        assert_eq!(stats.bytes, 0);
        assert_eq!(stats.mode, Mode::Dtr);
    }

    /// Delivers its chunks, then idles like an open port with nothing to send.
    struct ThenIdle(Vec<Vec<u8>>);

    impl ByteSource for ThenIdle {
        fn read_chunk(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Hp41PrintError> {
            if self.0.is_empty() {
                std::thread::sleep(std::time::Duration::from_millis(5));
                return Ok(Some(0));
            }
            let bytes = self.0.remove(0);
            buf[..bytes.len()].copy_from_slice(&bytes);
            Ok(Some(bytes.len()))
        }
    }

    #[tokio::test]
    async fn test_stop_keeps_queued_lines() {
        let bytes: Vec<u8> = (0..20u8).flat_map(|i| [48 + i % 10, 224]).collect();
        let source = ThenIdle(bytes.chunks(40).map(<[u8]>::to_vec).collect());
        let mut listener = spawn_listener(source, Mode::Legacy);

        let mut received = vec![listener.recv().await.unwrap()];
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        listener.stop();
        let stats = listener.finish(&mut received).await.unwrap();

        let expected: Vec<String> = (0..20u8).map(|i| format!("{}\n", i % 10)).collect();
        assert_eq!(stats.lines, 20);
        assert_eq!(received.len(), stats.lines);
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn test_stop_mid_stream_delivers_every_completed_line() {
        struct Slow(ReadSource<Cursor<Vec<u8>>>);
        impl ByteSource for Slow {
            fn read_chunk(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Hp41PrintError> {
                std::thread::sleep(std::time::Duration::from_millis(2));
                self.0.read_chunk(buf)
            }
        }

        let bytes: Vec<u8> = (0..200u8).flat_map(|i| [48 + i % 10, 224]).collect();
        let source = Slow(ReadSource::with_chunk_size(Cursor::new(bytes), 8));
        let mut listener = spawn_listener(source, Mode::Legacy);

        let mut received = vec![listener.recv().await.unwrap()];
        listener.stop();
        let stats = listener.finish(&mut received).await.unwrap();

        let expected: Vec<String> = (0..200u8).map(|i| format!("{}\n", i % 10)).collect();
        assert_eq!(received.len(), stats.lines);
        assert_eq!(received[..], expected[..stats.lines]);
    }
}
