//! Output relay from the renderer's pipes to a terminal-emulating sink.
//!
//! Each attached stream gets its own reader task. Readers never touch
//! display state: they turn reads into [`RelayEvent`]s on the caller's
//! channel, and the single event-loop task hands chunks to
//! [`PtyRelay::forward`], which normalizes line endings for the sink.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};

use runme_preview_core::{SessionId, StreamKind};

/// Size of a single read from a pipe.
const READ_BUFFER_SIZE: usize = 4096;

/// Events produced by stream readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// Raw bytes read from one of the child's streams
    ChunkReceived {
        /// Session the stream belongs to
        session: SessionId,
        /// Which stream produced the bytes
        stream: StreamKind,
        /// The bytes, exactly as read
        bytes: Vec<u8>,
    },
    /// A read failed; the stream is no longer being read
    StreamError {
        /// Session the stream belongs to
        session: SessionId,
        /// Which stream failed
        stream: StreamKind,
        /// Error description
        message: String,
    },
}

impl RelayEvent {
    /// Session the event belongs to.
    pub fn session(&self) -> SessionId {
        match self {
            RelayEvent::ChunkReceived { session, .. } | RelayEvent::StreamError { session, .. } => {
                *session
            }
        }
    }
}

/// Destination for relayed output.
pub trait OutputSink {
    /// Write one terminal line (already terminated with `\r\n`).
    fn write_line(&mut self, line: &[u8]);

    /// Report a read failure on one of the streams.
    fn write_error(&mut self, message: &str);
}

/// An active reader on one stream.
#[derive(Debug)]
pub struct Subscription {
    stream: StreamKind,
    abort: AbortHandle,
}

impl Subscription {
    /// Stream this subscription reads.
    pub fn stream(&self) -> StreamKind {
        self.stream
    }

    /// Whether the reader has stopped (EOF, error, or cancelled).
    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

/// Relay holding the subscriptions of the current session.
#[derive(Debug, Default)]
pub struct PtyRelay {
    subscriptions: Vec<Subscription>,
}

impl PtyRelay {
    /// Create a relay with no subscriptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start reading `reader` asynchronously.
    ///
    /// Chunks and read errors are sent to `events`. The reader stops at EOF,
    /// on the first read error, or when the receiving side is gone; an error
    /// on one stream has no effect on any other subscription. The returned
    /// handle completes when the reader stops, which lets the exit watcher
    /// drain output before reporting the exit. A UTF-8 character cut by a read
    /// is held back until its remaining bytes arrive, so chunks never split one.
    pub fn attach<R, E>(
        &mut self,
        stream: StreamKind,
        reader: R,
        session: SessionId,
        events: mpsc::UnboundedSender<E>,
    ) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
        E: From<RelayEvent> + Send + 'static,
    {
        debug!("Attaching {} reader: session={}", stream, session);
        let handle = tokio::spawn(read_stream(stream, reader, session, events));
        self.subscriptions.push(Subscription {
            stream,
            abort: handle.abort_handle(),
        });
        handle
    }

    /// Stop reading every attached stream. Returns how many were still active.
    pub fn detach_all(&mut self) -> usize {
        let mut stopped = 0;
        for subscription in self.subscriptions.drain(..) {
            if !subscription.is_finished() {
                subscription.abort.abort();
                stopped += 1;
            }
        }
        if stopped > 0 {
            debug!("Stopped {} stream reader(s)", stopped);
        }
        stopped
    }

    /// Current subscriptions.
    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    /// Forward one chunk to `sink`, one terminal line at a time.
    ///
    /// Returns the number of lines written.
    pub fn forward(chunk: &[u8], sink: &mut dyn OutputSink) -> usize {
        let lines = normalize_lines(chunk);
        for line in &lines {
            sink.write_line(line);
        }
        lines.len()
    }

    /// Forward a read failure to the sink's error channel.
    pub fn report_error(stream: StreamKind, message: &str, sink: &mut dyn OutputSink) {
        sink.write_error(&format_stream_error(stream, message));
    }
}

impl Drop for PtyRelay {
    fn drop(&mut self) {
        self.detach_all();
    }
}

/// Legible message for a failed stream read.
pub fn format_stream_error(stream: StreamKind, message: &str) -> String {
    format!("{stream} read failed: {message}")
}

/// Split a chunk on `\n` into terminal lines ending in `\r\n`.
///
/// A `\r` already ending a segment is dropped so CRLF input is not doubled.
/// A chunk ending in `\n` does not produce a trailing empty line. No state
/// is carried between chunks.
///
/// # Examples
///
/// ```
/// use runme_preview_relay::relay::normalize_lines;
///
/// let lines = normalize_lines(b"line1\nline2\n");
/// assert_eq!(lines, vec![b"line1\r\n".to_vec(), b"line2\r\n".to_vec()]);
/// ```
pub fn normalize_lines(chunk: &[u8]) -> Vec<Vec<u8>> {
    if chunk.is_empty() {
        return Vec::new();
    }

    let body = chunk.strip_suffix(b"\n").unwrap_or(chunk);
    body.split(|b| *b == b'\n')
        .map(|segment| {
            let segment = segment.strip_suffix(b"\r").unwrap_or(segment);
            let mut line = Vec::with_capacity(segment.len() + 2);
            line.extend_from_slice(segment);
            line.extend_from_slice(b"\r\n");
            line
        })
        .collect()
}

/// Number of bytes at the end of `bytes` that start a UTF-8 sequence the
/// buffer cuts short.
fn incomplete_utf8_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if width > back { back } else { 0 };
    }
    0
}

async fn read_stream<R, E>(
    stream: StreamKind,
    mut reader: R,
    session: SessionId,
    events: mpsc::UnboundedSender<E>,
) where
    R: AsyncRead + Unpin + Send + 'static,
    E: From<RelayEvent> + Send + 'static,
{
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    // Start of a character whose remaining bytes have not been read yet
    let mut pending = Vec::new();
    let mut failure = None;

    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => {
                debug!("{} reached EOF: session={}", stream, session);
                break;
            }
            Ok(n) => {
                let mut bytes = std::mem::take(&mut pending);
                bytes.extend_from_slice(&buffer[..n]);
                let tail = incomplete_utf8_tail(&bytes);
                pending = bytes.split_off(bytes.len() - tail);
                if bytes.is_empty() {
                    continue;
                }

                let event = RelayEvent::ChunkReceived {
                    session,
                    stream,
                    bytes,
                };
                if events.send(event.into()).is_err() {
                    debug!("Event receiver dropped, stopping {} reader", stream);
                    return;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("Failed to read {}: session={}, error={}", stream, session, e);
                failure = Some(e.to_string());
                break;
            }
        }
    }

    if !pending.is_empty() {
        let event = RelayEvent::ChunkReceived {
            session,
            stream,
            bytes: pending,
        };
        let _ = events.send(event.into());
    }
    if let Some(message) = failure {
        let event = RelayEvent::StreamError {
            session,
            stream,
            message,
        };
        let _ = events.send(event.into());
    }
}
