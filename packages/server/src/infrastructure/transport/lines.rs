//! Newline-delimited JSON transport over any tokio byte stream.
//!
//! Blank lines are skipped, and so are lines that are not UTF-8 or longer
//! than the line limit. Used by the TCP listener; tests drive it with
//! `tokio::io::duplex`.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{
    domain::{InboundTransport, MAX_CONTENT_CHARS, Message, OutboundTransport, TransportError},
    wire,
};

/// Longest accepted line in bytes: the largest content in 4-byte UTF-8 plus
/// room for the JSON envelope.
pub const DEFAULT_MAX_LINE_BYTES: usize = MAX_CONTENT_CHARS * 4 + 1024;

pub struct LinesInbound<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    max_line_bytes: usize,
}

impl<R: AsyncRead + Unpin> LinesInbound<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_line_bytes(reader, DEFAULT_MAX_LINE_BYTES)
    }

    pub fn with_max_line_bytes(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
            max_line_bytes: max_line_bytes.max(1),
        }
    }

    /// Consume input up to and including the next newline (or EOF).
    async fn skip_rest_of_line(&mut self) -> Result<(), TransportError> {
        loop {
            let (consumed, found) = {
                let available = self.reader.fill_buf().await.map_err(read_error)?;
                if available.is_empty() {
                    return Ok(());
                }
                match available.iter().position(|byte| *byte == b'\n') {
                    Some(pos) => (pos + 1, true),
                    None => (available.len(), false),
                }
            };
            self.reader.consume(consumed);
            if found {
                return Ok(());
            }
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> InboundTransport for LinesInbound<R> {
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            self.buf.clear();
            let limit = self.max_line_bytes as u64 + 1;
            let read = (&mut self.reader)
                .take(limit)
                .read_until(b'\n', &mut self.buf)
                .await
                .map_err(read_error)?;
            if read == 0 {
                return Ok(None);
            }

            if !self.buf.ends_with(b"\n") && self.buf.len() > self.max_line_bytes {
                tracing::warn!(
                    "Skipping line longer than {} bytes",
                    self.max_line_bytes
                );
                self.skip_rest_of_line().await?;
                continue;
            }

            let line = self.buf.strip_suffix(b"\n").unwrap_or(&self.buf);
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            match std::str::from_utf8(line) {
                Ok(text) if text.trim().is_empty() => continue,
                Ok(text) => return Ok(Some(text.to_owned())),
                Err(e) => {
                    tracing::warn!("Skipping line that is not valid UTF-8: {}", e);
                    continue;
                }
            }
        }
    }
}

fn read_error(e: io::Error) -> TransportError {
    TransportError::Read(e.to_string())
}

fn write_error(e: io::Error) -> TransportError {
    match e.kind() {
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted => TransportError::Closed,
        _ => TransportError::Write(e.to_string()),
    }
}

pub struct LinesOutbound<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LinesOutbound<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> OutboundTransport for LinesOutbound<W> {
    async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let mut line = wire::encode(message).map_err(|e| TransportError::Write(e.to_string()))?;
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(write_error)?;
        self.writer.flush().await.map_err(write_error)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.writer.shutdown().await.map_err(write_error)
    }
}
