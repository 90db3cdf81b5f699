//! Newline-delimited message framing.
//!
//! A TCP stream delivers bytes, not messages: one read may return half a
//! request or three of them. [`FrameReader`] buffers the stream and yields
//! exactly one `\n`-terminated payload per call.

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Default upper bound on a single frame (1 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame too large: max {max_frame_bytes} bytes")]
    TooLarge { max_frame_bytes: usize },
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,
}

pub struct FrameReader<R> {
    reader: R,
    max_frame_bytes: usize,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(reader: R, max_frame_bytes: usize) -> Self {
        Self {
            reader,
            max_frame_bytes,
            buf: Vec::new(),
        }
    }

    /// Read the next non-empty frame, without its line terminator.
    ///
    /// Returns `Ok(None)` on a clean EOF between frames. A trailing frame
    /// without a final newline is still returned.
    pub async fn read_frame(&mut self) -> Result<Option<String>, FrameError> {
        loop {
            self.buf.clear();
            let done = self.fill_line().await?;

            if self.buf.is_empty() && done {
                return Ok(None);
            }

            let line = std::str::from_utf8(&self.buf).map_err(|_| FrameError::InvalidUtf8)?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                if done {
                    return Ok(None);
                }
                continue;
            }
            return Ok(Some(trimmed.to_string()));
        }
    }

    /// Fill `buf` up to and including the next newline. Returns true at EOF.
    async fn fill_line(&mut self) -> Result<bool, FrameError> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(true);
            }

            let (chunk, found) = match available.iter().position(|&b| b == b'\n') {
                Some(pos) => (&available[..=pos], true),
                None => (available, false),
            };

            if self.buf.len() + chunk.len() > self.max_frame_bytes + 1 {
                return Err(FrameError::TooLarge {
                    max_frame_bytes: self.max_frame_bytes,
                });
            }

            self.buf.extend_from_slice(chunk);
            let used = chunk.len();
            self.reader.consume(used);

            if found {
                return Ok(false);
            }
        }
    }
}

/// Write one payload followed by the frame terminator.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &str) -> std::io::Result<()> {
    let mut frame = String::with_capacity(payload.len() + 1);
    frame.push_str(payload);
    frame.push('\n');
    writer.write_all(frame.as_bytes()).await?;
    writer.flush().await
}
