//! JSON-RPC framing codec for the ruff server transport.
//!
//! LSP uses `Content-Length: N\r\n\r\n{json}` framing over stdin/stdout.
//! Errors come back as [`TransportError`] so a pipe closing under us is
//! already tagged when it reaches the supervisor.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::TransportError;

/// Maximum frame size (16 MiB). Large workspaces publish big diagnostic batches.
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Reads JSON-RPC frames from an async reader.
pub struct FrameReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Read the next JSON-RPC frame.
    ///
    /// Returns `Ok(None)` on EOF between frames (clean shutdown).
    pub async fn read_frame(&mut self) -> Result<Option<serde_json::Value>, TransportError> {
        let Some(content_length) = self.read_headers().await? else {
            return Ok(None);
        };

        if content_length > MAX_FRAME_BYTES {
            return Err(TransportError::Oversized {
                len: content_length,
                max: MAX_FRAME_BYTES,
            });
        }

        let mut body = vec![0u8; content_length];
        self.reader
            .read_exact(&mut body)
            .await
            .map_err(TransportError::from_io)?;

        Ok(Some(serde_json::from_slice(&body)?))
    }

    /// Parse headers until the empty line separator.
    ///
    /// Returns the `Content-Length` value, or `None` on EOF before any header.
    async fn read_headers(&mut self) -> Result<Option<usize>, TransportError> {
        let mut content_length: Option<usize> = None;
        let mut line = String::new();
        let mut saw_any_header_bytes = false;

        loop {
            line.clear();
            let bytes_read = self
                .reader
                .read_line(&mut line)
                .await
                .map_err(TransportError::from_io)?;

            if bytes_read == 0 {
                if !saw_any_header_bytes {
                    return Ok(None);
                }
                return Err(TransportError::Malformed(
                    "unexpected EOF while reading headers".to_string(),
                ));
            }
            saw_any_header_bytes = true;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }

            if let Some((key, value)) = trimmed.split_once(':')
                && key.eq_ignore_ascii_case("Content-Length")
            {
                let len = value.trim().parse().map_err(|_| {
                    TransportError::Malformed(format!("invalid Content-Length value: {value}"))
                })?;
                content_length = Some(len);
            }
        }

        content_length
            .map(Some)
            .ok_or_else(|| TransportError::Malformed("missing Content-Length header".to_string()))
    }
}

/// Writes JSON-RPC frames to an async writer.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a JSON-RPC frame with `Content-Length` header.
    pub async fn write_frame(&mut self, msg: &serde_json::Value) -> Result<(), TransportError> {
        let body = serde_json::to_string(msg)?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());

        self.writer
            .write_all(header.as_bytes())
            .await
            .map_err(TransportError::from_io)?;
        self.writer
            .write_all(body.as_bytes())
            .await
            .map_err(TransportError::from_io)?;
        self.writer.flush().await.map_err(TransportError::from_io)
    }
}
