//! `Content-Length` framing for JSON-RPC over the server's stdio.
//!
//! ```text
//! Content-Length: <bytes>\r\n
//! \r\n
//! <json body>
//! ```
//!
//! [`FrameReader`] and [`FrameWriter`] are generic over tokio's async IO
//! traits so the same code drives a child process and an in-memory duplex.

use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Upper bound on a single frame body (4 MiB).
pub const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

const CONTENT_LENGTH: &str = "Content-Length";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected EOF while reading headers")]
    TruncatedHeaders,

    #[error("missing Content-Length header")]
    MissingContentLength,

    #[error("invalid Content-Length value: {0:?}")]
    InvalidContentLength(String),

    #[error("Content-Length {length} exceeds maximum {MAX_FRAME_BYTES}")]
    FrameTooLarge { length: usize },

    #[error("malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads framed JSON-RPC messages.
pub struct FrameReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Read the next message.
    ///
    /// `Ok(None)` means the peer closed the stream between frames.
    pub async fn read_message(&mut self) -> Result<Option<serde_json::Value>, CodecError> {
        let Some(length) = self.read_headers().await? else {
            return Ok(None);
        };

        if length > MAX_FRAME_BYTES {
            return Err(CodecError::FrameTooLarge { length });
        }

        let mut body = vec![0u8; length];
        self.reader.read_exact(&mut body).await?;
        Ok(Some(serde_json::from_slice(&body)?))
    }

    async fn read_headers(&mut self) -> Result<Option<usize>, CodecError> {
        let mut content_length = None;
        let mut line = String::new();
        let mut started = false;

        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                // EOF is clean only before the first header byte.
                return if started {
                    Err(CodecError::TruncatedHeaders)
                } else {
                    Ok(None)
                };
            }
            started = true;

            let header = line.trim();
            if header.is_empty() {
                break;
            }

            if let Some((name, value)) = header.split_once(':')
                && name.trim().eq_ignore_ascii_case(CONTENT_LENGTH)
            {
                let value = value.trim();
                let length = value
                    .parse()
                    .map_err(|_| CodecError::InvalidContentLength(value.to_string()))?;
                content_length = Some(length);
            }
        }

        content_length
            .map(Some)
            .ok_or(CodecError::MissingContentLength)
    }
}

/// Writes framed JSON-RPC messages.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialize `message`, frame it and flush.
    pub async fn write_message<T: Serialize + ?Sized>(
        &mut self,
        message: &T,
    ) -> Result<(), CodecError> {
        let body = serde_json::to_vec(message)?;
        let header = format!("{CONTENT_LENGTH}: {}\r\n\r\n", body.len());

        self.writer.write_all(header.as_bytes()).await?;
        self.writer.write_all(&body).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
