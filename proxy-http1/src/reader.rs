//! Byte-level reading of a framed HTTP/1.1 message off an async stream.

use proxy_http::{Error, ProtocolError};
use tokio::io::{AsyncBufReadExt, AsyncReadExt};
use tracing::debug;

/// Header blocks longer than this without a terminating blank line are
/// rejected rather than buffered without bound.
pub const MAX_HEADER_BLOCK_BYTES: usize = 64 * 1024;

/// Chunk-size lines longer than this are rejected as malformed; a real hex
/// chunk size line is a handful of bytes.
const MAX_CHUNK_SIZE_LINE_BYTES: usize = 1024;

/// How `read_body` should interpret the stream, set before each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// No body is expected at all.
    NoRead,
    /// Body is framed as a sequence of `Transfer-Encoding: chunked` chunks.
    Chunked,
    /// Body is exactly `Content-Length` bytes.
    ContentLength(usize),
}

/// Reads a single framed HTTP/1.1 message (headers, then body) off a
/// buffered async stream. Owned by exactly one handler task for the
/// lifetime of one connection; never shared.
pub struct StreamReader<'a, R> {
    stream: &'a mut R,
    pub body_mode: BodyMode,
}

impl<'a, R> StreamReader<'a, R>
where
    R: AsyncBufReadExt + Unpin,
{
    pub fn new(stream: &'a mut R) -> Self {
        Self {
            stream,
            body_mode: BodyMode::NoRead,
        }
    }

    /// Reads raw bytes up to and including the first `\r\n\r\n`, the end of
    /// the header block.
    pub async fn read_headers(&mut self) -> Result<Vec<u8>, Error> {
        let mut raw = Vec::new();
        let mut tail = [0u8; 4];

        loop {
            if raw.len() >= MAX_HEADER_BLOCK_BYTES {
                return Err(Error::from(ProtocolError::HeaderBlockTooLarge));
            }

            let byte = self.stream.read_u8().await.map_err(|error| {
                if error.kind() == std::io::ErrorKind::UnexpectedEof {
                    Error::from(ProtocolError::HeaderBlockIncomplete)
                } else {
                    Error::from(error)
                }
            })?;

            raw.push(byte);
            tail.rotate_left(1);
            tail[3] = byte;

            if &tail == b"\r\n\r\n" {
                debug!(bytes = raw.len(), "read header block");
                return Ok(raw);
            }
        }
    }

    /// Reads the decoded body bytes according to `self.body_mode`.
    pub async fn read_body(&mut self) -> Result<Vec<u8>, Error> {
        match self.body_mode {
            BodyMode::NoRead => Ok(Vec::new()),
            BodyMode::ContentLength(length) => self.read_content_length_body(length).await,
            BodyMode::Chunked => self.read_chunked_body().await,
        }
    }

    async fn read_content_length_body(&mut self, length: usize) -> Result<Vec<u8>, Error> {
        let mut buffer = vec![0u8; length];
        self.stream.read_exact(&mut buffer).await.map_err(|error| {
            if error.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::from(ProtocolError::ShortRead)
            } else {
                Error::from(error)
            }
        })?;
        debug!(bytes = buffer.len(), "read content-length body");
        Ok(buffer)
    }

    async fn read_chunked_body(&mut self) -> Result<Vec<u8>, Error> {
        let mut body = Vec::new();

        loop {
            let size_line = self.read_line(MAX_CHUNK_SIZE_LINE_BYTES).await?;
            let size_token = size_line.split(';').next().unwrap_or("").trim();
            let size = usize::from_str_radix(size_token, 16)
                .map_err(|_| Error::from(ProtocolError::MalformedChunkSize))?;

            if size == 0 {
                // Trailer block: discard it, then the terminating CRLF.
                self.discard_trailer().await?;
                debug!(bytes = body.len(), "finished chunked body");
                return Ok(body);
            }

            let mut chunk = vec![0u8; size];
            self.stream.read_exact(&mut chunk).await.map_err(|error| {
                if error.kind() == std::io::ErrorKind::UnexpectedEof {
                    Error::from(ProtocolError::ShortRead)
                } else {
                    Error::from(error)
                }
            })?;
            self.consume_crlf().await?;
            body.extend_from_slice(&chunk);
        }
    }

    /// Discards trailer header lines (if any) up to and including the blank
    /// line that ends the chunked body. Trailer headers themselves are never
    /// exposed to callers.
    async fn discard_trailer(&mut self) -> Result<(), Error> {
        loop {
            let line = self.read_line(MAX_HEADER_BLOCK_BYTES).await?;
            if line.is_empty() {
                return Ok(());
            }
        }
    }

    /// Reads one CRLF-terminated line, excluding the terminator, up to
    /// `max_len` bytes.
    async fn read_line(&mut self, max_len: usize) -> Result<String, Error> {
        let mut bytes = Vec::new();
        loop {
            if bytes.len() >= max_len {
                return Err(Error::from(ProtocolError::MalformedChunkSize));
            }

            let byte = self.stream.read_u8().await.map_err(|error| {
                if error.kind() == std::io::ErrorKind::UnexpectedEof {
                    Error::from(ProtocolError::ShortRead)
                } else {
                    Error::from(error)
                }
            })?;

            if byte == b'\r' {
                let next = self.stream.read_u8().await?;
                if next != b'\n' {
                    return Err(Error::from(ProtocolError::MalformedChunkSize));
                }
                return Ok(String::from_utf8_lossy(&bytes).into_owned());
            }

            bytes.push(byte);
        }
    }

    async fn consume_crlf(&mut self) -> Result<(), Error> {
        let cr = self.stream.read_u8().await?;
        let lf = self.stream.read_u8().await?;
        if cr != b'\r' || lf != b'\n' {
            return Err(Error::from(ProtocolError::MalformedChunkSize));
        }
        Ok(())
    }
}
