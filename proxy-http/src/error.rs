use std::io;

/// An error that can occur while parsing or reframing an HTTP/1.1 message.
#[derive(Debug)]
pub enum ProtocolError {
    /// The stream ended before a blank line (`\r\n\r\n`) terminated the header block.
    HeaderBlockIncomplete,

    /// The header block exceeded the implementation's maximum size before a
    /// terminator was seen.
    HeaderBlockTooLarge,

    /// A chunk size line could not be parsed as a hexadecimal integer.
    ///
    /// ## Example
    /// ```text
    /// ZZZ\r\n
    /// ```
    MalformedChunkSize,

    /// The `Content-Length` header value was not a non-negative base-10 integer.
    InvalidContentLength,

    /// Fewer bytes were available on the stream than `Content-Length` declared.
    ShortRead,
}

/// Top-level error for the message pipeline: either a protocol-level parse
/// failure or an I/O failure from the underlying stream.
#[derive(Debug)]
pub enum Error {
    Protocol(ProtocolError),
    Io(io::Error),
}

impl From<ProtocolError> for Error {
    fn from(error: ProtocolError) -> Self {
        Error::Protocol(error)
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(error)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Protocol(ProtocolError::HeaderBlockIncomplete) => {
                write!(f, "stream ended before header block was terminated")
            }
            Error::Protocol(ProtocolError::HeaderBlockTooLarge) => {
                write!(f, "header block exceeded the maximum allowed size")
            }
            Error::Protocol(ProtocolError::MalformedChunkSize) => {
                write!(f, "malformed chunk size line")
            }
            Error::Protocol(ProtocolError::InvalidContentLength) => {
                write!(f, "invalid Content-Length value")
            }
            Error::Protocol(ProtocolError::ShortRead) => {
                write!(f, "stream ended before the declared body length was read")
            }
            Error::Io(error) => write!(f, "i/o error: {error}"),
        }
    }
}

impl std::error::Error for Error {}
