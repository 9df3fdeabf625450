//! Top-level error taxonomy for a single connection's lifetime.
//!
//! Every variant here causes the same user-visible outcome (the client
//! connection is closed without a reply); the split exists so the log line
//! at the handler boundary can say *why*.

use std::io;

use proxy_http::Error as MessageError;

/// Failure to connect to or read/write from the origin server.
#[derive(Debug)]
pub struct OriginError(pub io::Error);

impl From<io::Error> for OriginError {
    fn from(error: io::Error) -> Self {
        Self(error)
    }
}

/// Failure to write the response back to the client.
#[derive(Debug)]
pub struct ClientWriteError(pub io::Error);

impl From<io::Error> for ClientWriteError {
    fn from(error: io::Error) -> Self {
        Self(error)
    }
}

/// Everything that can go wrong while handling one connection.
#[derive(Debug)]
pub enum HandlerError {
    /// Malformed client request or origin response (see [`MessageError`]).
    Protocol(MessageError),
    Origin(OriginError),
    ClientWrite(ClientWriteError),
}

impl From<MessageError> for HandlerError {
    fn from(error: MessageError) -> Self {
        Self::Protocol(error)
    }
}

impl From<OriginError> for HandlerError {
    fn from(error: OriginError) -> Self {
        Self::Origin(error)
    }
}

impl From<ClientWriteError> for HandlerError {
    fn from(error: ClientWriteError) -> Self {
        Self::ClientWrite(error)
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerError::Protocol(error) => write!(f, "protocol error: {error}"),
            HandlerError::Origin(OriginError(error)) => write!(f, "origin error: {error}"),
            HandlerError::ClientWrite(ClientWriteError(error)) => {
                write!(f, "client write error: {error}")
            }
        }
    }
}

impl std::error::Error for HandlerError {}
