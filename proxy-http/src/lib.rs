//! Header-set and message types shared by every HTTP version this proxy
//! speaks (currently only HTTP/1.1, but kept separate from the byte-level
//! reader so a future version could reuse the same model).

pub mod error;
pub mod header_set;
pub mod message;

pub use error::{Error, ProtocolError};
pub use header_set::HeaderSet;
pub use message::{Body, Message, Request, Response};
