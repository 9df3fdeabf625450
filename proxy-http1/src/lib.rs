//! HTTP/1.1 byte-level stream reading and message building.

pub mod builder;
pub mod reader;

pub use builder::{DechunkedMessageBuilder, RawMessageBuilder};
pub use reader::{BodyMode, StreamReader};
