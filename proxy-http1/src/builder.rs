//! Composes [`StreamReader`] and `HeaderSet` into whole [`Request`]/[`Response`]
//! values, and rewrites chunked bodies into self-describing plain ones.

use proxy_http::{Body, HeaderSet, Message, Request, Response};
use proxy_http::error::Error;
use tokio::io::AsyncBufReadExt;
use tracing::debug;

use crate::reader::{BodyMode, StreamReader};

/// Builds a whole message by reading headers then body off a stream,
/// dechunking on the fly.
pub struct DechunkedMessageBuilder<'a, R> {
    reader: StreamReader<'a, R>,
}

impl<'a, R> DechunkedMessageBuilder<'a, R>
where
    R: AsyncBufReadExt + Unpin,
{
    pub fn new(stream: &'a mut R) -> Self {
        Self {
            reader: StreamReader::new(stream),
        }
    }

    pub async fn build_request(mut self) -> Result<Request, Error> {
        let (headers, body) = self.build_message_parts().await?;
        Ok(Request::new(headers, body))
    }

    pub async fn build_response(mut self) -> Result<Response, Error> {
        let (headers, body) = self.build_message_parts().await?;
        Ok(Response::new(headers, body))
    }

    async fn build_message_parts(&mut self) -> Result<(HeaderSet, Body), Error> {
        let raw_headers = self.reader.read_headers().await?;
        let mut headers = HeaderSet::from_raw(&raw_headers);

        self.reader.body_mode = determine_body_mode(&headers);
        let was_chunked = self.reader.body_mode == BodyMode::Chunked;

        let body_bytes = self.reader.read_body().await?;

        if was_chunked {
            dechunk_headers(&mut headers, body_bytes.len());
        }

        debug!(bytes = body_bytes.len(), chunked = was_chunked, "built message body");
        Ok((headers, Body::new(body_bytes)))
    }
}

/// Chooses the body framing the same way for requests and responses:
/// `Transfer-Encoding: chunked` wins over `Content-Length`, which wins over
/// no body at all.
fn determine_body_mode(headers: &HeaderSet) -> BodyMode {
    let is_chunked = headers
        .get("transfer_encoding")
        .and_then(|values| values.first())
        .map(|value| value.eq_ignore_ascii_case("chunked"))
        .unwrap_or(false);

    if is_chunked {
        return BodyMode::Chunked;
    }

    if let Some(values) = headers.get("content_length") {
        if let Some(length) = values.first().and_then(|value| value.parse::<usize>().ok()) {
            return BodyMode::ContentLength(length);
        }
    }

    BodyMode::NoRead
}

/// After a chunked body has been read and concatenated, remove
/// `Transfer-Encoding` and set `Content-Length` to the decoded length, so the
/// message's raw form is a self-consistent plain HTTP/1.1 message.
fn dechunk_headers(headers: &mut HeaderSet, decoded_length: usize) {
    headers.delete("transfer_encoding");
    let length = decoded_length.to_string();
    if !headers.replace("content_length", vec![length.clone()]) {
        headers.insert("content_length", vec![length]);
    }
}

/// Builds a message directly from already-captured header and body bytes,
/// without touching a stream. Used to reconstruct cache hits.
pub struct RawMessageBuilder;

impl RawMessageBuilder {
    pub fn build_request(raw_headers: &[u8], raw_body: &[u8]) -> Request {
        Request::new(HeaderSet::from_raw(raw_headers), Body::new(raw_body.to_vec()))
    }

    pub fn build_response(raw_headers: &[u8], raw_body: &[u8]) -> Response {
        Response::new(HeaderSet::from_raw(raw_headers), Body::new(raw_body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn builds_request_with_content_length_body() {
        let data = b"POST /submit HTTP/1.1\r\nHost: a\r\nContent-Length: 5\r\n\r\nhello";
        let mut cursor = Cursor::new(&data[..]);
        let request = DechunkedMessageBuilder::new(&mut cursor)
            .build_request()
            .await
            .unwrap();
        assert_eq!(request.method(), "POST");
        assert_eq!(request.body().as_bytes(), b"hello");
    }

    #[tokio::test]
    async fn dechunks_response_and_rewrites_headers() {
        let data =
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n";
        let mut cursor = Cursor::new(&data[..]);
        let response = DechunkedMessageBuilder::new(&mut cursor)
            .build_response()
            .await
            .unwrap();

        assert_eq!(response.body().as_bytes(), b"Wikipedia");
        assert_eq!(response.body().size(), 9);
        assert_eq!(response.headers().get("content_length"), Some(&["9".to_string()][..]));
        assert_eq!(response.headers().get("transfer_encoding"), None);
    }

    #[tokio::test]
    async fn no_framing_header_yields_empty_body() {
        let data = b"GET / HTTP/1.1\r\nHost: a\r\n\r\n";
        let mut cursor = Cursor::new(&data[..]);
        let request = DechunkedMessageBuilder::new(&mut cursor)
            .build_request()
            .await
            .unwrap();
        assert_eq!(request.body().size(), 0);
    }

    #[test]
    fn raw_builder_reconstructs_without_touching_a_stream() {
        let response = RawMessageBuilder::build_response(
            b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n",
            b"ok",
        );
        assert_eq!(response.status_line(), "HTTP/1.1 200 OK");
        assert_eq!(response.body().as_bytes(), b"ok");
    }
}
