//! Whole HTTP request/response values: a [`HeaderSet`] paired with a body.

use crate::header_set::HeaderSet;

/// An opaque byte buffer, as read (and, for chunked transfers, already
/// dechunked) from the wire.
#[derive(Debug, Clone, Default)]
pub struct Body(Vec<u8>);

impl Body {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn size(&self) -> usize {
        self.0.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Shared accessors for request and response messages: a header set plus a
/// body, with the header map's raw form always kept consistent with its
/// parsed contents.
pub trait Message {
    fn headers(&self) -> &HeaderSet;
    fn headers_mut(&mut self) -> &mut HeaderSet;
    fn body(&self) -> &Body;

    /// Overwrites `name`'s value list if present, no-op otherwise.
    fn replace_header(&mut self, name: &str, values: Vec<String>) -> bool {
        self.headers_mut().replace(name, values)
    }

    /// Appends to `name`'s value list, creating it if absent.
    fn set_header(&mut self, name: &str, values: Vec<String>) {
        self.headers_mut().insert(name, values);
    }

    /// The full wire form: header block followed immediately by the body.
    fn raw(&self) -> Vec<u8> {
        let mut bytes = self.headers().raw().to_vec();
        bytes.extend_from_slice(self.body().as_bytes());
        bytes
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    headers: HeaderSet,
    body: Body,
}

impl Request {
    pub fn new(headers: HeaderSet, body: Body) -> Self {
        Self { headers, body }
    }

    /// The request-line this request was parsed from (or constructed with),
    /// used verbatim as the cache key.
    pub fn request_line(&self) -> &str {
        self.headers.start_line()
    }

    /// The method token, upper-cased, taken from the first space-separated
    /// field of the request-line. Not restricted to a closed set: the proxy
    /// only ever compares this against `"GET"`.
    pub fn method(&self) -> String {
        self.request_line()
            .split(' ')
            .next()
            .unwrap_or_default()
            .to_uppercase()
    }

    /// The request-target, taken from the second space-separated field of
    /// the request-line.
    pub fn path(&self) -> Option<&str> {
        self.request_line().split(' ').nth(1)
    }

    pub fn host(&self) -> Option<&[String]> {
        self.headers.get("host")
    }
}

impl Message for Request {
    fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderSet {
        &mut self.headers
    }

    fn body(&self) -> &Body {
        &self.body
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    headers: HeaderSet,
    body: Body,
}

impl Response {
    pub fn new(headers: HeaderSet, body: Body) -> Self {
        Self { headers, body }
    }

    /// The status-line this response was parsed from.
    pub fn status_line(&self) -> &str {
        self.headers.start_line()
    }
}

impl Message for Response {
    fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderSet {
        &mut self.headers
    }

    fn body(&self) -> &Body {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_exposes_method_and_path() {
        let headers = HeaderSet::from_raw(b"GET /foo/bar HTTP/1.1\r\nHost: example.com\r\n\r\n");
        let request = Request::new(headers, Body::default());
        assert_eq!(request.method(), "GET");
        assert_eq!(request.path(), Some("/foo/bar"));
        assert_eq!(request.host(), Some(&["example.com".to_string()][..]));
    }

    #[test]
    fn method_is_uppercased_regardless_of_wire_case() {
        let headers = HeaderSet::from_raw(b"get / HTTP/1.1\r\n\r\n");
        let request = Request::new(headers, Body::default());
        assert_eq!(request.method(), "GET");
    }

    #[test]
    fn set_header_appends_replace_header_overwrites() {
        let headers = HeaderSet::from_raw(b"HTTP/1.1 200 OK\r\n\r\n");
        let mut response = Response::new(headers, Body::default());
        response.set_header("x_cached_by_proxy", vec!["MISS".to_string()]);
        assert_eq!(
            response.headers().get("x_cached_by_proxy"),
            Some(&["MISS".to_string()][..])
        );

        response.replace_header("x_cached_by_proxy", vec!["HIT".to_string()]);
        assert_eq!(
            response.headers().get("x_cached_by_proxy"),
            Some(&["HIT".to_string()][..])
        );
    }

    #[test]
    fn raw_concatenates_header_block_and_body() {
        let headers = HeaderSet::from_raw(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\n");
        let response = Response::new(headers, Body::new(b"hello".to_vec()));
        assert_eq!(response.raw(), b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello");
    }
}
