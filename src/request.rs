//! Incoming HTTP request type.

use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use percent_encoding::percent_decode_str;

/// An incoming HTTP request with its body fully read.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    /// `uri.path()`, percent-decoded.
    path: String,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
}

impl Request {
    pub fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            path: decode_path(parts.uri.path()),
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            remote_addr: None,
        }
    }

    pub(crate) fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    /// The decoded request path; routing and groups match against this.
    /// The raw form stays available through [`uri`](Request::uri).
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// Case-insensitive header lookup. Values that are not visible ASCII are
    /// treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Invalid UTF-8 after decoding is replaced rather than rejected.
fn decode_path(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> Request {
        http::Request::get(uri).body(Bytes::new()).unwrap().into()
    }

    #[test]
    fn path_is_percent_decoded() {
        let req = request("/hello/john%20doe?q=a%20b");
        assert_eq!(req.path(), "/hello/john doe");
        assert_eq!(req.uri().path(), "/hello/john%20doe");
        assert_eq!(req.query(), Some("q=a%20b"));
    }

    #[test]
    fn utf8_sequences_decode_to_text() {
        assert_eq!(request("/caf%C3%A9").path(), "/café");
        assert_eq!(request("/bad%FF").path(), "/bad\u{FFFD}");
    }
}
