//! Buffered response writer.
//!
//! Handlers write into a [`ResponseWriter`] owned by the request's
//! [`Context`](crate::Context). Nothing touches the socket until the chain
//! has returned; the server then turns the buffer into one hyper response.
//!
//! The writer follows the usual header-commit rules:
//!
//! - headers may be changed freely until the status is written;
//! - [`write_header`](ResponseWriter::write_header) commits status and
//!   headers, later calls are ignored;
//! - [`write`](ResponseWriter::write) commits `200 OK` if nothing was
//!   committed yet, then appends to the body.

use std::io;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{HeaderMap, StatusCode};
use tracing::warn;

/// The per-request response buffer.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    header: HeaderMap,
    committed: Option<(StatusCode, HeaderMap)>,
    body: Vec<u8>,
}

impl ResponseWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Pending headers. Changes made after the status was written do not
    /// reach the client.
    pub fn header(&self) -> &HeaderMap {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut HeaderMap {
        &mut self.header
    }

    /// Commits the status line and a snapshot of the current headers.
    pub fn write_header(&mut self, code: u16) {
        if let Some((status, _)) = &self.committed {
            warn!(committed = status.as_u16(), ignored = code, "superfluous write_header call");
            return;
        }
        let status = StatusCode::from_u16(code).unwrap_or_else(|_| {
            warn!(code, "invalid status code, sending 500");
            StatusCode::INTERNAL_SERVER_ERROR
        });
        self.committed = Some((status, self.header.clone()));
    }

    /// Appends to the body, committing `200 OK` first if needed.
    pub fn write(&mut self, data: &[u8]) {
        if self.committed.is_none() {
            self.write_header(200);
        }
        self.body.extend_from_slice(data);
    }

    /// Replies with a plain-text error: sets the content type, writes
    /// `code` and appends `message` followed by a newline.
    pub fn error(&mut self, code: u16, message: &str) {
        self.header.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        self.header.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
        self.write_header(code);
        self.write(message.as_bytes());
        self.write(b"\n");
    }

    /// Whether status and headers have been committed.
    pub fn written(&self) -> bool {
        self.committed.is_some()
    }

    /// The committed status, or 200 when nothing was written.
    pub fn status(&self) -> u16 {
        self.committed.as_ref().map_or(200, |(status, _)| status.as_u16())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Converts the buffer into an outgoing response.
    pub(crate) fn finish(self) -> http::Response<Bytes> {
        let (status, headers) = self.committed.unwrap_or((StatusCode::OK, self.header));
        let mut res = http::Response::new(Bytes::from(self.body));
        *res.status_mut() = status;
        *res.headers_mut() = headers;
        res
    }
}

/// Lets encoders such as `serde_json::to_writer` stream into the body.
impl io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ResponseWriter::write(self, buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_commits_200_once() {
        let mut w = ResponseWriter::new();
        w.write(b"hi");
        w.write_header(404);
        let res = w.finish();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body().as_ref(), b"hi");
    }

    #[test]
    fn headers_after_commit_are_not_sent() {
        let mut w = ResponseWriter::new();
        w.header_mut().insert("x-before", HeaderValue::from_static("1"));
        w.write_header(201);
        w.header_mut().insert("x-after", HeaderValue::from_static("1"));
        let res = w.finish();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert!(res.headers().contains_key("x-before"));
        assert!(!res.headers().contains_key("x-after"));
    }

    #[test]
    fn untouched_writer_sends_empty_200() {
        let res = ResponseWriter::new().finish();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.body().is_empty());
    }

    #[test]
    fn invalid_status_code_becomes_500() {
        let mut w = ResponseWriter::new();
        w.write_header(42);
        assert_eq!(w.status(), 500);
    }
}
