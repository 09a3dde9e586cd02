//! Per-request state and the middleware chain cursor.
//!
//! # The chain
//!
//! A request's chain is every matching group middleware followed by the
//! route handler (or the 404 handler). [`Context::next`] runs it:
//!
//! ```text
//! logger ──▶ auth ──▶ route handler
//!   │ before   │ before     │
//!   │          │            ▼
//!   │          ◀── after ───┘
//!   ◀── after ─┘
//! ```
//!
//! A handler that never calls `next` is still followed by the rest of the
//! chain: the loop in the frame that called it moves on. Calling
//! [`fail`](Context::fail) or [`abort`](Context::abort) moves the cursor past
//! the end, so nothing after the current handler runs.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{error, warn};

use crate::binding::{self, Binding};
use crate::error::BindError;
use crate::handler::HandlerFunc;
use crate::request::Request;
use crate::response::ResponseWriter;

type Keys = HashMap<String, Arc<dyn Any + Send + Sync>>;

/// Everything a handler knows about the request it is serving.
///
/// Created by the engine for each request and dropped once the chain
/// returns. Never shared between requests.
pub struct Context {
    req: Request,
    /// The response being built.
    pub writer: ResponseWriter,
    path: String,
    method: http::Method,
    pub(crate) params: HashMap<String, String>,
    status_code: u16,
    pub(crate) handlers: Vec<HandlerFunc>,
    index: isize,
    keys: RwLock<Keys>,
}

impl Context {
    pub(crate) fn new(req: Request) -> Self {
        Self {
            path: req.path().to_owned(),
            method: req.method().clone(),
            req,
            writer: ResponseWriter::new(),
            params: HashMap::new(),
            status_code: 0,
            handlers: Vec::new(),
            index: -1,
            keys: RwLock::new(HashMap::new()),
        }
    }

    // ── Chain ─────────────────────────────────────────────────────────────────

    /// Runs the remaining handlers of the chain.
    ///
    /// Call it from a middleware to run everything downstream, then continue
    /// with post-processing once it returns.
    pub fn next(&mut self) {
        self.index += 1;
        while let Some(handler) = self.current() {
            handler(self);
            self.index += 1;
        }
    }

    fn current(&self) -> Option<HandlerFunc> {
        let index = usize::try_from(self.index).ok()?;
        self.handlers.get(index).map(Arc::clone)
    }

    /// Stops the chain after the current handler without writing anything.
    pub fn abort(&mut self) {
        self.index = self.handlers.len() as isize;
    }

    pub fn is_aborted(&self) -> bool {
        self.index >= self.handlers.len() as isize
    }

    /// Stops the chain and replies with `{"message": err}`.
    pub fn fail(&mut self, code: u16, err: impl Into<String>) {
        self.abort();
        self.json(code, &serde_json::json!({ "message": err.into() }));
    }

    // ── Request ───────────────────────────────────────────────────────────────

    pub fn request(&self) -> &Request {
        &self.req
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &http::Method {
        &self.method
    }

    /// A parameter captured by the matched route, e.g. `id` for `/users/:id`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// First value of `key` in the URL query string, percent-decoded.
    pub fn query(&self, key: &str) -> Option<String> {
        let query = self.req.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// First value of `key` in the form body or, failing that, the query.
    pub fn post_form(&self, key: &str) -> Option<String> {
        let values = binding::form_values(&self.req).ok()?;
        values.get(key)?.first().cloned()
    }

    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.req.header(key)
    }

    /// The request's media type, without parameters such as `charset`.
    pub fn content_type(&self) -> &str {
        filter_flags(self.get_header("content-type").unwrap_or(""))
    }

    /// Decodes the request with the binder picked from its content type.
    pub fn bind<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        binding::default_binding(self.content_type()).bind(&self.req)
    }

    pub fn bind_with<T: DeserializeOwned>(&self, binding: impl Binding) -> Result<T, BindError> {
        binding.bind(&self.req)
    }

    // ── Response ──────────────────────────────────────────────────────────────

    /// The last status set through [`status`](Context::status), 0 if none.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn status(&mut self, code: u16) {
        self.status_code = code;
        self.writer.write_header(code);
    }

    /// Sets a response header. Invalid names or values are dropped with a
    /// warning.
    pub fn set_header(&mut self, key: &str, value: &str) {
        match (HeaderName::try_from(key), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.writer.header_mut().insert(name, value);
            }
            _ => warn!(key, "dropping invalid response header"),
        }
    }

    /// Replies with `text/plain`. Pass `format_args!` for formatted bodies.
    pub fn string(&mut self, code: u16, body: impl fmt::Display) {
        self.set_header("content-type", "text/plain");
        self.status(code);
        self.writer.write(body.to_string().as_bytes());
    }

    /// Replies with `obj` encoded as newline-terminated JSON.
    ///
    /// If `obj` cannot be encoded the client gets a plain-text 500 instead.
    pub fn json<T: Serialize + ?Sized>(&mut self, code: u16, obj: &T) {
        match serde_json::to_vec(obj) {
            Ok(mut body) => {
                body.push(b'\n');
                self.writer
                    .header_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                self.status(code);
                self.writer.write(&body);
            }
            Err(e) => {
                error!(path = %self.path, "json encoding failed: {e}");
                self.status_code = 500;
                self.writer.error(500, &e.to_string());
            }
        }
    }

    pub fn data(&mut self, code: u16, data: &[u8]) {
        self.status(code);
        self.writer.write(data);
    }

    pub fn html(&mut self, code: u16, html: impl fmt::Display) {
        self.set_header("content-type", "text/html");
        self.status(code);
        self.writer.write(html.to_string().as_bytes());
    }

    // ── Key/value store ───────────────────────────────────────────────────────

    /// Stores a value for the rest of this request.
    ///
    /// Takes `&self`: the store has its own lock, so threads spawned by a
    /// handler may share the context by reference.
    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.keys.write().insert(key.into(), Arc::new(value));
    }

    /// Returns the value stored under `key` if it exists and is a `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.keys.read().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Like [`get`](Context::get), but a missing key is a programming error.
    ///
    /// # Panics
    ///
    /// Panics if `key` is absent or holds another type.
    pub fn must_get<T: Any + Send + Sync>(&self, key: &str) -> Arc<T> {
        match self.get(key) {
            Some(value) => value,
            None => panic!("key \"{key}\" does not exist"),
        }
    }

    pub(crate) fn finish(self) -> http::Response<bytes::Bytes> {
        self.writer.finish()
    }
}

/// Cuts a header value at the first `;` or space.
fn filter_flags(content: &str) -> &str {
    content
        .find([';', ' '])
        .map_or(content, |end| &content[..end])
}
