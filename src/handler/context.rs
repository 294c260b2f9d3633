//! Per-request context and handler chain execution

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Request, Response};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::http::{ResponseBuffer, ResponseWriter};
use crate::routing::Params;

/// A unit of work in a handler chain.
pub type HandlerFunc = Arc<dyn Fn(&mut Context) + Send + Sync>;

/// Wrap a closure or function as a [`HandlerFunc`].
pub fn handler<F>(f: F) -> HandlerFunc
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A non-fatal problem recorded by a handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    #[serde(rename = "msg")]
    pub message: String,
    pub meta: Option<serde_json::Value>,
}

/// Cursor value before the first handler has run
const BEFORE_START: isize = -1;

/// State of one request while its handler chain runs.
///
/// A context is created per request and owned by the task serving it.
pub struct Context {
    pub request: Request<Bytes>,
    pub writer: ResponseWriter<ResponseBuffer>,
    pub params: Params,
    errors: Vec<ErrorRecord>,
    handlers: Arc<[HandlerFunc]>,
    index: isize,
    aborted: bool,
    full_path: String,
}

impl Context {
    pub fn new(request: Request<Bytes>, params: Params, handlers: Arc<[HandlerFunc]>) -> Self {
        Self {
            request,
            writer: ResponseWriter::new(ResponseBuffer::new()),
            params,
            errors: Vec::new(),
            handlers,
            index: BEFORE_START,
            aborted: false,
            full_path: String::new(),
        }
    }

    /// Record the route pattern this context was dispatched through
    #[must_use]
    pub fn with_full_path(mut self, pattern: impl Into<String>) -> Self {
        self.full_path = pattern.into();
        self
    }

    /// Run the handlers after the current one.
    ///
    /// The dispatcher calls this once to start the chain, which then runs to
    /// the end. A handler may call it to run everything downstream before its
    /// own remaining code; the outer loop then finds the cursor at the end
    /// and stops, so no handler ever runs twice.
    pub fn next(&mut self) {
        self.advance();
        while let Some(current) = self.current() {
            current(self);
            self.advance();
        }
    }

    /// Skip every handler after the current one.
    pub fn abort(&mut self) {
        self.index = self.chain_len();
        self.aborted = true;
    }

    /// Abort the chain and send `code` as the response status.
    pub fn abort_with_status(&mut self, code: u16) {
        self.abort();
        self.writer.write_header(code);
    }

    pub const fn is_aborted(&self) -> bool {
        self.aborted
    }

    fn chain_len(&self) -> isize {
        isize::try_from(self.handlers.len()).unwrap_or(isize::MAX)
    }

    fn advance(&mut self) {
        self.index = (self.index + 1).min(self.chain_len());
    }

    fn current(&self) -> Option<HandlerFunc> {
        let i = usize::try_from(self.index).ok()?;
        self.handlers.get(i).cloned()
    }

    /// Position of the handler currently running, -1 before the chain starts
    #[cfg(test)]
    const fn index(&self) -> isize {
        self.index
    }

    /// Append an error; the chain keeps running.
    pub fn add_error(&mut self, message: impl Into<String>, meta: Option<serde_json::Value>) {
        self.errors.push(ErrorRecord {
            message: message.into(),
            meta,
        });
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn last_error(&self) -> Option<&ErrorRecord> {
        self.errors.last()
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Route pattern that matched, e.g. `/users/{id}`
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    /// Peer address, when the request came through the network listener
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.request.extensions().get::<SocketAddr>().copied()
    }

    /// Write `code` with a `text/plain` body
    pub fn string(&mut self, code: u16, body: &str) {
        self.respond(code, "text/plain", body.as_bytes());
    }

    /// Write `code` with `value` serialized as JSON.
    ///
    /// A value that fails to serialize is recorded as an error and answered
    /// with a 500.
    pub fn json<T: Serialize + ?Sized>(&mut self, code: u16, value: &T) {
        match serde_json::to_vec(value) {
            Ok(body) => self.respond(code, "application/json", &body),
            Err(e) => {
                self.add_error(format!("json serialization failed: {e}"), None);
                self.string(500, "500 internal server error");
            }
        }
    }

    fn respond(&mut self, code: u16, content_type: &'static str, body: &[u8]) {
        self.writer
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.writer.write_header(code);
        if let Err(e) = self.writer.write(body) {
            self.add_error(format!("response write failed: {e}"), None);
        }
    }

    /// Consume the context, yielding whatever the chain wrote
    pub fn into_response(self) -> Response<Full<Bytes>> {
        self.writer.into_inner().into_response()
    }
}
