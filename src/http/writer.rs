//! Response writer module
//!
//! [`ResponseWriter`] decorates a [`ResponseSink`] and remembers the last
//! status written through it. A writer belongs to exactly one request, so
//! nothing here is synchronized.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::HeaderMap;
use hyper::{Response, StatusCode};
use std::io;

use crate::logger;

/// Destination of a response: header map, status line and body bytes.
pub trait ResponseSink {
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Send the status line and headers
    fn write_header(&mut self, code: u16);

    /// Append body bytes, returning how many were accepted
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

/// In-memory sink that becomes a hyper response once the chain finishes.
///
/// Behaves like an HTTP/1 connection writer: the first header write wins,
/// and a body write before any header write implies `200 OK`.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status committed so far, if any
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseSink for ResponseBuffer {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, code: u16) {
        if let Some(current) = self.status {
            logger::log_warning(&format!(
                "Superfluous header write {code} (status already {})",
                current.as_u16()
            ));
            return;
        }
        self.status = Some(StatusCode::from_u16(code).unwrap_or_else(|_| {
            logger::log_warning(&format!("Invalid status code {code}, sending 500"));
            StatusCode::INTERNAL_SERVER_ERROR
        }));
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}

/// Status-tracking wrapper around a response sink.
#[derive(Debug)]
pub struct ResponseWriter<S = ResponseBuffer> {
    sink: S,
    status: u16,
}

impl<S: ResponseSink> ResponseWriter<S> {
    pub const fn new(sink: S) -> Self {
        Self { sink, status: 0 }
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.sink.headers_mut()
    }

    /// Forward the header write, then record `code`
    pub fn write_header(&mut self, code: u16) {
        self.sink.write_header(code);
        self.status = code;
    }

    /// Forward body bytes unchanged; sink failures are returned, not retried
    pub fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.write(buf)
    }

    /// Last recorded status, 0 if no header was written
    pub const fn status(&self) -> u16 {
        self.status
    }

    pub const fn written(&self) -> bool {
        self.status != 0
    }

    pub const fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_inner(self) -> S {
        self.sink
    }
}

impl<S: ResponseSink> io::Write for ResponseWriter<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink whose body writes always fail
    #[derive(Default)]
    struct BrokenPipe {
        headers: HeaderMap,
        header_writes: Vec<u16>,
    }

    impl ResponseSink for BrokenPipe {
        fn headers_mut(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }

        fn write_header(&mut self, code: u16) {
            self.header_writes.push(code);
        }

        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"))
        }
    }

    #[test]
    fn test_written_tracks_header_write() {
        let mut w = ResponseWriter::new(ResponseBuffer::new());
        assert!(!w.written());
        assert_eq!(w.status(), 0);

        w.write_header(201);
        assert!(w.written());
        assert_eq!(w.status(), 201);
        assert_eq!(w.sink().status(), Some(StatusCode::CREATED));
    }

    #[test]
    fn test_body_write_does_not_set_status() {
        let mut w = ResponseWriter::new(ResponseBuffer::new());
        assert_eq!(w.write(b"hello").unwrap(), 5);
        assert!(!w.written());
        // the buffer itself still implies 200
        assert_eq!(w.sink().status(), Some(StatusCode::OK));
    }

    #[test]
    fn test_write_error_propagates() {
        let mut w = ResponseWriter::new(BrokenPipe::default());
        w.write_header(500);
        let err = w.write(b"boom").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(w.written());
        assert_eq!(w.into_inner().header_writes, vec![500]);
    }

    #[test]
    fn test_status_overwritable_on_wrapper() {
        let mut w = ResponseWriter::new(ResponseBuffer::new());
        w.write_header(404);
        w.write_header(200);
        assert_eq!(w.status(), 200);
        // first write wins on the wire
        assert_eq!(w.sink().status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_buffer_into_response() {
        let mut w = ResponseWriter::new(ResponseBuffer::new());
        w.headers_mut()
            .insert("content-type", "text/plain".parse().unwrap());
        w.write_header(202);
        std::io::Write::write_all(&mut w, b"queued").unwrap();

        let buffer = w.into_inner();
        assert_eq!(buffer.body(), b"queued");
        let resp = buffer.into_response();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(resp.headers()["content-type"], "text/plain");
    }

    #[test]
    fn test_invalid_status_becomes_500() {
        let mut buffer = ResponseBuffer::new();
        buffer.write_header(42);
        assert_eq!(buffer.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_empty_buffer_defaults_to_200() {
        let resp = ResponseBuffer::new().into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
