//! HTTP response building module
//!
//! Responses the framework produces without running a handler chain.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

fn plain(status: u16, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", PLAIN_TEXT)
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            Response::new(Full::new(Bytes::from_static(body.as_bytes())))
        })
}

/// Build 404 Not Found response (no route matched the path)
pub fn build_404_response() -> Response<Full<Bytes>> {
    plain(404, "404 page not found")
}

/// Build 405 Method Not Allowed response
///
/// `allowed` lists the methods registered for the requested path.
pub fn build_405_response(allowed: &[&str]) -> Response<Full<Bytes>> {
    let allow = allowed.join(", ");
    Response::builder()
        .status(405)
        .header("Content-Type", PLAIN_TEXT)
        .header("Allow", allow)
        .body(Full::new(Bytes::from_static(b"405 method not allowed")))
        .unwrap_or_else(|e| {
            log_build_error(405, &e);
            Response::new(Full::new(Bytes::from_static(b"405 method not allowed")))
        })
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    plain(413, "413 payload too large")
}

/// Build 500 response for requests whose body could not be read
pub fn build_500_response() -> Response<Full<Bytes>> {
    plain(500, "500 internal server error")
}

/// Log response build error
fn log_build_error(status: u16, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_404() {
        let resp = build_404_response();
        assert_eq!(resp.status(), 404);
        assert_eq!(resp.headers()["content-type"], PLAIN_TEXT);
    }

    #[test]
    fn test_405_allow_header() {
        let resp = build_405_response(&["GET", "POST"]);
        assert_eq!(resp.status(), 405);
        assert_eq!(resp.headers()["allow"], "GET, POST");
    }
}
