// Connection module
// Serves one accepted TCP connection over HTTP/1 and feeds requests to the engine

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_LENGTH, SERVER};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::engine::Engine;
use crate::http;
use crate::logger::{self, AccessLogEntry};

/// Accept a connection unless the configured limit is reached.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `engine` - Engine whose routes serve the requests
/// * `conn_counter` - Active connection counter
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    engine: &Arc<Engine>,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = engine.config().performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    if engine.config().logging.access_log && engine.config().is_debug() {
        logger::log_connection_accepted(&peer_addr);
    }

    handle_connection(stream, peer_addr, Arc::clone(engine), Arc::clone(conn_counter));
}

/// Serve a single connection in a spawned task.
///
/// The connection as a whole is bounded by the larger of the read and write
/// timeouts; the counter is decremented when it ends.
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    engine: Arc<Engine>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let performance = &engine.config().performance;
        let timeout_duration = Duration::from_secs(std::cmp::max(
            performance.read_timeout,
            performance.write_timeout,
        ));

        let mut builder = http1::Builder::new();
        builder.keep_alive(performance.keep_alive_timeout > 0);

        let service_engine = Arc::clone(&engine);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| dispatch(req, Arc::clone(&service_engine), peer_addr)),
        );

        if timeout_duration.is_zero() {
            if let Err(err) = conn.await {
                logger::log_connection_error(&err);
            }
        } else {
            match tokio::time::timeout(timeout_duration, conn).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => logger::log_connection_error(&err),
                Err(_) => logger::log_warning(&format!(
                    "Connection from {peer_addr} timed out after {} seconds",
                    timeout_duration.as_secs()
                )),
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Collect the body, run the engine and write the access log line.
async fn dispatch(
    req: Request<Incoming>,
    engine: Arc<Engine>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let config = engine.config();
    let (mut parts, body) = req.into_parts();
    let mut entry = config
        .logging
        .access_log
        .then(|| AccessLogEntry::from_request(&parts, Some(peer_addr)));

    let mut response = match read_body(body, &parts, config.http.max_body_size).await {
        Ok(bytes) => {
            parts.extensions.insert(peer_addr);
            engine.serve(Request::from_parts(parts, bytes))
        }
        Err(resp) => resp,
    };

    if !config.http.server_name.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&config.http.server_name) {
            response.headers_mut().entry(SERVER).or_insert(value);
        }
    }

    if let Some(entry) = entry.as_mut() {
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.elapsed = started.elapsed();
        logger::log_access(entry, &config.logging.access_log_format);
    }

    Ok(response)
}

/// Read the whole request body, refusing anything over `max_body_size`.
async fn read_body(
    body: Incoming,
    parts: &hyper::http::request::Parts,
    max_body_size: u64,
) -> Result<Bytes, Response<Full<Bytes>>> {
    let declared = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|size| size > max_body_size) {
        logger::log_error(&format!(
            "Request body too large: {} bytes (max: {max_body_size})",
            declared.unwrap_or_default()
        ));
        return Err(http::build_413_response());
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_error(&format!("Request body exceeded {max_body_size} bytes"));
            Err(http::build_413_response())
        }
        Err(e) => {
            logger::log_error(&format!("Failed to read request body: {e}"));
            Err(http::build_500_response())
        }
    }
}
