// Server loop module
// Accepts connections until shutdown or a fatal listener error

use std::future::Future;
use std::io;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::logger;

/// Accept errors that concern a single connection rather than the listener
fn is_connection_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

/// Serve `listener` with `engine` until `shutdown` resolves.
///
/// Per-connection accept failures are logged and skipped; any other accept
/// failure ends the loop with [`Error::Accept`]. Connections already
/// accepted keep running in their own tasks.
pub async fn serve<F>(engine: Arc<Engine>, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let local_addr = listener.local_addr()?;
    logger::log_server_start(&local_addr, engine.config());

    let active_connections = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &engine, &active_connections);
                    }
                    Err(e) if is_connection_error(&e) => {
                        logger::log_warning(&format!("Failed to accept connection: {e}"));
                    }
                    Err(e) => {
                        logger::log_error(&format!("Listener on {local_addr} failed: {e}"));
                        return Err(Error::Accept(e));
                    }
                }
            }

            () = &mut shutdown => {
                logger::log_server_stop(&local_addr);
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn roundtrip(addr: std::net::SocketAddr, raw: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        // keep whatever arrived even if the peer resets after responding
        let mut out = Vec::new();
        let mut buf = [0u8; 1024];
        while let Ok(n) = stream.read(&mut buf).await {
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_over_tcp() {
        let mut engine = Engine::new();
        engine
            .get("/ping", [handler(|c| c.string(200, "pong"))])
            .unwrap()
            .post("/echo", [handler(|c| {
                let body = String::from_utf8_lossy(c.request.body()).into_owned();
                c.string(200, &body);
            })])
            .unwrap();

        let listener = crate::server::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(engine.run_until(listener, async {
            let _ = stop_rx.await;
        }));

        let ping = roundtrip(
            addr,
            "GET /ping HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(ping.starts_with("HTTP/1.1 200 OK\r\n"), "{ping}");
        assert!(ping.to_ascii_lowercase().contains("content-type: text/plain\r\n"));
        assert!(ping.to_ascii_lowercase().contains("server: tinygin\r\n"));
        assert!(ping.ends_with("\r\n\r\npong"));

        let echo = roundtrip(
            addr,
            "POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        )
        .await;
        assert!(echo.ends_with("\r\n\r\nhello"), "{echo}");

        let missing = roundtrip(
            addr,
            "GET /missing HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(missing.starts_with("HTTP/1.1 404 "), "{missing}");

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mut config = crate::config::Config::default();
        config.http.max_body_size = 4;
        config.logging.access_log = false;
        let mut engine = Engine::with_config(config);
        engine.post("/upload", [handler(|c| c.string(200, "stored"))]).unwrap();

        let listener = crate::server::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(engine.run_until(listener, async {
            let _ = stop_rx.await;
        }));

        let resp = roundtrip(
            addr,
            "POST /upload HTTP/1.1\r\nHost: localhost\r\nContent-Length: 10\r\nConnection: close\r\n\r\n0123456789",
        )
        .await;
        assert!(resp.starts_with("HTTP/1.1 413 "), "{resp}");

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[test]
    fn test_connection_errors_are_not_fatal() {
        assert!(is_connection_error(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(!is_connection_error(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }
}
