// Listener module
// Resolves address strings and creates TCP listeners with address reuse

use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::error::{Error, Result};

/// Resolve `host:port`, or `:port` meaning every interface.
pub async fn resolve_addr(addr: &str) -> Result<SocketAddr> {
    let addr = if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    };

    let resolved = tokio::net::lookup_host(addr.as_str())
        .await
        .map_err(|e| Error::Address(format!("{addr}: {e}")))?
        .next();
    resolved.ok_or_else(|| Error::Address(format!("{addr}: no addresses found")))
}

/// Resolve `addr` and bind a listener on it.
pub async fn bind(addr: &str) -> Result<TcpListener> {
    let socket_addr = resolve_addr(addr).await?;
    create_reusable_listener(socket_addr).map_err(|source| Error::Bind {
        addr: socket_addr,
        source,
    })
}

/// Create a `TcpListener` with `SO_REUSEADDR` (and `SO_REUSEPORT` on unix).
///
/// # Arguments
///
/// * `addr` - The socket address to bind to
///
/// # Returns
///
/// * `Ok(TcpListener)` - Successfully created and bound listener
/// * `Err(std::io::Error)` - Failed to create or bind socket
pub fn create_reusable_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    #[cfg(unix)]
    socket.set_reuse_port(true)?;

    // Allows binding to a port in TIME_WAIT state
    socket.set_reuse_address(true)?;

    // Required before handing the socket to tokio
    socket.set_nonblocking(true)?;

    socket.bind(&addr.into())?;
    socket.listen(128)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}
