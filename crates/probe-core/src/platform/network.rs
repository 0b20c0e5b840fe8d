//! Local port checks.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{lookup_host, TcpStream};
use tracing::debug;

/// Check whether anything accepts TCP connections at `addr` (`host:port`).
///
/// Each resolved address gets its own `timeout`. Unresolvable addresses count
/// as not accepting.
pub async fn is_accepting(addr: &str, timeout: Duration) -> bool {
    let resolved: Vec<SocketAddr> = match lookup_host(addr).await {
        Ok(addrs) => addrs.collect(),
        Err(e) => {
            debug!("Could not resolve {}: {}", addr, e);
            return false;
        }
    };

    for sock in resolved {
        match tokio::time::timeout(timeout, TcpStream::connect(sock)).await {
            Ok(Ok(_)) => return true,
            Ok(Err(e)) => debug!("{} not accepting: {}", sock, e),
            Err(_) => debug!("Connect to {} timed out", sock),
        }
    }
    false
}

/// Map a wildcard bind host to an address a client can connect to.
pub fn connectable_host(bind_host: &str) -> &str {
    match bind_host {
        "0.0.0.0" | "" => "127.0.0.1",
        "::" | "[::]" => "[::1]",
        other => other,
    }
}
