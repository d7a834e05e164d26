// ABOUTME: Bare TCP reachability probe.
// ABOUTME: Any connect error, DNS failure, or timeout reads as unreachable.

use std::time::Duration;
use tokio::net::TcpStream;

/// Whether `host:port` accepts a TCP connection within `timeout`.
pub async fn is_reachable(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            tracing::trace!("connect to {}:{} failed: {}", host, port, e);
            false
        }
        Err(_elapsed) => {
            tracing::trace!("connect to {}:{} timed out", host, port);
            false
        }
    }
}
