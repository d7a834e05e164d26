// ABOUTME: Minimal HTTP/1.1 GET used for health endpoints.
// ABOUTME: Speaks hyper directly over a TcpStream; the whole exchange is time-bounded.

use bytes::Bytes;
use http_body_util::Empty;
use hyper::StatusCode;
use hyper_util::rt::TokioIo;
use std::time::Duration;
use tokio::net::TcpStream;

/// Failure to obtain a status code from a health endpoint.
#[derive(Debug, thiserror::Error)]
pub enum HttpProbeError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("HTTP exchange failed: {0}")]
    Exchange(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Send `GET path` to `host:port` and return the response status.
pub async fn get_status(
    host: &str,
    port: u16,
    path: &str,
    timeout: Duration,
) -> Result<StatusCode, HttpProbeError> {
    tokio::time::timeout(timeout, exchange(host, port, path))
        .await
        .map_err(|_| HttpProbeError::Timeout(timeout))?
}

async fn exchange(host: &str, port: u16, path: &str) -> Result<StatusCode, HttpProbeError> {
    let stream = TcpStream::connect((host, port))
        .await
        .map_err(|e| HttpProbeError::Connect(e.to_string()))?;

    let io = TokioIo::new(stream);

    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| HttpProbeError::Exchange(format!("handshake: {}", e)))?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!("health check connection error: {}", e);
        }
    });

    let req = hyper::Request::builder()
        .method("GET")
        .uri(path)
        .header("Host", format!("{}:{}", host, port))
        .body(Empty::<Bytes>::new())
        .map_err(|e| HttpProbeError::Exchange(format!("failed to build request: {}", e)))?;

    let resp = sender
        .send_request(req)
        .await
        .map_err(|e| HttpProbeError::Exchange(format!("request failed: {}", e)))?;

    Ok(resp.status())
}
