// ABOUTME: Container runtime detection on the local host.
// ABOUTME: Honors explicit overrides, then DOCKER_HOST, then probes Podman and Docker sockets.

use super::types::{DetectedRuntime, RuntimeConfig, RuntimeType};
use std::path::Path;

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked Podman and Docker sockets)")]
    NoRuntimeFound,

    #[error("configured runtime socket does not exist: {0}")]
    SocketMissing(String),
}

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Detect the container runtime on this host.
///
/// Detection order:
/// 1. Explicit `runtime`/`socket` in `config`
/// 2. `DOCKER_HOST` when it is a `unix://` URL
/// 3. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 4. Rootful Podman socket (`/run/podman/podman.sock`)
/// 5. Docker socket (`/var/run/docker.sock`)
pub fn detect_local(config: &RuntimeConfig) -> Result<DetectedRuntime, DetectionError> {
    detect_with(config, get_uid().as_deref(), |path| Path::new(path).exists())
}

fn detect_with(
    config: &RuntimeConfig,
    uid: Option<&str>,
    exists: impl Fn(&str) -> bool,
) -> Result<DetectedRuntime, DetectionError> {
    if config.runtime.is_some() || config.socket.is_some() {
        let runtime_type = config.runtime.unwrap_or(RuntimeType::Docker);
        let socket_path = config
            .socket
            .clone()
            .unwrap_or_else(|| default_socket_path(runtime_type));
        if !exists(&socket_path) {
            return Err(DetectionError::SocketMissing(socket_path));
        }
        return Ok(DetectedRuntime {
            runtime_type,
            socket_path,
        });
    }

    if let Some(socket_path) = config
        .docker_host
        .as_deref()
        .and_then(|host| host.strip_prefix("unix://"))
        && exists(socket_path)
    {
        let runtime_type = if socket_path.contains("podman") {
            RuntimeType::Podman
        } else {
            RuntimeType::Docker
        };
        return Ok(DetectedRuntime {
            runtime_type,
            socket_path: socket_path.to_string(),
        });
    }

    if let Some(uid) = uid {
        let rootless_socket = format!("/run/user/{}/podman/podman.sock", uid);
        if exists(&rootless_socket) {
            return Ok(DetectedRuntime {
                runtime_type: RuntimeType::Podman,
                socket_path: rootless_socket,
            });
        }
    }

    if exists(ROOTFUL_PODMAN) {
        return Ok(DetectedRuntime {
            runtime_type: RuntimeType::Podman,
            socket_path: ROOTFUL_PODMAN.to_string(),
        });
    }

    if exists(DOCKER_SOCKET) {
        return Ok(DetectedRuntime {
            runtime_type: RuntimeType::Docker,
            socket_path: DOCKER_SOCKET.to_string(),
        });
    }

    Err(DetectionError::NoRuntimeFound)
}

fn get_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        // Fall back to reading /proc/self/status
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}

fn default_socket_path(runtime: RuntimeType) -> String {
    match runtime {
        RuntimeType::Docker => DOCKER_SOCKET.to_string(),
        RuntimeType::Podman => ROOTFUL_PODMAN.to_string(),
    }
}
