// ABOUTME: Local Docker engine detection.
// ABOUTME: Checks DOCKER_HOST first, then well-known socket paths.

use std::path::Path;

/// Error during engine detection or connection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container engine found (checked DOCKER_HOST and Docker sockets)")]
    NoEngineFound,

    #[error("unsupported DOCKER_HOST (only unix:// is supported): {0}")]
    UnsupportedHost(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),
}

/// A detected engine endpoint.
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub socket_path: String,
}

/// Detect the Docker engine on the local system.
///
/// Detection order:
/// 1. `DOCKER_HOST` (unix:// schemes only)
/// 2. Docker socket (`/var/run/docker.sock`)
/// 3. Rootless Docker socket (`/run/user/$UID/docker.sock`)
pub fn detect_engine() -> Result<EngineInfo, DetectionError> {
    if let Ok(host) = std::env::var("DOCKER_HOST")
        && !host.is_empty()
    {
        return match host.strip_prefix("unix://") {
            Some(path) => Ok(EngineInfo {
                socket_path: path.to_string(),
            }),
            None => Err(DetectionError::UnsupportedHost(host)),
        };
    }

    if Path::new(DOCKER_SOCKET).exists() {
        return Ok(EngineInfo {
            socket_path: DOCKER_SOCKET.to_string(),
        });
    }

    if let Some(uid) = get_uid() {
        let rootless_socket = format!("/run/user/{}/docker.sock", uid);
        if Path::new(&rootless_socket).exists() {
            return Ok(EngineInfo {
                socket_path: rootless_socket,
            });
        }
    }

    Err(DetectionError::NoEngineFound)
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

const DOCKER_SOCKET: &str = "/var/run/docker.sock";
