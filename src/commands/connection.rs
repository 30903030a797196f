// ABOUTME: Shared helpers for connecting to the container engine and platform.
// ABOUTME: Eliminates duplication across deploy, status, and rollback commands.

use ekdosi::config::PlatformConfig;
use ekdosi::engine::{DockerEngine, detect_engine};
use ekdosi::error::{Error, Result};
use ekdosi::output::Output;
use ekdosi::platform::HttpPlatform;

/// Connect to the local container engine.
///
/// This handles the common pattern of:
/// 1. Detecting the socket path
/// 2. Outputting progress messages
/// 3. Verifying the daemon answers a ping
pub async fn connect_engine(output: &Output) -> Result<DockerEngine> {
    output.progress("  → Detecting container engine...");
    let info = detect_engine().map_err(|e| Error::Engine(e.to_string()))?;

    output.progress(&format!("  → Found engine at {}", info.socket_path));

    let engine = DockerEngine::connect(&info).map_err(|e| Error::Engine(e.to_string()))?;
    engine
        .ping()
        .await
        .map_err(|e| Error::Engine(e.to_string()))?;

    Ok(engine)
}

/// Build the platform client from config, resolving the API token.
pub fn connect_platform(platform: &PlatformConfig) -> Result<HttpPlatform> {
    let token = match &platform.token {
        Some(value) => Some(value.resolve()?),
        None => None,
    };
    Ok(HttpPlatform::new(&platform.endpoint, token)?)
}
