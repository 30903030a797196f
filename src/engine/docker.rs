// ABOUTME: Bollard-based Docker engine implementation.
// ABOUTME: Builds, tags, and pushes images over the local Docker socket.

use super::build::{BuildEngineError, BuildOps};
use super::detection::{DetectionError, EngineInfo};
use super::push::{PushError, PushOps, RegistryAuth};
use crate::types::{DigestId, ImageRef};
use async_trait::async_trait;
use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::query_parameters::{BuildImageOptions, PushImageOptions, TagImageOptions};
use bytes::Bytes;
use futures::StreamExt;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_build_error(e: bollard::errors::Error) -> BuildEngineError {
    match &e {
        bollard::errors::Error::DockerResponseServerError { message, .. } => {
            BuildEngineError::Failed(message.clone())
        }
        _ => BuildEngineError::Engine(e.to_string()),
    }
}

fn map_tag_error(e: bollard::errors::Error) -> BuildEngineError {
    BuildEngineError::Engine(e.to_string())
}

fn map_push_error(e: bollard::errors::Error) -> PushError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 401 || *status_code == 403 => PushError::Auth(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code >= 500 => PushError::Transport(message.clone()),
        bollard::errors::Error::DockerResponseServerError { message, .. } => {
            PushError::Rejected(message.clone())
        }
        _ => PushError::Transport(e.to_string()),
    }
}

/// The daemon reports push failures in-band on the progress stream, so the
/// HTTP status is long gone. Classify by message content.
fn classify_push_stream_error(message: &str) -> PushError {
    let lower = message.to_lowercase();
    if lower.contains("unauthorized")
        || lower.contains("authentication required")
        || lower.contains("denied")
    {
        PushError::Auth(message.to_string())
    } else if lower.contains("timeout")
        || lower.contains("connection")
        || lower.contains("eof")
        || lower.contains("no such host")
        || lower.contains("tls")
    {
        PushError::Transport(message.to_string())
    } else {
        PushError::Rejected(message.to_string())
    }
}

// =============================================================================
// DockerEngine
// =============================================================================

/// Docker engine client backed by bollard.
pub struct DockerEngine {
    client: Docker,
}

impl DockerEngine {
    pub fn new(client: Docker) -> Self {
        Self { client }
    }

    /// Connect over the detected local socket.
    ///
    /// Use with `detect_engine()` to reach the daemon.
    pub fn connect(info: &EngineInfo) -> Result<Self, DetectionError> {
        let client =
            Docker::connect_with_unix(&info.socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| DetectionError::ConnectionFailed(e.to_string()))?;
        Ok(Self::new(client))
    }

    /// Verify the daemon answers before starting a run.
    pub async fn ping(&self) -> Result<(), DetectionError> {
        self.client
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| DetectionError::ConnectionFailed(e.to_string()))
    }
}

#[async_trait]
impl BuildOps for DockerEngine {
    async fn build_image(
        &self,
        context: Bytes,
        dockerfile: &str,
        tags: &[ImageRef],
        progress: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<(), BuildEngineError> {
        let Some((primary, rest)) = tags.split_first() else {
            return Err(BuildEngineError::Engine("no tags requested".to_string()));
        };

        let options = BuildImageOptions {
            dockerfile: dockerfile.to_string(),
            t: Some(primary.to_string()),
            ..Default::default()
        };

        let mut stream = self
            .client
            .build_image(options, None, Some(bollard::body_full(context)));

        while let Some(item) = stream.next().await {
            let info = item.map_err(map_build_error)?;
            if let Some(chunk) = info.stream {
                for line in chunk.lines() {
                    if !line.trim().is_empty() {
                        progress(line);
                    }
                }
            }
            if let Some(error) = info.error {
                let detail = info
                    .error_detail
                    .and_then(|d| d.message)
                    .unwrap_or(error);
                return Err(BuildEngineError::Failed(detail));
            }
        }

        // The daemon only records the first tag at build time
        for reference in rest {
            let options = TagImageOptions {
                repo: Some(reference.repository_url()),
                tag: Some(reference.tag().to_string()),
                ..Default::default()
            };
            self.client
                .tag_image(&primary.to_string(), Some(options))
                .await
                .map_err(map_tag_error)?;
        }

        Ok(())
    }
}

#[async_trait]
impl PushOps for DockerEngine {
    async fn push_image(
        &self,
        reference: &ImageRef,
        auth: &RegistryAuth,
    ) -> Result<Option<DigestId>, PushError> {
        let credentials = DockerCredentials {
            username: Some(auth.username.clone()),
            password: Some(auth.password.clone()),
            serveraddress: Some(auth.server.clone()),
            ..Default::default()
        };

        let options = PushImageOptions {
            tag: Some(reference.tag().to_string()),
            ..Default::default()
        };

        let mut stream = self.client.push_image(
            &reference.repository_url(),
            Some(options),
            Some(credentials),
        );

        let mut digest = None;
        while let Some(item) = stream.next().await {
            let info = item.map_err(map_push_error)?;
            if let Some(error) = info.error {
                return Err(classify_push_stream_error(&error));
            }
            if let Some(status) = info.status
                && let Some(found) = extract_digest(&status)
            {
                digest = Some(DigestId::new(found));
            }
        }

        Ok(digest)
    }
}

/// Final push status lines read "latest: digest: sha256:... size: ...".
fn extract_digest(status: &str) -> Option<String> {
    let start = status.find("sha256:")?;
    let digest: String = status[start..]
        .chars()
        .take_while(|c| !c.is_whitespace())
        .collect();
    Some(digest)
}
