// ABOUTME: JSON-over-HTTP platform client built on a raw hyper connection.
// ABOUTME: Talks to http:// endpoints or unix:// sockets; TLS is the tunnel's job.

use super::types::{RevisionRecord, RevisionStatus};
use super::{PlatformError, PlatformOps};
use crate::types::{DeploymentTarget, ImageRef, RevisionId};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1::SendRequest;
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use tokio::net::{TcpStream, UnixStream};

#[derive(Debug, Clone)]
enum Endpoint {
    Tcp { host: String, port: u16 },
    Unix { path: String },
}

/// Platform client for a JSON control API.
///
/// The endpoint is either `http://host:port` or `unix:///path/to.sock`.
/// Remote platforms are expected to be reached through a TLS-terminating
/// tunnel or local proxy.
pub struct HttpPlatform {
    endpoint: Endpoint,
    authority: String,
    token: Option<String>,
}

impl HttpPlatform {
    pub fn new(endpoint: &str, token: Option<String>) -> Result<Self, PlatformError> {
        let endpoint = parse_endpoint(endpoint)?;
        let authority = match &endpoint {
            Endpoint::Tcp { host, port } => format!("{}:{}", host, port),
            Endpoint::Unix { .. } => "localhost".to_string(),
        };

        Ok(Self {
            endpoint,
            authority,
            token,
        })
    }

    /// One connection per request. Calls are sparse (an update, then a
    /// slow poll), so keeping a connection warm buys nothing.
    async fn connect(&self) -> Result<SendRequest<Full<Bytes>>, PlatformError> {
        match &self.endpoint {
            Endpoint::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port)).await.map_err(|e| {
                    PlatformError::Transport(format!("connect {}:{}: {}", host, port, e))
                })?;
                spawn_connection(TokioIo::new(stream)).await
            }
            Endpoint::Unix { path } => {
                let stream = UnixStream::connect(path)
                    .await
                    .map_err(|e| PlatformError::Transport(format!("connect {}: {}", path, e)))?;
                spawn_connection(TokioIo::new(stream)).await
            }
        }
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Bytes, PlatformError> {
        let mut sender = self.connect().await?;

        let payload = match body {
            Some(value) => serde_json::to_vec(&value)
                .map_err(|e| PlatformError::Api(format!("failed to encode request: {}", e)))?,
            None => Vec::new(),
        };

        let mut builder = hyper::Request::builder()
            .method(method)
            .uri(path)
            .header("Host", self.authority.clone())
            .header("Accept", "application/json");

        if !payload.is_empty() {
            builder = builder.header("Content-Type", "application/json");
        }

        if let Some(token) = &self.token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let req = builder
            .body(Full::new(Bytes::from(payload)))
            .map_err(|e| PlatformError::Api(format!("failed to build request: {}", e)))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| PlatformError::Transport(format!("request failed: {}", e)))?;

        let status = resp.status();
        let collected = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| PlatformError::Transport(format!("failed to read response: {}", e)))?;
        let body_bytes = collected.to_bytes();

        if status.is_success() {
            return Ok(body_bytes);
        }

        let detail = response_detail(&body_bytes, status);
        match status.as_u16() {
            401 | 403 => Err(PlatformError::Unauthorized(detail)),
            400..=499 => Err(PlatformError::Rejected(detail)),
            _ => Err(PlatformError::Api(detail)),
        }
    }

    fn app_path(&self, target: &DeploymentTarget) -> String {
        format!(
            "/v1/groups/{}/apps/{}",
            urlencoding::encode(&target.group),
            urlencoding::encode(target.app.as_str()),
        )
    }
}

async fn spawn_connection<T>(io: TokioIo<T>) -> Result<SendRequest<Full<Bytes>>, PlatformError>
where
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let (sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| PlatformError::Transport(format!("HTTP handshake failed: {}", e)))?;

    // Drive the connection until the response is done
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!("platform connection error: {}", e);
        }
    });

    Ok(sender)
}

fn parse_endpoint(endpoint: &str) -> Result<Endpoint, PlatformError> {
    if let Some(path) = endpoint.strip_prefix("unix://") {
        if path.is_empty() {
            return Err(PlatformError::InvalidEndpoint(endpoint.to_string()));
        }
        return Ok(Endpoint::Unix {
            path: path.to_string(),
        });
    }

    let Some(rest) = endpoint.strip_prefix("http://") else {
        return Err(PlatformError::InvalidEndpoint(format!(
            "{} (expected http:// or unix://)",
            endpoint
        )));
    };

    let rest = rest.trim_end_matches('/');
    if rest.is_empty() || rest.contains('/') {
        return Err(PlatformError::InvalidEndpoint(endpoint.to_string()));
    }

    match rest.rsplit_once(':') {
        Some((host, port)) => {
            if host.is_empty() {
                return Err(PlatformError::InvalidEndpoint(endpoint.to_string()));
            }
            let port: u16 = port
                .parse()
                .map_err(|_| PlatformError::InvalidEndpoint(endpoint.to_string()))?;
            Ok(Endpoint::Tcp {
                host: host.to_string(),
                port,
            })
        }
        None => Ok(Endpoint::Tcp {
            host: rest.to_string(),
            port: 80,
        }),
    }
}

fn response_detail(body: &[u8], status: hyper::StatusCode) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        return parsed.error;
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, text)
    }
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    revision: RevisionId,
}

#[derive(Debug, Deserialize)]
struct RevisionsResponse {
    revisions: Vec<RevisionRecord>,
}

#[async_trait]
impl PlatformOps for HttpPlatform {
    async fn begin_update(
        &self,
        target: &DeploymentTarget,
        image: &ImageRef,
    ) -> Result<RevisionId, PlatformError> {
        let path = format!("{}/image", self.app_path(target));
        let body = serde_json::json!({
            "image": image.to_string(),
            "port": target.port,
        });

        let bytes = self.request("POST", &path, Some(body)).await?;
        let parsed: UpdateResponse = serde_json::from_slice(&bytes)
            .map_err(|e| PlatformError::Api(format!("unexpected update response: {}", e)))?;
        Ok(parsed.revision)
    }

    async fn revision_status(
        &self,
        target: &DeploymentTarget,
        revision: &RevisionId,
    ) -> Result<RevisionStatus, PlatformError> {
        let path = format!(
            "{}/revisions/{}",
            self.app_path(target),
            urlencoding::encode(revision.as_str()),
        );

        let bytes = self.request("GET", &path, None).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| PlatformError::Api(format!("unexpected status response: {}", e)))
    }

    async fn list_revisions(
        &self,
        target: &DeploymentTarget,
    ) -> Result<Vec<RevisionRecord>, PlatformError> {
        let path = format!("{}/revisions", self.app_path(target));

        let bytes = self.request("GET", &path, None).await?;
        let parsed: RevisionsResponse = serde_json::from_slice(&bytes)
            .map_err(|e| PlatformError::Api(format!("unexpected revisions response: {}", e)))?;
        Ok(parsed.revisions)
    }

    async fn activate_revision(
        &self,
        target: &DeploymentTarget,
        revision: &RevisionId,
    ) -> Result<(), PlatformError> {
        let path = format!(
            "{}/revisions/{}/activate",
            self.app_path(target),
            urlencoding::encode(revision.as_str()),
        );

        self.request("POST", &path, None).await?;
        Ok(())
    }
}
