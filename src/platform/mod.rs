// ABOUTME: Compute platform control API: request updates and watch revisions.
// ABOUTME: HttpPlatform implements the trait against a JSON-over-HTTP endpoint.

mod http;
mod types;

pub use http::HttpPlatform;
pub use types::{RevisionPhase, RevisionRecord, RevisionStatus, rollback_candidate};

use crate::types::{DeploymentTarget, ImageRef, RevisionId};
use async_trait::async_trait;

/// Control operations against the platform running the apps.
#[async_trait]
pub trait PlatformOps: Send + Sync {
    /// Point the target app at a new image. Returns the revision the
    /// platform created for it.
    async fn begin_update(
        &self,
        target: &DeploymentTarget,
        image: &ImageRef,
    ) -> Result<RevisionId, PlatformError>;

    /// Report the current phase of one revision.
    async fn revision_status(
        &self,
        target: &DeploymentTarget,
        revision: &RevisionId,
    ) -> Result<RevisionStatus, PlatformError>;

    /// List known revisions of the target app, newest first.
    async fn list_revisions(
        &self,
        target: &DeploymentTarget,
    ) -> Result<Vec<RevisionRecord>, PlatformError>;

    /// Route traffic to an existing revision.
    async fn activate_revision(
        &self,
        target: &DeploymentTarget,
        revision: &RevisionId,
    ) -> Result<(), PlatformError>;
}

/// Errors from platform calls.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("platform endpoint is invalid: {0}")]
    InvalidEndpoint(String),

    #[error("platform authentication failed: {0}")]
    Unauthorized(String),

    /// The platform understood the request and said no.
    #[error("platform rejected request: {0}")]
    Rejected(String),

    /// The platform answered with something unusable.
    #[error("platform API error: {0}")]
    Api(String),

    #[error("platform transport error: {0}")]
    Transport(String),
}
