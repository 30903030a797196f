// ABOUTME: Manual rollback: route traffic back to the previous revision.
// ABOUTME: Picks the newest inactive healthy revision and reactivates it.

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::RolloutPolicy;
use crate::platform::{PlatformError, PlatformOps, rollback_candidate};
use crate::types::{DeploymentTarget, RevisionId};

use super::watch::{WatchOutcome, watch_revision};

/// Errors from a manual rollback.
#[derive(Debug, Error)]
pub enum RollbackError {
    /// Nothing to roll back to: no inactive revision last seen healthy.
    #[error("no previous healthy revision for {target}")]
    NoCandidate { target: String },

    #[error("revision {revision} failed after reactivation: {message}")]
    RevisionFailed {
        revision: RevisionId,
        message: String,
    },

    #[error("revision {revision} did not report healthy in time")]
    Timeout { revision: RevisionId },

    #[error("rollback cancelled")]
    Cancelled,

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Reactivate the previous healthy revision of `target` and watch it
/// until it reports healthy again.
///
/// The candidate is the newest revision that is not active and last
/// reported Healthy. Running this twice ping-pongs between the two most
/// recent healthy revisions.
///
/// # Errors
///
/// `NoCandidate` when the platform lists nothing to fall back to;
/// otherwise the watch outcome decides.
pub async fn reactivate_previous<P: PlatformOps + ?Sized>(
    platform: &P,
    target: &DeploymentTarget,
    policy: &RolloutPolicy,
    cancel: &CancellationToken,
) -> Result<RevisionId, RollbackError> {
    let revisions = platform.list_revisions(target).await?;

    let Some(previous) = rollback_candidate(&revisions) else {
        return Err(RollbackError::NoCandidate {
            target: target.identity(),
        });
    };
    let revision = previous.name.clone();

    match revisions.iter().find(|r| r.active) {
        Some(active) => tracing::info!(
            target = %target.identity(),
            from = %active.name,
            to = %revision,
            "rolling back"
        ),
        None => tracing::info!(
            target = %target.identity(),
            to = %revision,
            "no active revision, activating previous"
        ),
    }

    platform.activate_revision(target, &revision).await?;

    match watch_revision(platform, target, &revision, None, policy, cancel).await? {
        WatchOutcome::Healthy => Ok(revision),
        WatchOutcome::Failed { message } => {
            Err(RollbackError::RevisionFailed { revision, message })
        }
        WatchOutcome::TimedOut { .. } => Err(RollbackError::Timeout { revision }),
        WatchOutcome::Cancelled => Err(RollbackError::Cancelled),
    }
}
