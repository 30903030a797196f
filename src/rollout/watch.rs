// ABOUTME: Watches a platform revision until it reaches a terminal phase.
// ABOUTME: Polls with a doubling interval, bounded by the rollout timeout.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::RolloutPolicy;
use crate::platform::{PlatformError, PlatformOps, RevisionPhase};
use crate::types::{DeploymentTarget, ImageRef, RevisionId};

/// Terminal result of watching one revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The revision reached Healthy.
    Healthy,
    /// The revision reached Failed; the platform's detail rides along.
    Failed { message: String },
    /// The window closed without a terminal phase.
    TimedOut { waited: Duration },
    /// Cancellation fired before a terminal phase.
    Cancelled,
}

/// Poll `revision` until it is Healthy or Failed, the timeout window
/// closes, or `cancel` fires.
///
/// The interval starts at the policy's initial value and doubles after
/// every poll, capped at the ceiling. The last wait is shortened so one
/// final status check lands at the window boundary. Phases only move
/// forward; a report ranked below the highest phase seen is logged at
/// debug and ignored.
///
/// # Errors
///
/// Platform call failures propagate immediately. A status that names a
/// different image than `expected` is reported as `PlatformError::Api`.
pub async fn watch_revision<P: PlatformOps + ?Sized>(
    platform: &P,
    target: &DeploymentTarget,
    revision: &RevisionId,
    expected: Option<&ImageRef>,
    policy: &RolloutPolicy,
    cancel: &CancellationToken,
) -> Result<WatchOutcome, PlatformError> {
    let started = Instant::now();
    let mut interval = policy.poll.initial;
    let mut highest = RevisionPhase::Requested;

    loop {
        let elapsed = started.elapsed();
        let remaining = policy.timeout.saturating_sub(elapsed);
        if remaining.is_zero() {
            tracing::warn!(
                revision = %revision,
                waited = elapsed.as_secs(),
                "revision did not settle inside the rollout window"
            );
            return Ok(WatchOutcome::TimedOut { waited: elapsed });
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(revision = %revision, "watch cancelled");
                return Ok(WatchOutcome::Cancelled);
            }
            _ = tokio::time::sleep(interval.min(remaining)) => {}
        }

        let status = platform.revision_status(target, revision).await?;

        if let (Some(image), Some(expected)) = (&status.image, expected)
            && *image != expected.to_string()
        {
            return Err(PlatformError::Api(format!(
                "revision {} reports image {} instead of {}",
                revision, image, expected
            )));
        }

        if status.phase.rank() < highest.rank() {
            tracing::debug!(
                revision = %revision,
                reported = %status.phase,
                seen = %highest,
                "ignoring stale phase report"
            );
        } else {
            highest = status.phase;
        }

        match highest {
            RevisionPhase::Healthy => {
                tracing::info!(
                    revision = %revision,
                    waited = started.elapsed().as_secs(),
                    "revision healthy"
                );
                return Ok(WatchOutcome::Healthy);
            }
            RevisionPhase::Failed => {
                let message = status
                    .message
                    .unwrap_or_else(|| "no failure detail provided".to_string());
                return Ok(WatchOutcome::Failed { message });
            }
            phase => {
                tracing::debug!(revision = %revision, phase = %phase, "revision not ready");
            }
        }

        interval = interval.saturating_mul(2).min(policy.poll.ceiling);
    }
}
