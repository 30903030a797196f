// ABOUTME: Rollout error types with SNAFU pattern.
// ABOUTME: Unifies stage failures for programmatic handling and reporting.

use std::time::Duration;

use snafu::Snafu;

use crate::build::BuildError;
use crate::engine::PushError;
use crate::platform::PlatformError;
use crate::types::RevisionId;

use super::lock::LockError;

/// Unified error for a rollout run, covering every stage.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RolloutError {
    #[snafu(display("build failed: {source}"))]
    Build { source: BuildError },

    #[snafu(display("publish failed: {source}"))]
    Publish { source: PushError },

    #[snafu(display("platform update failed: {source}"))]
    Platform { source: PlatformError },

    #[snafu(display("revision {revision} failed: {message}"))]
    RevisionFailed {
        revision: RevisionId,
        message: String,
    },

    #[snafu(display("revision {revision} not healthy after {}s", waited.as_secs()))]
    Timeout {
        revision: RevisionId,
        waited: Duration,
    },

    #[snafu(display("rollout cancelled"))]
    Cancelled { revision: Option<RevisionId> },

    #[snafu(display("target {target} is locked: {source}"))]
    Locked { target: String, source: LockError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloutErrorKind {
    /// The image never built.
    Build,
    /// Credentials were refused by the registry or platform.
    Auth,
    /// Connection-level failure talking to the registry or platform.
    Transport,
    /// The platform or registry rejected the request, or the revision died.
    Platform,
    /// The revision never reached a terminal phase inside the window.
    Timeout,
    /// An external cancellation stopped the run.
    Cancelled,
    /// Another rollout holds the target.
    Lock,
}

impl RolloutErrorKind {
    /// Stable lowercase name, used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            RolloutErrorKind::Build => "build",
            RolloutErrorKind::Auth => "auth",
            RolloutErrorKind::Transport => "transport",
            RolloutErrorKind::Platform => "platform",
            RolloutErrorKind::Timeout => "timeout",
            RolloutErrorKind::Cancelled => "cancelled",
            RolloutErrorKind::Lock => "lock",
        }
    }
}

impl RolloutError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> RolloutErrorKind {
        match self {
            RolloutError::Build { .. } => RolloutErrorKind::Build,
            RolloutError::Publish { source } => match source {
                PushError::Auth(_) => RolloutErrorKind::Auth,
                PushError::Transport(_) => RolloutErrorKind::Transport,
                PushError::Rejected(_) => RolloutErrorKind::Platform,
            },
            RolloutError::Platform { source } => match source {
                PlatformError::Unauthorized(_) => RolloutErrorKind::Auth,
                PlatformError::Transport(_) => RolloutErrorKind::Transport,
                _ => RolloutErrorKind::Platform,
            },
            RolloutError::RevisionFailed { .. } => RolloutErrorKind::Platform,
            RolloutError::Timeout { .. } => RolloutErrorKind::Timeout,
            RolloutError::Cancelled { .. } => RolloutErrorKind::Cancelled,
            RolloutError::Locked { .. } => RolloutErrorKind::Lock,
        }
    }

    /// Which pipeline stage produced the error.
    pub fn stage(&self) -> &'static str {
        match self {
            RolloutError::Build { .. } => "build",
            RolloutError::Publish { .. } => "publish",
            RolloutError::Platform { .. }
            | RolloutError::RevisionFailed { .. }
            | RolloutError::Timeout { .. }
            | RolloutError::Cancelled { .. } => "update",
            RolloutError::Locked { .. } => "lock",
        }
    }

    /// The revision involved, when the failure happened after one existed.
    pub fn revision(&self) -> Option<&RevisionId> {
        match self {
            RolloutError::RevisionFailed { revision, .. }
            | RolloutError::Timeout { revision, .. } => Some(revision),
            RolloutError::Cancelled { revision } => revision.as_ref(),
            _ => None,
        }
    }
}

impl From<BuildError> for RolloutError {
    fn from(source: BuildError) -> Self {
        RolloutError::Build { source }
    }
}

impl From<PushError> for RolloutError {
    fn from(source: PushError) -> Self {
        RolloutError::Publish { source }
    }
}

impl From<PlatformError> for RolloutError {
    fn from(source: PlatformError) -> Self {
        RolloutError::Platform { source }
    }
}
