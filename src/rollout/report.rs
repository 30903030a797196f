// ABOUTME: Per-app rollout report for human and JSON consumers.
// ABOUTME: Captures outcome, timing, per-tag pushes, and failure detail.

use std::time::Duration;

use serde::Serialize;

use crate::publish::TagPush;

use super::error::RolloutError;

/// Terminal outcome of one rollout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RolloutOutcome {
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

/// Where a rollout failed and why.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub stage: String,
    pub kind: String,
    pub message: String,
}

/// Everything a caller needs to know about one finished rollout.
#[derive(Debug, Clone, Serialize)]
pub struct RolloutReport {
    pub app: String,
    pub image: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    pub outcome: RolloutOutcome,

    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,

    pub tags: Vec<TagPush>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl RolloutReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == RolloutOutcome::Succeeded
    }
}

impl RolloutError {
    /// The outcome a run that died on this error reports.
    pub fn outcome(&self) -> RolloutOutcome {
        match self {
            RolloutError::Timeout { .. } => RolloutOutcome::TimedOut,
            RolloutError::Cancelled { .. } => RolloutOutcome::Cancelled,
            _ => RolloutOutcome::Failed,
        }
    }

    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail {
            stage: self.stage().to_string(),
            kind: self.kind().as_str().to_string(),
            message: self.to_string(),
        }
    }
}
