// ABOUTME: Revision lifecycle types reported by the compute platform.
// ABOUTME: Phases move forward only; Healthy and Failed are terminal.

use crate::types::RevisionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of a platform revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionPhase {
    Requested,
    Provisioning,
    Healthy,
    Failed,
}

impl RevisionPhase {
    /// Position in the lifecycle. A report ranked below one already seen
    /// is stale and should be ignored.
    pub fn rank(self) -> u8 {
        match self {
            RevisionPhase::Requested => 0,
            RevisionPhase::Provisioning => 1,
            RevisionPhase::Healthy | RevisionPhase::Failed => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RevisionPhase::Healthy | RevisionPhase::Failed)
    }
}

impl fmt::Display for RevisionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RevisionPhase::Requested => "requested",
            RevisionPhase::Provisioning => "provisioning",
            RevisionPhase::Healthy => "healthy",
            RevisionPhase::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Point-in-time report on a single revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionStatus {
    pub name: RevisionId,
    pub phase: RevisionPhase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A revision as listed by the platform, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionRecord {
    pub name: RevisionId,
    pub phase: RevisionPhase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default)]
    pub active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The revision a rollback should land on: the newest entry that is not
/// active and last reported Healthy. Expects `revisions` newest first,
/// as the platform lists them.
pub fn rollback_candidate(revisions: &[RevisionRecord]) -> Option<&RevisionRecord> {
    revisions
        .iter()
        .find(|r| !r.active && r.phase == RevisionPhase::Healthy)
}
