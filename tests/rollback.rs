// ABOUTME: Tests for manual rollback against the platform.
// ABOUTME: Verifies candidate selection, reactivation, and watch outcomes.

mod support;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use ekdosi::config::RolloutPolicy;
use ekdosi::platform::{RevisionPhase, RevisionRecord};
use ekdosi::rollout::{RollbackError, reactivate_previous};
use ekdosi::types::RevisionId;
use support::{FakePlatform, target};

fn record(name: &str, phase: RevisionPhase, active: bool) -> RevisionRecord {
    RevisionRecord {
        name: RevisionId::new(name.to_string()),
        phase,
        image: None,
        active,
        created_at: Some(Utc::now()),
    }
}

/// Platform whose reactivated revision reports the given phases, with a
/// scripted revision history (newest first).
fn platform_with_history(
    revision: &str,
    phases: &[RevisionPhase],
    history: Vec<RevisionRecord>,
) -> FakePlatform {
    let platform = FakePlatform::with_phases(revision, phases);
    platform.state.lock().unwrap().revisions = history;
    platform
}

// =============================================================================
// Candidate Selection
// =============================================================================

/// Test: Rollback reactivates the newest inactive healthy revision and
/// returns it once it reports healthy again.
#[tokio::test(start_paused = true)]
async fn reactivates_previous_healthy_revision() {
    let platform = platform_with_history(
        "api-00042",
        &[RevisionPhase::Healthy],
        vec![
            record("api-00044", RevisionPhase::Healthy, true),
            record("api-00043", RevisionPhase::Failed, false),
            record("api-00042", RevisionPhase::Healthy, false),
        ],
    );
    let cancel = CancellationToken::new();

    let revision = reactivate_previous(&platform, &target(), &RolloutPolicy::default(), &cancel)
        .await
        .unwrap();

    assert_eq!(revision.as_str(), "api-00042");
    let state = platform.state.lock().unwrap();
    assert_eq!(state.activated, vec!["api-00042".to_string()]);
}

/// Test: With no inactive healthy revision there is nothing to roll back
/// to, and nothing gets activated.
#[tokio::test]
async fn no_candidate_without_inactive_healthy_revision() {
    let platform = platform_with_history(
        "api-00044",
        &[RevisionPhase::Healthy],
        vec![
            record("api-00044", RevisionPhase::Healthy, true),
            record("api-00043", RevisionPhase::Failed, false),
        ],
    );
    let cancel = CancellationToken::new();

    let result =
        reactivate_previous(&platform, &target(), &RolloutPolicy::default(), &cancel).await;

    assert!(matches!(result, Err(RollbackError::NoCandidate { .. })));
    assert!(platform.state.lock().unwrap().activated.is_empty());
}

/// Test: An empty revision history is also a no-candidate error.
#[tokio::test]
async fn no_candidate_for_empty_history() {
    let platform = platform_with_history("api-00001", &[RevisionPhase::Healthy], Vec::new());
    let cancel = CancellationToken::new();

    let result =
        reactivate_previous(&platform, &target(), &RolloutPolicy::default(), &cancel).await;

    assert!(matches!(result, Err(RollbackError::NoCandidate { .. })));
}

// =============================================================================
// Watch Outcomes After Reactivation
// =============================================================================

/// Test: A revision that dies after reactivation surfaces the platform's
/// failure message.
#[tokio::test(start_paused = true)]
async fn failure_after_reactivation_is_reported() {
    let platform = platform_with_history(
        "api-00042",
        &[RevisionPhase::Provisioning, RevisionPhase::Failed],
        vec![
            record("api-00044", RevisionPhase::Healthy, true),
            record("api-00042", RevisionPhase::Healthy, false),
        ],
    );
    platform
        .state
        .lock()
        .unwrap()
        .statuses
        .back_mut()
        .unwrap()
        .message = Some("container exited with code 137".to_string());
    let cancel = CancellationToken::new();

    let result =
        reactivate_previous(&platform, &target(), &RolloutPolicy::default(), &cancel).await;

    match result {
        Err(RollbackError::RevisionFailed { revision, message }) => {
            assert_eq!(revision.as_str(), "api-00042");
            assert!(message.contains("137"));
        }
        other => panic!("expected RevisionFailed, got {other:?}"),
    }
}

/// Test: Cancelling while the reactivated revision is still provisioning
/// returns Cancelled instead of waiting out the timeout.
#[tokio::test(start_paused = true)]
async fn cancel_during_rewatch_returns_cancelled() {
    let platform = platform_with_history(
        "api-00042",
        &[RevisionPhase::Provisioning],
        vec![
            record("api-00044", RevisionPhase::Healthy, true),
            record("api-00042", RevisionPhase::Healthy, false),
        ],
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result =
        reactivate_previous(&platform, &target(), &RolloutPolicy::default(), &cancel).await;

    assert!(matches!(result, Err(RollbackError::Cancelled)));
}
