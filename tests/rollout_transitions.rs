// ABOUTME: Tests for rollout state transitions.
// ABOUTME: Verifies stage ordering, partial data on failure, and error kinds.

mod support;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use ekdosi::config::{PollPolicy, PushPolicy, RolloutPolicy};
use ekdosi::engine::PushError;
use ekdosi::platform::RevisionPhase;
use ekdosi::publish::{ScopedCredentials, TagOutcome};
use ekdosi::rollout::{
    Built, Completed, Planned, Published, Rollout, RolloutError, RolloutErrorKind, RolloutOutcome,
    TransitionResult,
};
use support::{FakeEngine, FakePlatform, build_context, plan_with_context, registry_config};

// =============================================================================
// Transition Type Signature Tests
// =============================================================================

/// Test: Verifies the type signatures of all transition methods compile
/// correctly. This ensures the state machine is wired up properly at
/// compile time.
#[test]
fn transition_type_signatures_compile() {
    use ekdosi::engine::{BuildOps, PushOps};
    use ekdosi::platform::PlatformOps;
    use ekdosi::publish::PushReport;
    use ekdosi::rollout::RolloutPlan;
    use ekdosi::types::RevisionId;
    use std::io::Write;

    // This function is never called, but it must compile.
    // If any type signature is wrong, this will fail to compile.
    #[allow(dead_code)]
    async fn check_signatures<E: BuildOps + PushOps, P: PlatformOps>(
        plan: RolloutPlan,
        engine: &E,
        platform: &P,
        credentials: &ScopedCredentials,
        cancel: &CancellationToken,
        sink: &mut (dyn Write + Send),
    ) {
        let push = PushPolicy::default();
        let rollout = RolloutPolicy::default();

        // Planned -> Built
        let r1: Rollout<Planned> = Rollout::new(plan);
        let r2: TransitionResult<Built, Planned> = r1.build(engine, sink).await;

        // Built -> Published
        let r3: TransitionResult<Published, Built> =
            r2.unwrap().publish(engine, credentials, &push).await;

        // Published -> Completed
        let r4: TransitionResult<Completed, Published> =
            r3.unwrap().update(platform, &rollout, cancel).await;

        // Completed - terminal state
        let (_revision, _report): (RevisionId, PushReport) = r4.unwrap().finish();
    }
}

// =============================================================================
// Happy Path
// =============================================================================

/// Test: The full chain walks Planned through Completed and yields the
/// platform's revision.
#[tokio::test(start_paused = true)]
async fn full_chain_reaches_completed() {
    let context = build_context();
    let plan = plan_with_context(context.path());
    let engine = FakeEngine::new();
    let platform = FakePlatform::healthy("api-00042");
    let credentials = ScopedCredentials::resolve(&registry_config()).unwrap();
    let cancel = CancellationToken::new();
    let mut sink: Vec<u8> = Vec::new();

    let built = Rollout::new(plan).build(&engine, &mut sink).await.unwrap();
    assert_eq!(built.images().len(), 2);

    let published = built
        .publish(&engine, &credentials, &PushPolicy::default())
        .await
        .unwrap();
    assert!(published.push_report().all_pushed());

    let completed = published
        .update(&platform, &RolloutPolicy::default(), &cancel)
        .await
        .unwrap();
    assert_eq!(completed.revision().as_str(), "api-00042");

    let (revision, report) = completed.finish();
    assert_eq!(revision.as_str(), "api-00042");
    assert_eq!(report.pushed_count(), 2);

    // The platform was pointed at the immutable release tag, not the alias.
    let state = platform.state.lock().unwrap();
    assert_eq!(state.updates, vec!["registry.example.com/acme/api:abc123"]);
}

// =============================================================================
// Build Failures
// =============================================================================

/// Test: A failed build hands the Planned state back for a retry.
#[tokio::test]
async fn build_failure_returns_planned_state() {
    let context = build_context();
    let plan = plan_with_context(context.path());
    let engine = FakeEngine::failing_build("missing package");
    let mut sink: Vec<u8> = Vec::new();

    let (rollout, err) = Rollout::new(plan)
        .build(&engine, &mut sink)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), RolloutErrorKind::Build);
    assert_eq!(err.stage(), "build");
    assert!(err.to_string().contains("missing package"));

    // The scripted failure was consumed; the same state builds cleanly.
    let built = rollout.build(&engine, &mut sink).await.unwrap();
    assert_eq!(built.images().len(), 2);
}

// =============================================================================
// Publish Failures
// =============================================================================

/// Test: A failed publish keeps the partial per-tag outcomes on the
/// returned Built state.
#[tokio::test]
async fn publish_failure_keeps_partial_outcomes() {
    let context = build_context();
    let plan = plan_with_context(context.path());
    let engine = FakeEngine::new();
    engine.fail_push_of(
        "registry.example.com/acme/api:abc123",
        PushError::Rejected("blob unknown".to_string()),
    );
    let credentials = ScopedCredentials::resolve(&registry_config()).unwrap();
    let mut sink: Vec<u8> = Vec::new();

    let built = Rollout::new(plan).build(&engine, &mut sink).await.unwrap();
    let (failed, err) = built
        .publish(&engine, &credentials, &PushPolicy::default())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), "publish");
    let outcomes = failed.tag_outcomes();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].tag, "latest");
    assert_eq!(outcomes[0].outcome, TagOutcome::Pushed);
    assert_eq!(outcomes[1].tag, "abc123");
    assert_eq!(outcomes[1].outcome, TagOutcome::Failed);
}

/// Test: Publish failures classify by the underlying push error.
#[tokio::test]
async fn publish_error_kinds_follow_push_error() {
    let context = build_context();
    let engine = FakeEngine::new();
    engine.queue_push_failures([PushError::Auth("401".to_string())]);
    let credentials = ScopedCredentials::resolve(&registry_config()).unwrap();
    let mut sink: Vec<u8> = Vec::new();

    let plan = plan_with_context(context.path());
    let built = Rollout::new(plan).build(&engine, &mut sink).await.unwrap();
    let (_, err) = built
        .publish(&engine, &credentials, &PushPolicy::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), RolloutErrorKind::Auth);
}

// =============================================================================
// Update Failures
// =============================================================================

/// Test: A revision that dies on the platform fails the update but keeps
/// the Published state, including its push report.
#[tokio::test(start_paused = true)]
async fn update_failure_keeps_published_state() {
    let context = build_context();
    let plan = plan_with_context(context.path());
    let engine = FakeEngine::new();
    let platform = FakePlatform::with_phases("api-00043", &[RevisionPhase::Failed]);
    platform
        .state
        .lock()
        .unwrap()
        .statuses
        .front_mut()
        .unwrap()
        .message = Some("readiness probe failed".to_string());
    let credentials = ScopedCredentials::resolve(&registry_config()).unwrap();
    let cancel = CancellationToken::new();
    let mut sink: Vec<u8> = Vec::new();

    let published = Rollout::new(plan)
        .build(&engine, &mut sink)
        .await
        .unwrap()
        .publish(&engine, &credentials, &PushPolicy::default())
        .await
        .unwrap();

    let (failed, err) = published
        .update(&platform, &RolloutPolicy::default(), &cancel)
        .await
        .unwrap_err();

    match &err {
        RolloutError::RevisionFailed { revision, message } => {
            assert_eq!(revision.as_str(), "api-00043");
            assert!(message.contains("readiness probe"));
        }
        other => panic!("Expected RevisionFailed, got {:?}", other),
    }
    assert_eq!(err.revision().unwrap().as_str(), "api-00043");
    assert!(failed.push_report().all_pushed());
}

/// Test: An update that never settles reports a timeout outcome carrying
/// the revision.
#[tokio::test(start_paused = true)]
async fn update_timeout_names_revision() {
    let context = build_context();
    let plan = plan_with_context(context.path());
    let engine = FakeEngine::new();
    let platform = FakePlatform::with_phases("api-00044", &[RevisionPhase::Provisioning]);
    let credentials = ScopedCredentials::resolve(&registry_config()).unwrap();
    let cancel = CancellationToken::new();
    let policy = RolloutPolicy {
        timeout: Duration::from_secs(10),
        poll: PollPolicy {
            initial: Duration::from_secs(2),
            ceiling: Duration::from_secs(15),
        },
    };
    let mut sink: Vec<u8> = Vec::new();

    let published = Rollout::new(plan)
        .build(&engine, &mut sink)
        .await
        .unwrap()
        .publish(&engine, &credentials, &PushPolicy::default())
        .await
        .unwrap();

    let (_, err) = published.update(&platform, &policy, &cancel).await.unwrap_err();

    assert_eq!(err.outcome(), RolloutOutcome::TimedOut);
    assert_eq!(err.revision().unwrap().as_str(), "api-00044");
    assert!(err.to_string().contains("not healthy after 10s"));
}

/// Test: Cancellation during the watch names the in-flight revision.
#[tokio::test(start_paused = true)]
async fn cancelled_update_names_revision() {
    let context = build_context();
    let plan = plan_with_context(context.path());
    let engine = FakeEngine::new();
    let platform = FakePlatform::healthy("api-00045");
    let credentials = ScopedCredentials::resolve(&registry_config()).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut sink: Vec<u8> = Vec::new();

    let published = Rollout::new(plan)
        .build(&engine, &mut sink)
        .await
        .unwrap()
        .publish(&engine, &credentials, &PushPolicy::default())
        .await
        .unwrap();

    let (_, err) = published
        .update(&platform, &RolloutPolicy::default(), &cancel)
        .await
        .unwrap_err();

    match err {
        RolloutError::Cancelled { revision } => {
            assert_eq!(revision.unwrap().as_str(), "api-00045");
        }
        other => panic!("Expected Cancelled, got {:?}", other),
    }
}
