// ABOUTME: Test support utilities.
// ABOUTME: Provides scriptable engine and platform fakes for rollout tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Mutex, Once};

use async_trait::async_trait;
use bytes::Bytes;
use nonempty::NonEmpty;

use ekdosi::build::BuildSpec;
use ekdosi::config::RegistryConfig;
use ekdosi::engine::{BuildEngineError, BuildOps, PushError, PushOps, RegistryAuth};
use ekdosi::platform::{
    PlatformError, PlatformOps, RevisionPhase, RevisionRecord, RevisionStatus,
};
use ekdosi::rollout::RolloutPlan;
use ekdosi::types::{AppName, DeploymentTarget, DigestId, ImageRef, RevisionId};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("ekdosi=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

// =============================================================================
// Common fixtures
// =============================================================================

#[allow(dead_code)]
pub fn image(reference: &str) -> ImageRef {
    ImageRef::parse(reference).expect("test reference should parse")
}

#[allow(dead_code)]
pub fn target() -> DeploymentTarget {
    DeploymentTarget {
        app: AppName::new("api").unwrap(),
        group: "prod".to_string(),
        port: 8080,
    }
}

#[allow(dead_code)]
pub fn revision(name: &str) -> RevisionId {
    RevisionId::new(name.to_string())
}

/// A plan building the given context directory into
/// `registry.example.com/acme/api` with a `latest` alias and `abc123`
/// release tag.
#[allow(dead_code)]
pub fn plan_with_context(context: &Path) -> RolloutPlan {
    let spec = BuildSpec::new(
        context.to_path_buf(),
        "Dockerfile".into(),
        NonEmpty {
            head: "latest".to_string(),
            tail: vec!["abc123".to_string()],
        },
    );
    RolloutPlan {
        app: AppName::new("api").unwrap(),
        spec,
        repository: image("registry.example.com/acme/api:latest"),
        release: image("registry.example.com/acme/api:abc123"),
        target: target(),
    }
}

/// A build context directory holding a minimal Dockerfile.
#[allow(dead_code)]
pub fn build_context() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
    dir
}

#[allow(dead_code)]
pub fn registry_config() -> RegistryConfig {
    use ekdosi::config::EnvValue;
    RegistryConfig {
        host: "registry.example.com".to_string(),
        username: EnvValue::Literal("robot".to_string()),
        password: EnvValue::Literal("hunter2".to_string()),
    }
}

// =============================================================================
// FakeEngine
// =============================================================================

/// Scriptable engine recording build and push calls.
#[derive(Default)]
pub struct FakeEngine {
    pub state: Mutex<EngineState>,
}

#[derive(Default)]
pub struct EngineState {
    /// One entry per build call: the tags it was asked to apply.
    pub built: Vec<Vec<String>>,
    /// References pushed successfully, in order.
    pub pushed: Vec<String>,
    /// Registry servers seen in push credentials.
    pub auth_servers: Vec<String>,
    /// Lines emitted to the build progress callback.
    pub build_log: Vec<String>,
    /// Next build fails with this message.
    pub fail_build: Option<String>,
    /// Errors handed out to upcoming pushes, consumed front to back.
    pub push_failures: VecDeque<PushError>,
    /// Failures keyed by full reference, each consumed on first match.
    pub push_failures_for: Vec<(String, PushError)>,
    /// Digest reported for every successful push.
    pub digest: Option<String>,
}

impl FakeEngine {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn failing_build(message: &str) -> Self {
        let engine = Self::default();
        engine.state.lock().unwrap().fail_build = Some(message.to_string());
        engine
    }

    /// Queue errors for the next pushes; later pushes succeed.
    #[allow(dead_code)]
    pub fn queue_push_failures(&self, errors: impl IntoIterator<Item = PushError>) {
        self.state.lock().unwrap().push_failures.extend(errors);
    }

    /// Fail the next push of exactly this reference.
    #[allow(dead_code)]
    pub fn fail_push_of(&self, reference: &str, error: PushError) {
        self.state
            .lock()
            .unwrap()
            .push_failures_for
            .push((reference.to_string(), error));
    }
}

#[async_trait]
impl BuildOps for FakeEngine {
    async fn build_image(
        &self,
        _context: Bytes,
        _dockerfile: &str,
        tags: &[ImageRef],
        progress: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<(), BuildEngineError> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state.fail_build.take() {
            return Err(BuildEngineError::Failed(message));
        }
        for line in &state.build_log {
            progress(line);
        }
        state
            .built
            .push(tags.iter().map(|t| t.to_string()).collect());
        Ok(())
    }
}

#[async_trait]
impl PushOps for FakeEngine {
    async fn push_image(
        &self,
        reference: &ImageRef,
        auth: &RegistryAuth,
    ) -> Result<Option<DigestId>, PushError> {
        let mut state = self.state.lock().unwrap();
        state.auth_servers.push(auth.server.clone());
        if let Some(pos) = state
            .push_failures_for
            .iter()
            .position(|(r, _)| *r == reference.to_string())
        {
            let (_, error) = state.push_failures_for.remove(pos);
            return Err(error);
        }
        if let Some(error) = state.push_failures.pop_front() {
            return Err(error);
        }
        state.pushed.push(reference.to_string());
        Ok(state.digest.clone().map(DigestId::new))
    }
}

// =============================================================================
// FakePlatform
// =============================================================================

/// Scriptable platform with a queue of status reports.
pub struct FakePlatform {
    pub state: Mutex<PlatformState>,
}

pub struct PlatformState {
    /// Revision name returned by begin_update.
    pub revision: RevisionId,
    /// Reports handed out in order; the last one repeats forever.
    pub statuses: VecDeque<RevisionStatus>,
    /// Scripted failure for the next begin_update.
    pub fail_update: Option<PlatformError>,
    /// Images begin_update was called with.
    pub updates: Vec<String>,
    /// Revisions activated, in order.
    pub activated: Vec<String>,
    /// Revisions returned by list_revisions.
    pub revisions: Vec<RevisionRecord>,
    /// Number of revision_status calls so far.
    pub polls: usize,
}

#[allow(dead_code)]
pub fn status(revision: &str, phase: RevisionPhase) -> RevisionStatus {
    RevisionStatus {
        name: RevisionId::new(revision.to_string()),
        phase,
        image: None,
        message: None,
    }
}

impl FakePlatform {
    /// Platform whose new revision reports the given phases, one per poll.
    #[allow(dead_code)]
    pub fn with_phases(revision: &str, phases: &[RevisionPhase]) -> Self {
        let statuses = phases
            .iter()
            .map(|phase| status(revision, *phase))
            .collect();
        Self {
            state: Mutex::new(PlatformState {
                revision: RevisionId::new(revision.to_string()),
                statuses,
                fail_update: None,
                updates: Vec::new(),
                activated: Vec::new(),
                revisions: Vec::new(),
                polls: 0,
            }),
        }
    }

    /// Platform whose new revision is healthy on the first poll.
    #[allow(dead_code)]
    pub fn healthy(revision: &str) -> Self {
        Self::with_phases(revision, &[RevisionPhase::Healthy])
    }
}

#[async_trait]
impl PlatformOps for FakePlatform {
    async fn begin_update(
        &self,
        _target: &DeploymentTarget,
        image: &ImageRef,
    ) -> Result<RevisionId, PlatformError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.fail_update.take() {
            return Err(error);
        }
        state.updates.push(image.to_string());
        Ok(state.revision.clone())
    }

    async fn revision_status(
        &self,
        _target: &DeploymentTarget,
        _revision: &RevisionId,
    ) -> Result<RevisionStatus, PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.polls += 1;
        if state.statuses.len() > 1 {
            Ok(state.statuses.pop_front().unwrap())
        } else {
            state
                .statuses
                .front()
                .cloned()
                .ok_or_else(|| PlatformError::Api("no scripted status".to_string()))
        }
    }

    async fn list_revisions(
        &self,
        _target: &DeploymentTarget,
    ) -> Result<Vec<RevisionRecord>, PlatformError> {
        Ok(self.state.lock().unwrap().revisions.clone())
    }

    async fn activate_revision(
        &self,
        _target: &DeploymentTarget,
        revision: &RevisionId,
    ) -> Result<(), PlatformError> {
        self.state
            .lock()
            .unwrap()
            .activated
            .push(revision.to_string());
        Ok(())
    }
}
