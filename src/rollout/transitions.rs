// ABOUTME: State transition methods for rollout orchestration.
// ABOUTME: Each method consumes self and returns the next state on success.

use std::io::Write;
use std::marker::PhantomData;

use tokio_util::sync::CancellationToken;

use crate::build::ImageBuilder;
use crate::config::{PushPolicy, RolloutPolicy};
use crate::engine::{BuildOps, PushOps};
use crate::platform::PlatformOps;
use crate::publish::{PushReport, Publisher, ScopedCredentials, TagPush};
use crate::types::{ImageRef, RevisionId};

use super::error::RolloutError;
use super::plan::Rollout;
use super::state::{Built, Completed, Planned, Published};
use super::watch::{WatchOutcome, watch_revision};

/// Result type for transitions that report the failed state on error.
///
/// The failed state keeps whatever the rollout had produced so far, so
/// callers can still read partial push outcomes from it.
pub type TransitionResult<T, S> = Result<Rollout<T>, (Rollout<S>, RolloutError)>;

// =============================================================================
// Internal Helpers
// =============================================================================

impl<S> Rollout<S> {
    /// Internal helper to transition with the locally built references.
    fn transition_with_images<T>(self, images: Vec<ImageRef>) -> Rollout<T> {
        Rollout {
            plan: self.plan,
            images,
            pushed: self.pushed,
            revision: self.revision,
            _state: PhantomData,
        }
    }

    /// Internal helper to transition with a push report.
    fn transition_with_report<T>(self, report: PushReport) -> Rollout<T> {
        Rollout {
            plan: self.plan,
            images: self.images,
            pushed: Some(report),
            revision: self.revision,
            _state: PhantomData,
        }
    }

    /// Internal helper to transition with the platform's revision.
    fn transition_with_revision<T>(self, revision: RevisionId) -> Rollout<T> {
        Rollout {
            plan: self.plan,
            images: self.images,
            pushed: self.pushed,
            revision: Some(revision),
            _state: PhantomData,
        }
    }

    /// Per-tag push outcomes recorded so far, if publishing started.
    pub fn tag_outcomes(&self) -> &[TagPush] {
        self.pushed.as_ref().map_or(&[], |report| &report.tags)
    }
}

// =============================================================================
// Planned -> Built
// =============================================================================

impl Rollout<Planned> {
    /// Build the image and apply every planned tag.
    ///
    /// Engine output streams to `sink` line by line.
    ///
    /// # Errors
    ///
    /// Returns `RolloutError::Build` when the context is unusable or the
    /// engine rejects the build.
    pub async fn build<E: BuildOps>(
        self,
        engine: &E,
        sink: &mut (dyn Write + Send),
    ) -> TransitionResult<Built, Planned> {
        let builder = ImageBuilder::new(engine);
        match builder
            .build(&self.plan.repository, &self.plan.spec, sink)
            .await
        {
            Ok(images) => Ok(self.transition_with_images(images)),
            Err(e) => Err((self, RolloutError::from(e))),
        }
    }
}

// =============================================================================
// Built -> Published
// =============================================================================

impl Rollout<Built> {
    /// Push every built reference, in order.
    ///
    /// On failure the returned state carries the partial report, so the
    /// tags that made it out before the abort are still visible.
    ///
    /// # Errors
    ///
    /// Returns `RolloutError::Publish` wrapping the push failure.
    pub async fn publish<E: PushOps>(
        self,
        engine: &E,
        credentials: &ScopedCredentials,
        policy: &PushPolicy,
    ) -> TransitionResult<Published, Built> {
        let publisher = Publisher::new(engine, policy);
        match publisher.publish(&self.images, credentials).await {
            Ok(report) => Ok(self.transition_with_report(report)),
            Err((report, e)) => Err((
                self.transition_with_report(report),
                RolloutError::from(e),
            )),
        }
    }
}

// =============================================================================
// Published -> Completed
// =============================================================================

impl Rollout<Published> {
    /// Point the platform at the release image and watch the revision it
    /// creates until it is healthy.
    ///
    /// # Errors
    ///
    /// `RevisionFailed`, `Timeout`, and `Cancelled` carry the revision so
    /// reports can name it. Platform call failures map to
    /// `RolloutError::Platform`.
    pub async fn update<P: PlatformOps>(
        self,
        platform: &P,
        policy: &RolloutPolicy,
        cancel: &CancellationToken,
    ) -> TransitionResult<Completed, Published> {
        let release = self.plan.release.clone();
        let revision = match platform.begin_update(&self.plan.target, &release).await {
            Ok(revision) => revision,
            Err(e) => return Err((self, RolloutError::from(e))),
        };
        tracing::info!(revision = %revision, image = %release, "update requested");

        let outcome = match watch_revision(
            platform,
            &self.plan.target,
            &revision,
            Some(&release),
            policy,
            cancel,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => return Err((self, RolloutError::from(e))),
        };

        match outcome {
            WatchOutcome::Healthy => Ok(self.transition_with_revision(revision)),
            WatchOutcome::Failed { message } => {
                Err((self, RolloutError::RevisionFailed { revision, message }))
            }
            WatchOutcome::TimedOut { waited } => {
                Err((self, RolloutError::Timeout { revision, waited }))
            }
            WatchOutcome::Cancelled => Err((
                self,
                RolloutError::Cancelled {
                    revision: Some(revision),
                },
            )),
        }
    }
}
