// ABOUTME: Drives one rollout end to end: lock, build, publish, update.
// ABOUTME: Always returns a report, whichever stage the run died in.

use std::io::Write;
use std::path::PathBuf;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::{PushPolicy, RegistryConfig, RolloutPolicy};
use crate::engine::{BuildOps, PushOps};
use crate::platform::PlatformOps;
use crate::publish::{ScopedCredentials, TagPush};

use super::error::RolloutError;
use super::lock::RolloutLock;
use super::plan::{Rollout, RolloutPlan};
use super::report::{RolloutOutcome, RolloutReport};

/// Knobs for one orchestrated run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub push: PushPolicy,
    pub rollout: RolloutPolicy,
    /// Directory holding per-target lock files.
    pub state_dir: PathBuf,
    /// Break a live lock instead of honoring it.
    pub force: bool,
}

/// Runs the build, publish, and update stages for one app.
pub struct Orchestrator<'a, E, P> {
    engine: &'a E,
    platform: &'a P,
    options: RunOptions,
}

impl<'a, E, P> Orchestrator<'a, E, P>
where
    E: BuildOps + PushOps,
    P: PlatformOps,
{
    pub fn new(engine: &'a E, platform: &'a P, options: RunOptions) -> Self {
        Self {
            engine,
            platform,
            options,
        }
    }

    /// Run the full pipeline for `plan`. The target lock is held for the
    /// whole run and released before this returns. Engine build output
    /// streams to `sink`.
    pub async fn run(
        &self,
        plan: RolloutPlan,
        registry: &RegistryConfig,
        sink: &mut (dyn Write + Send),
        cancel: &CancellationToken,
    ) -> RolloutReport {
        let started = Instant::now();

        let lock = match RolloutLock::acquire(
            &self.options.state_dir,
            &plan.target,
            self.options.force,
        ) {
            Ok(lock) => lock,
            Err(e) => {
                let error = RolloutError::Locked {
                    target: plan.target.identity(),
                    source: e,
                };
                return failure_report(
                    plan.app.to_string(),
                    plan.release.to_string(),
                    Vec::new(),
                    started,
                    error,
                );
            }
        };

        let report = self.run_locked(plan, registry, sink, cancel, started).await;
        lock.release();
        report
    }

    async fn run_locked(
        &self,
        plan: RolloutPlan,
        registry: &RegistryConfig,
        sink: &mut (dyn Write + Send),
        cancel: &CancellationToken,
        started: Instant,
    ) -> RolloutReport {
        let app = plan.app.to_string();
        let image = plan.release.to_string();

        let rollout = Rollout::new(plan);

        let built = match rollout.build(self.engine, sink).await {
            Ok(built) => built,
            Err((failed, e)) => {
                return failure_report(app, image, failed.tag_outcomes().to_vec(), started, e);
            }
        };

        // Credential material only exists between here and the drop below.
        let credentials = match ScopedCredentials::resolve(registry) {
            Ok(credentials) => credentials,
            Err(e) => {
                return failure_report(app, image, Vec::new(), started, RolloutError::from(e));
            }
        };

        let published = match built
            .publish(self.engine, &credentials, &self.options.push)
            .await
        {
            Ok(published) => published,
            Err((failed, e)) => {
                return failure_report(app, image, failed.tag_outcomes().to_vec(), started, e);
            }
        };
        drop(credentials);

        let completed = match published
            .update(self.platform, &self.options.rollout, cancel)
            .await
        {
            Ok(completed) => completed,
            Err((failed, e)) => {
                return failure_report(app, image, failed.tag_outcomes().to_vec(), started, e);
            }
        };

        let (revision, push_report) = completed.finish();
        tracing::info!(app = %app, revision = %revision, "rollout complete");

        RolloutReport {
            app,
            image,
            revision: Some(revision.to_string()),
            outcome: RolloutOutcome::Succeeded,
            elapsed: started.elapsed(),
            tags: push_report.tags,
            error: None,
        }
    }
}

fn failure_report(
    app: String,
    image: String,
    tags: Vec<TagPush>,
    started: Instant,
    error: RolloutError,
) -> RolloutReport {
    tracing::error!(app = %app, stage = error.stage(), "rollout failed: {}", error);

    RolloutReport {
        app,
        image,
        revision: error.revision().map(|r| r.to_string()),
        outcome: error.outcome(),
        elapsed: started.elapsed(),
        tags,
        error: Some(error.detail()),
    }
}
