// ABOUTME: Rollout plan and the typestate wrapper that walks it forward.
// ABOUTME: Build, publish, and update stages are only reachable in order.

use super::state::{Built, Completed, Planned, Published};
use crate::build::BuildSpec;
use crate::config::{AppConfig, Config};
use crate::error::{Error, Result};
use crate::publish::PushReport;
use crate::types::{AppName, DeploymentTarget, ImageRef, RevisionId};
use nonempty::NonEmpty;
use std::marker::PhantomData;

/// Immutable inputs of one rollout: which app, what to build, where the
/// image goes, and which platform target takes the update.
#[derive(Debug, Clone)]
pub struct RolloutPlan {
    pub app: AppName,
    pub spec: BuildSpec,
    pub repository: ImageRef,
    /// The immutable reference the platform will be pointed at.
    pub release: ImageRef,
    pub target: DeploymentTarget,
}

impl RolloutPlan {
    /// Assemble a plan from config. `revision` becomes the immutable
    /// release tag; the config's alias tag rides along.
    pub fn from_config(config: &Config, app: &AppConfig, revision: &str) -> Result<Self> {
        let repository = config.image_base(app)?;
        let release = repository
            .with_tag(revision)
            .map_err(|e| Error::Revision(format!("invalid tag {}: {}", revision, e)))?;

        let tags = if config.alias_tag == revision {
            NonEmpty::new(revision.to_string())
        } else {
            NonEmpty {
                head: config.alias_tag.clone(),
                tail: vec![revision.to_string()],
            }
        };
        let spec = BuildSpec::new(
            app.build.context.clone(),
            app.build.dockerfile.clone(),
            tags,
        );

        Ok(Self {
            app: app.name.clone(),
            spec,
            repository,
            release,
            target: app.target.clone(),
        })
    }
}

/// A rollout walking through its stages. The type parameter pins which
/// stage comes next; skipping one does not compile.
#[derive(Debug)]
#[must_use = "rollout state must be used"]
pub struct Rollout<S> {
    pub(crate) plan: RolloutPlan,
    pub(crate) images: Vec<ImageRef>,
    pub(crate) pushed: Option<PushReport>,
    pub(crate) revision: Option<RevisionId>,
    pub(crate) _state: PhantomData<S>,
}

impl Rollout<Planned> {
    pub fn new(plan: RolloutPlan) -> Self {
        Rollout {
            plan,
            images: Vec::new(),
            pushed: None,
            revision: None,
            _state: PhantomData,
        }
    }
}

impl<S> Rollout<S> {
    pub fn plan(&self) -> &RolloutPlan {
        &self.plan
    }

    pub fn target(&self) -> &DeploymentTarget {
        &self.plan.target
    }

    /// The immutable reference this rollout deploys.
    pub fn release_image(&self) -> &ImageRef {
        &self.plan.release
    }
}

impl Rollout<Built> {
    /// References that now exist locally, in tag order.
    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }
}

impl Rollout<Published> {
    pub fn push_report(&self) -> &PushReport {
        self.pushed.as_ref().expect("published rollout has a report")
    }
}

impl Rollout<Completed> {
    /// The revision now serving traffic.
    pub fn revision(&self) -> &RevisionId {
        self.revision
            .as_ref()
            .expect("completed rollout has a revision")
    }

    /// Consume the rollout, yielding the revision and push report.
    pub fn finish(self) -> (RevisionId, PushReport) {
        (
            self.revision.expect("completed rollout has a revision"),
            self.pushed.expect("completed rollout has a report"),
        )
    }
}
