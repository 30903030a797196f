// ABOUTME: Registry publishing: scoped credentials, ordered pushes, retries.
// ABOUTME: Stops at the first failed tag and reports what made it out.

use crate::config::{PushPolicy, RegistryConfig};
use crate::engine::{PushError, PushOps, RegistryAuth};
use crate::types::{DigestId, ImageRef};
use serde::Serialize;

/// Registry credentials resolved for the duration of one publish run.
///
/// Dropping releases the material, so on-exit release does not depend on
/// the run's outcome.
pub struct ScopedCredentials {
    auth: RegistryAuth,
}

impl ScopedCredentials {
    /// Resolve credential references from config. A missing env var is an
    /// auth failure, not a parse error: the run cannot authenticate.
    pub fn resolve(registry: &RegistryConfig) -> Result<Self, PushError> {
        let username = registry
            .username
            .resolve()
            .map_err(|e| PushError::Auth(e.to_string()))?;
        let password = registry
            .password
            .resolve()
            .map_err(|e| PushError::Auth(e.to_string()))?;

        Ok(Self {
            auth: RegistryAuth {
                username,
                password,
                server: registry.host.clone(),
            },
        })
    }

    pub fn auth(&self) -> &RegistryAuth {
        &self.auth
    }
}

impl Drop for ScopedCredentials {
    fn drop(&mut self) {
        self.auth.username.clear();
        self.auth.password.clear();
        tracing::debug!("registry credentials released");
    }
}

/// Outcome of a single tag push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagOutcome {
    Pushed,
    Failed,
    NotAttempted,
}

/// One entry per requested tag, in push order.
#[derive(Debug, Clone, Serialize)]
pub struct TagPush {
    pub tag: String,
    pub outcome: TagOutcome,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<DigestId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What happened to every requested tag. On failure this is how callers
/// see which tags made it out before the abort.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PushReport {
    pub tags: Vec<TagPush>,
}

impl PushReport {
    pub fn all_pushed(&self) -> bool {
        self.tags.iter().all(|t| t.outcome == TagOutcome::Pushed)
    }

    pub fn pushed_count(&self) -> usize {
        self.tags
            .iter()
            .filter(|t| t.outcome == TagOutcome::Pushed)
            .count()
    }
}

/// Pushes every reference in order, aborting at the first failure.
pub struct Publisher<'a, E> {
    engine: &'a E,
    policy: &'a PushPolicy,
}

impl<'a, E: PushOps> Publisher<'a, E> {
    pub fn new(engine: &'a E, policy: &'a PushPolicy) -> Self {
        Self { engine, policy }
    }

    /// Push `images` in the order given. Transport errors are retried per
    /// the backoff policy; any other error aborts the remaining tags.
    pub async fn publish(
        &self,
        images: &[ImageRef],
        credentials: &ScopedCredentials,
    ) -> Result<PushReport, (PushReport, PushError)> {
        let mut report = PushReport::default();

        for (index, image) in images.iter().enumerate() {
            match self.push_with_retry(image, credentials.auth()).await {
                Ok(digest) => {
                    tracing::info!(image = %image, "pushed");
                    report.tags.push(TagPush {
                        tag: image.tag().to_string(),
                        outcome: TagOutcome::Pushed,
                        digest,
                        error: None,
                    });
                }
                Err(e) => {
                    report.tags.push(TagPush {
                        tag: image.tag().to_string(),
                        outcome: TagOutcome::Failed,
                        digest: None,
                        error: Some(e.to_string()),
                    });
                    for remaining in &images[index + 1..] {
                        report.tags.push(TagPush {
                            tag: remaining.tag().to_string(),
                            outcome: TagOutcome::NotAttempted,
                            digest: None,
                            error: None,
                        });
                    }
                    return Err((report, e));
                }
            }
        }

        Ok(report)
    }

    async fn push_with_retry(
        &self,
        image: &ImageRef,
        auth: &RegistryAuth,
    ) -> Result<Option<DigestId>, PushError> {
        let mut attempt = 0;
        loop {
            match self.engine.push_image(image, auth).await {
                Ok(digest) => return Ok(digest),
                Err(e) if e.is_transient() && attempt < self.policy.retries => {
                    let delay = self.policy.backoff.delay(attempt);
                    tracing::warn!(
                        image = %image,
                        attempt = attempt + 1,
                        delay = ?delay,
                        "push failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
