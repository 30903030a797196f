// ABOUTME: Image building: spec validation, context packing, engine driving.
// ABOUTME: Produces one locally tagged ImageRef per requested tag.

mod context;

pub use context::archive_context;

use crate::engine::{BuildEngineError, BuildOps};
use crate::types::ImageRef;
use nonempty::NonEmpty;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// What to build: where the context lives, which Dockerfile to use, and
/// the tags to apply to the result.
#[derive(Debug, Clone)]
pub struct BuildSpec {
    context: PathBuf,
    dockerfile: PathBuf,
    tags: NonEmpty<String>,
}

impl BuildSpec {
    pub fn new(context: PathBuf, dockerfile: PathBuf, tags: NonEmpty<String>) -> Self {
        Self {
            context,
            dockerfile,
            tags,
        }
    }

    pub fn context(&self) -> &Path {
        &self.context
    }

    /// Dockerfile path relative to the context root.
    pub fn dockerfile(&self) -> &Path {
        &self.dockerfile
    }

    pub fn tags(&self) -> &NonEmpty<String> {
        &self.tags
    }
}

/// Errors from the build stage.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("build context does not exist: {0}")]
    ContextMissing(PathBuf),

    #[error("dockerfile does not exist: {0}")]
    DockerfileMissing(PathBuf),

    #[error("invalid tag {tag}: {reason}")]
    InvalidTag { tag: String, reason: String },

    #[error("failed to archive build context: {0}")]
    Archive(#[from] std::io::Error),

    #[error("{0}")]
    Engine(String),
}

impl BuildError {
    /// Which part failed: assembling the context locally, or compiling it
    /// on the engine.
    pub fn stage(&self) -> &'static str {
        match self {
            BuildError::ContextMissing(_)
            | BuildError::DockerfileMissing(_)
            | BuildError::InvalidTag { .. }
            | BuildError::Archive(_) => "context",
            BuildError::Engine(_) => "compile",
        }
    }
}

impl From<BuildEngineError> for BuildError {
    fn from(e: BuildEngineError) -> Self {
        BuildError::Engine(e.to_string())
    }
}

/// Drives one image build against an engine.
pub struct ImageBuilder<'a, E> {
    engine: &'a E,
}

impl<'a, E: BuildOps> ImageBuilder<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Validate the spec, pack the context, and build. Returns the refs
    /// that now exist locally, in tag order. Engine output goes to `sink`.
    pub async fn build(
        &self,
        repository: &ImageRef,
        spec: &BuildSpec,
        sink: &mut (dyn Write + Send),
    ) -> Result<Vec<ImageRef>, BuildError> {
        if !spec.context.is_dir() {
            return Err(BuildError::ContextMissing(spec.context.clone()));
        }

        let dockerfile = spec.context.join(&spec.dockerfile);
        if !dockerfile.is_file() {
            return Err(BuildError::DockerfileMissing(dockerfile));
        }

        let mut refs = Vec::with_capacity(spec.tags.len());
        for tag in spec.tags.iter() {
            let reference = repository
                .with_tag(tag)
                .map_err(|e| BuildError::InvalidTag {
                    tag: tag.clone(),
                    reason: e.to_string(),
                })?;
            refs.push(reference);
        }

        tracing::info!(context = %spec.context.display(), tags = refs.len(), "building image");
        let archive = archive_context(&spec.context)?;

        let dockerfile_path = spec.dockerfile.to_string_lossy().into_owned();
        let mut progress = |line: &str| {
            let _ = writeln!(sink, "{}", line);
        };
        self.engine
            .build_image(archive, &dockerfile_path, &refs, &mut progress)
            .await?;

        Ok(refs)
    }
}
