// ABOUTME: Application-wide error types for ekdosi.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("unknown app: {0}")]
    UnknownApp(String),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("could not determine a revision tag: {0}")]
    Revision(String),

    #[error("container engine unavailable: {0}")]
    Engine(String),

    #[error("platform request failed: {0}")]
    Platform(#[from] crate::platform::PlatformError),

    #[error("hook failed: {0}")]
    Hook(String),

    #[error("rollback failed: {0}")]
    Rollback(String),

    #[error("{0}")]
    Rollout(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
