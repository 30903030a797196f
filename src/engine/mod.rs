// ABOUTME: Container engine access: build and push capabilities.
// ABOUTME: DockerEngine implements the traits over the local Docker socket.

mod build;
mod detection;
mod docker;
mod push;

pub use build::{BuildEngineError, BuildOps};
pub use detection::{DetectionError, EngineInfo, detect_engine};
pub use docker::DockerEngine;
pub use push::{PushError, PushOps, RegistryAuth};
