// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod app_name;
mod id;
mod image_ref;
mod target;

pub use app_name::{AppName, AppNameError};
pub use id::{DigestId, RevisionId};
pub use image_ref::{ImageRef, ParseImageRefError};
pub use target::DeploymentTarget;
