// ABOUTME: Rollout orchestration using the type state pattern.
// ABOUTME: Exports state markers, the Rollout struct, and the orchestrator.

mod error;
mod lock;
mod orchestrate;
mod plan;
mod report;
mod rollback;
mod state;
mod transitions;
mod watch;

pub use error::{RolloutError, RolloutErrorKind};
pub use lock::{LockError, LockInfo, RolloutLock, default_state_dir};
pub use orchestrate::{Orchestrator, RunOptions};
pub use plan::{Rollout, RolloutPlan};
pub use report::{ErrorDetail, RolloutOutcome, RolloutReport};
pub use rollback::{RollbackError, reactivate_previous};
pub use state::{Built, Completed, Planned, Published};
pub use transitions::TransitionResult;
pub use watch::{WatchOutcome, watch_revision};
