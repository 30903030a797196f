// ABOUTME: Rollout lock to prevent concurrent rollouts to the same target.
// ABOUTME: Uses atomic file creation with lock info stored in ~/.local/state/ekdosi/.

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::DeploymentTarget;

/// Base directory for ekdosi state files (XDG Base Directory compliant).
const STATE_DIR: &str = ".local/state/ekdosi";

/// Default lock directory under the user's home.
pub fn default_state_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => Path::new(&home).join(STATE_DIR),
        None => PathBuf::from(STATE_DIR),
    }
}

/// Errors acquiring the rollout lock.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("held by {holder} (pid {pid}) since {started_at}")]
    Held {
        holder: String,
        pid: u32,
        started_at: DateTime<Utc>,
    },

    #[error("lock acquired by another process during break")]
    Contended,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to serialize lock info: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Information about who holds a rollout lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// Target being rolled out.
    pub target: String,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new(target: &DeploymentTarget) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            target: target.identity(),
        }
    }

    /// Check if this lock is stale (older than 1 hour).
    pub fn is_stale(&self) -> bool {
        let age = Utc::now() - self.started_at;
        age.num_hours() >= 1
    }

    /// Path to the lock file for a target. Group names are free-form, so
    /// path separators are flattened.
    pub fn lock_path(state_dir: &Path, target: &DeploymentTarget) -> PathBuf {
        let group = target.group.replace(['/', '\\'], "-");
        state_dir.join(format!("{}--{}.lock", group, target.app))
    }
}

/// A held rollout lock that releases on drop.
#[derive(Debug)]
pub struct RolloutLock {
    path: PathBuf,
    released: bool,
}

impl RolloutLock {
    /// Acquire a rollout lock for the given target.
    ///
    /// Uses `create_new` for atomic lock acquisition (no TOCTOU race).
    /// Returns error if lock is already held by another process.
    /// Auto-breaks stale locks (>1 hour) with a warning.
    pub fn acquire(
        state_dir: &Path,
        target: &DeploymentTarget,
        force: bool,
    ) -> Result<Self, LockError> {
        fs::create_dir_all(state_dir)?;

        let path = LockInfo::lock_path(state_dir, target);
        let info = LockInfo::new(target);
        let payload = serde_json::to_vec_pretty(&info)?;

        if Self::try_create(&path, &payload)? {
            return Ok(Self {
                path,
                released: false,
            });
        }

        // Lock file exists. Decide whether it can be broken.
        if let Some(existing) = Self::live_holder(&path, force) {
            return Err(LockError::Held {
                holder: existing.holder,
                pid: existing.pid,
                started_at: existing.started_at,
            });
        }

        // Break the lock and retry
        tracing::debug!(path = %path.display(), "removing stale/forced lock");
        let _ = fs::remove_file(&path);

        if Self::try_create(&path, &payload)? {
            return Ok(Self {
                path,
                released: false,
            });
        }
        Err(LockError::Contended)
    }

    /// Atomically create the lock file. Returns false if it already exists.
    fn try_create(path: &Path, payload: &[u8]) -> Result<bool, LockError> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                file.write_all(payload)?;
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(LockError::Io(e)),
        }
    }

    /// The current holder, when the lock is live and should block us.
    /// Stale, forced, and unreadable locks return None and get broken.
    fn live_holder(path: &Path, force: bool) -> Option<LockInfo> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => {
                tracing::warn!("lock info unreadable, breaking lock");
                return None;
            }
        };

        match serde_json::from_str::<LockInfo>(&raw) {
            Ok(existing) if force => {
                tracing::warn!(
                    "breaking lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                None
            }
            Ok(existing) if existing.is_stale() => {
                tracing::warn!(
                    "auto-breaking stale lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                None
            }
            Ok(existing) => Some(existing),
            Err(_) => {
                tracing::warn!("lock info corrupted, breaking lock");
                None
            }
        }
    }

    /// Release the lock.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if !self.released {
            self.released = true;
            let _ = fs::remove_file(&self.path);
        }
    }
}

impl Drop for RolloutLock {
    fn drop(&mut self) {
        self.remove();
    }
}
