// ABOUTME: Retry and polling policies for pushes and rollout watches.
// ABOUTME: Every knob is configurable, with defaults suited to small apps.

use serde::Deserialize;
use std::time::Duration;

/// Retry policy for registry pushes that fail at the transport level.
#[derive(Debug, Clone, Deserialize)]
pub struct PushPolicy {
    #[serde(default = "default_push_retries")]
    pub retries: u32,

    #[serde(default)]
    pub backoff: BackoffPolicy,
}

impl Default for PushPolicy {
    fn default() -> Self {
        Self {
            retries: default_push_retries(),
            backoff: BackoffPolicy::default(),
        }
    }
}

fn default_push_retries() -> u32 {
    3
}

/// Exponential backoff between retry attempts.
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffPolicy {
    #[serde(default = "default_backoff_base", with = "humantime_serde")]
    pub base: Duration,

    #[serde(default = "default_backoff_factor")]
    pub factor: u32,

    #[serde(default = "default_backoff_cap", with = "humantime_serde")]
    pub cap: Duration,
}

impl BackoffPolicy {
    /// Delay before retry `attempt` (zero-based): base * factor^attempt,
    /// capped at `cap`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.factor.saturating_pow(attempt);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: default_backoff_base(),
            factor: default_backoff_factor(),
            cap: default_backoff_cap(),
        }
    }
}

fn default_backoff_base() -> Duration {
    Duration::from_secs(1)
}

fn default_backoff_factor() -> u32 {
    2
}

fn default_backoff_cap() -> Duration {
    Duration::from_secs(8)
}

/// How long to watch a new revision and how often to ask about it.
#[derive(Debug, Clone, Deserialize)]
pub struct RolloutPolicy {
    #[serde(default = "default_rollout_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default)]
    pub poll: PollPolicy,
}

impl Default for RolloutPolicy {
    fn default() -> Self {
        Self {
            timeout: default_rollout_timeout(),
            poll: PollPolicy::default(),
        }
    }
}

fn default_rollout_timeout() -> Duration {
    Duration::from_secs(600)
}

/// Poll cadence: starts at `initial` and doubles up to `ceiling`.
#[derive(Debug, Clone, Deserialize)]
pub struct PollPolicy {
    #[serde(default = "default_poll_initial", with = "humantime_serde")]
    pub initial: Duration,

    #[serde(default = "default_poll_ceiling", with = "humantime_serde")]
    pub ceiling: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial: default_poll_initial(),
            ceiling: default_poll_ceiling(),
        }
    }
}

fn default_poll_initial() -> Duration {
    Duration::from_secs(2)
}

fn default_poll_ceiling() -> Duration {
    Duration::from_secs(15)
}
