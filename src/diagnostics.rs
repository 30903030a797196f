// ABOUTME: Diagnostics accumulator for non-fatal warnings during a rollout.
// ABOUTME: Collects warnings that shouldn't fail a rollout but should be shown to users.

/// Collects non-fatal warnings during rollout operations.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during a rollout.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Create a hook failure warning.
    pub fn hook_failure(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::HookFailure,
            message: message.into(),
        }
    }

    /// Create a missing digest warning.
    pub fn missing_digest(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::MissingDigest,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during a rollout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A non-fatal hook exited nonzero or failed to run.
    HookFailure,
    /// The registry accepted a push but reported no digest.
    MissingDigest,
}
