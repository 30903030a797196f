// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::time::Instant;

use crate::publish::TagOutcome;
use crate::rollout::{RolloutOutcome, RolloutReport};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                // Print only the essential result
                println!("{message}");
            }
            OutputMode::Json => {
                self.json_event("success", message);
            }
        }
    }

    /// Print a non-fatal warning.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Warning: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "warning",
                    message,
                    duration_secs: None,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    duration_secs: if self.start_time.is_some() {
                        Some(self.elapsed_secs())
                    } else {
                        None
                    },
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    /// Print the final per-app rollout summary.
    pub fn summary(&self, report: &RolloutReport) {
        match self.mode {
            OutputMode::Normal => {
                println!(
                    "{}: {} in {:.1}s",
                    report.app,
                    outcome_label(report.outcome),
                    report.elapsed.as_secs_f64()
                );
                if let Some(ref revision) = report.revision {
                    println!("  revision: {revision}");
                }
                for tag in &report.tags {
                    match tag.outcome {
                        TagOutcome::Pushed => match &tag.digest {
                            Some(digest) => println!("  pushed {} ({})", tag.tag, digest),
                            None => println!("  pushed {}", tag.tag),
                        },
                        TagOutcome::Failed => {
                            let detail = tag.error.as_deref().unwrap_or("unknown error");
                            println!("  failed {}: {}", tag.tag, detail);
                        }
                        TagOutcome::NotAttempted => {
                            println!("  skipped {}", tag.tag);
                        }
                    }
                }
            }
            OutputMode::Quiet => match report.revision {
                Some(ref revision) => {
                    println!("{} {} {}", report.app, outcome_label(report.outcome), revision);
                }
                None => {
                    println!("{} {}", report.app, outcome_label(report.outcome));
                }
            },
            OutputMode::Json => {
                if let Ok(json) = serde_json::to_string(report) {
                    println!("{json}");
                }
            }
        }
    }

    fn json_event(&self, event: &str, message: &str) {
        let event = JsonEvent {
            event,
            message,
            duration_secs: if self.start_time.is_some() {
                Some(self.elapsed_secs())
            } else {
                None
            },
        };
        if let Ok(json) = serde_json::to_string(&event) {
            println!("{json}");
        }
    }
}

fn outcome_label(outcome: RolloutOutcome) -> &'static str {
    match outcome {
        RolloutOutcome::Succeeded => "succeeded",
        RolloutOutcome::Failed => "failed",
        RolloutOutcome::TimedOut => "timed out",
        RolloutOutcome::Cancelled => "cancelled",
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}
