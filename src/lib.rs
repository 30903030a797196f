// ABOUTME: Library root for ekdosi - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod build;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod output;
pub mod platform;
pub mod publish;
pub mod rollout;
pub mod types;
