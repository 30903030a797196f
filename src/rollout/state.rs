// ABOUTME: Rollout state marker types for the type state pattern.
// ABOUTME: Zero-sized types enforce valid stage ordering at compile time.

/// Initial state: plan assembled, nothing built yet.
/// Available actions: `build()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Planned;

/// Image built: every requested tag exists locally.
/// Available actions: `publish()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Built;

/// Published: every tag accepted by the registry.
/// Available actions: `update()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Published;

/// Completed: the platform reports the new revision healthy.
/// Available actions: `revision()`, `finish()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Completed;
