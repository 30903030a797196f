// ABOUTME: Command module aggregator for the ekdosi CLI.
// ABOUTME: Re-exports deploy, status, and rollback command handlers.

mod connection;
mod deploy;
mod rollback;
mod status;

pub use deploy::deploy;
pub use rollback::rollback;
pub use status::status;
