// ABOUTME: Compile-fail test verifying publish cannot be called before build.
// ABOUTME: This test should fail to compile, validating stage ordering.

use ekdosi::config::PushPolicy;
use ekdosi::engine::PushOps;
use ekdosi::publish::ScopedCredentials;
use ekdosi::rollout::{Planned, Rollout};

async fn try_invalid_publish<E: PushOps>(
    rollout: Rollout<Planned>,
    engine: &E,
    credentials: &ScopedCredentials,
    policy: &PushPolicy,
) {
    // ERROR: publish() method doesn't exist on Rollout<Planned>
    rollout.publish(engine, credentials, policy).await;
}

fn main() {}
