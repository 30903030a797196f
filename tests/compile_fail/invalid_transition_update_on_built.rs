// ABOUTME: Compile-fail test verifying update cannot be called before publish.
// ABOUTME: This test should fail to compile, validating stage ordering.

use ekdosi::config::RolloutPolicy;
use ekdosi::platform::PlatformOps;
use ekdosi::rollout::{Built, Rollout};
use tokio_util::sync::CancellationToken;

async fn try_invalid_update<P: PlatformOps>(
    rollout: Rollout<Built>,
    platform: &P,
    policy: &RolloutPolicy,
    cancel: &CancellationToken,
) {
    // ERROR: update() method doesn't exist on Rollout<Built>
    rollout.update(platform, policy, cancel).await;
}

fn main() {}
