// ABOUTME: Rollback command implementation.
// ABOUTME: Routes traffic back to the previous healthy revision of each app.

use tokio_util::sync::CancellationToken;

use ekdosi::config::Config;
use ekdosi::error::{Error, Result};
use ekdosi::output::Output;
use ekdosi::rollout::{RollbackError, RolloutLock, default_state_dir, reactivate_previous};

use super::connection::connect_platform;

/// Roll back all selected apps to their previous healthy revision.
pub async fn rollback(
    config: Config,
    app: Option<&str>,
    force: bool,
    mut output: Output,
    cancel: &CancellationToken,
) -> Result<()> {
    output.start_timer();
    let apps = config.select_apps(app)?;
    let platform = connect_platform(&config.platform)?;

    output.progress(&format!("Rolling back {} app(s)", apps.len()));

    for app_config in apps {
        let target = &app_config.target;
        output.progress(&format!("  → Rolling back {}...", app_config.name));

        // Same lock as deploy: a rollback is a rollout too.
        let lock = RolloutLock::acquire(&default_state_dir(), target, force).map_err(|e| {
            Error::Rollback(format!("target {} is locked: {}", target.identity(), e))
        })?;

        let result = reactivate_previous(&platform, target, &config.rollout, cancel).await;
        lock.release();

        match result {
            Ok(revision) => {
                output.progress(&format!("  ✓ {} back on {}", app_config.name, revision));
            }
            Err(RollbackError::Platform(e)) => return Err(Error::Platform(e)),
            Err(e) => return Err(Error::Rollback(e.to_string())),
        }
    }

    output.success("Rollback complete!");
    Ok(())
}
