// ABOUTME: Deploy command implementation.
// ABOUTME: Resolves the revision, then builds, publishes, and rolls out each app.

use std::env;
use std::io::Write;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use ekdosi::config::Config;
use ekdosi::diagnostics::{Diagnostics, Warning};
use ekdosi::error::{Error, Result};
use ekdosi::hooks::{HookContext, HookPoint, HookRunner};
use ekdosi::output::{Output, OutputMode};
use ekdosi::publish::TagOutcome;
use ekdosi::rollout::{Orchestrator, RolloutOutcome, RolloutPlan, RunOptions, default_state_dir};

use super::connection::{connect_engine, connect_platform};

/// Roll out all selected apps at one revision.
pub async fn deploy(
    config: Config,
    app: Option<&str>,
    revision: Option<String>,
    force: bool,
    mut output: Output,
    cancel: &CancellationToken,
) -> Result<()> {
    output.start_timer();
    let cwd = env::current_dir()?;
    let hook_runner = HookRunner::new(&cwd);
    let mut diag = Diagnostics::default();

    let apps = config.select_apps(app)?;
    let revision = match revision {
        Some(revision) => revision,
        None => detect_revision().await?,
    };

    output.progress(&format!(
        "Rolling out {} app(s) at revision {}",
        apps.len(),
        revision
    ));

    let mut plans = Vec::with_capacity(apps.len());
    for app_config in &apps {
        plans.push(RolloutPlan::from_config(&config, app_config, &revision)?);
    }

    // Run pre-deploy hook for each app (no platform revision exists yet)
    for plan in &plans {
        let context = hook_context(plan, None);

        if let Some(result) = hook_runner.run(HookPoint::PreDeploy, &context).await
            && !result.success
        {
            eprintln!("Pre-deploy hook failed for {}", plan.app);
            if !result.stderr.is_empty() {
                eprintln!("{}", result.stderr);
            }
            return Err(Error::Hook("pre-deploy hook failed".to_string()));
        }
    }

    let engine = connect_engine(&output).await?;
    let platform = connect_platform(&config.platform)?;

    let options = RunOptions {
        push: config.push.clone(),
        rollout: config.rollout.clone(),
        state_dir: default_state_dir(),
        force,
    };
    let orchestrator = Orchestrator::new(&engine, &platform, options);

    let mut sink = build_sink(output.mode());
    let total = plans.len();
    let mut contexts = Vec::with_capacity(total);
    let mut failed = 0usize;

    for plan in plans {
        output.progress(&format!("  → Rolling out {}...", plan.app));
        let mut context = hook_context(&plan, None);

        let report = orchestrator
            .run(plan, &config.registry, sink.as_mut(), cancel)
            .await;
        context.revision = report.revision.clone();

        for tag in &report.tags {
            if tag.outcome == TagOutcome::Pushed && tag.digest.is_none() {
                diag.warn(Warning::missing_digest(format!(
                    "registry reported no digest for {}:{}",
                    report.app, tag.tag
                )));
            }
        }

        output.summary(&report);

        let cancelled = report.outcome == RolloutOutcome::Cancelled;
        if !report.succeeded() {
            failed += 1;

            // Run on-error hook
            if let Some(result) = hook_runner.run(HookPoint::OnError, &context).await
                && !result.success
            {
                diag.warn(Warning::hook_failure(format!(
                    "on-error hook failed for {}",
                    context.app
                )));
            }
        }

        contexts.push(context);

        if cancelled || cancel.is_cancelled() {
            break;
        }
    }

    // Run post-deploy hook for each app once everything landed
    if failed == 0 && !cancel.is_cancelled() {
        for context in &contexts {
            if let Some(result) = hook_runner.run(HookPoint::PostDeploy, context).await
                && !result.success
            {
                diag.warn(Warning::hook_failure(format!(
                    "post-deploy hook failed for {}",
                    context.app
                )));
            }
        }
    }

    // Emit collected warnings
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    if failed > 0 {
        return Err(Error::Rollout(format!(
            "{failed} of {total} rollout(s) failed"
        )));
    }
    if cancel.is_cancelled() {
        return Err(Error::Rollout("rollout cancelled".to_string()));
    }

    output.success("Rollout complete!");
    Ok(())
}

fn hook_context(plan: &RolloutPlan, revision: Option<String>) -> HookContext {
    HookContext {
        app: plan.app.clone(),
        image: plan.release.to_string(),
        target: plan.target.identity(),
        revision,
    }
}

/// Engine build output goes to stdout in normal mode and nowhere otherwise.
fn build_sink(mode: OutputMode) -> Box<dyn Write + Send> {
    match mode {
        OutputMode::Normal => Box::new(std::io::stdout()),
        OutputMode::Quiet | OutputMode::Json => Box::new(std::io::sink()),
    }
}

/// Default revision: the current git commit (short hash), with `-dirty`
/// appended when the tree has uncommitted changes.
async fn detect_revision() -> Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=12", "HEAD"])
        .output()
        .await
        .map_err(|e| Error::Revision(format!("git not available: {}", e)))?;

    if !output.status.success() {
        return Err(Error::Revision(
            "git rev-parse failed; pass --revision explicitly".to_string(),
        ));
    }

    let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if hash.is_empty() {
        return Err(Error::Revision(
            "git reported an empty commit hash".to_string(),
        ));
    }

    let status = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .await;
    let dirty = matches!(&status, Ok(out) if out.status.success() && !out.stdout.is_empty());

    if dirty {
        Ok(format!("{hash}-dirty"))
    } else {
        Ok(hash)
    }
}
