// ABOUTME: Status command implementation.
// ABOUTME: Lists platform revisions for each configured app.

use ekdosi::config::Config;
use ekdosi::error::Result;
use ekdosi::output::{Output, OutputMode};
use ekdosi::platform::{PlatformOps, RevisionRecord};

use super::connection::connect_platform;

/// Show revisions for all selected apps, newest first.
pub async fn status(config: Config, app: Option<&str>, output: Output) -> Result<()> {
    let apps = config.select_apps(app)?;
    let platform = connect_platform(&config.platform)?;

    for app_config in apps {
        let revisions = platform.list_revisions(&app_config.target).await?;

        match output.mode() {
            OutputMode::Json => {
                let line = serde_json::json!({
                    "app": app_config.name.to_string(),
                    "target": app_config.target.identity(),
                    "revisions": revisions,
                });
                println!("{line}");
            }
            OutputMode::Normal | OutputMode::Quiet => {
                println!("{} ({})", app_config.name, app_config.target.identity());
                if revisions.is_empty() {
                    println!("  no revisions");
                }
                for revision in &revisions {
                    println!("{}", format_revision(revision));
                }
            }
        }
    }

    Ok(())
}

fn format_revision(revision: &RevisionRecord) -> String {
    let marker = if revision.active { "*" } else { " " };
    let mut line = format!("  {} {} {}", marker, revision.name, revision.phase);

    if let Some(ref image) = revision.image {
        line.push_str(&format!(" {}", image));
    }
    if let Some(created_at) = revision.created_at {
        line.push_str(&format!(" ({})", created_at.format("%Y-%m-%d %H:%M UTC")));
    }
    line
}
