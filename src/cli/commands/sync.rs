use clap::Args;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::cli::utils::{output_success, to_data};
use crate::cli::OutputFormat;
use crate::config;
use crate::sync::{SyncDirection, SyncReport};

#[derive(Args)]
pub struct SyncArgs {
    #[arg(
        long,
        default_value = "bidirectional",
        help = "bidirectional, source-to-dest (primary to secondary) or dest-to-source"
    )]
    pub direction: SyncDirection,

    #[arg(
        long,
        conflicts_with = "remote",
        required_unless_present = "remote",
        help = "Run in-process as this user; requires the administrator role"
    )]
    pub as_user: Option<Uuid>,

    #[arg(long, requires = "token", help = "Base URL of a running Flock API")]
    pub remote: Option<String>,

    #[arg(long, requires = "remote", help = "Bearer token for --remote")]
    pub token: Option<String>,
}

pub async fn handle(args: SyncArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    match (args.as_user, args.remote, args.token) {
        (_, Some(remote), Some(token)) => sync_remote(&remote, &token, args.direction, &output_format).await,
        (Some(user_id), _, _) => sync_local(user_id, args.direction, &output_format).await,
        _ => anyhow::bail!("either --as-user or --remote with --token is required"),
    }
}

async fn sync_local(user_id: Uuid, direction: SyncDirection, output_format: &OutputFormat) -> anyhow::Result<()> {
    let state = AppState::from_config(config::config())?;
    let report = state.sync.trigger(user_id, direction).await?;

    output_success(output_format, &report.message(), to_data(&report)?)?;
    if let OutputFormat::Text = output_format {
        print_failures(&report);
    }
    Ok(())
}

async fn sync_remote(
    remote: &str,
    token: &str,
    direction: SyncDirection,
    output_format: &OutputFormat,
) -> anyhow::Result<()> {
    let url = format!("{}/api/sync", remote.trim_end_matches('/'));
    let response = reqwest::Client::new()
        .post(&url)
        .bearer_auth(token)
        .json(&json!({ "direction": direction }))
        .send()
        .await?;

    let status = response.status();
    let body: Value = response.json().await?;

    if !status.is_success() {
        let error = body.get("error").and_then(Value::as_str).unwrap_or("request failed");
        anyhow::bail!("{} ({})", error, status);
    }

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Sync completed")
        .to_string();
    output_success(output_format, &message, body.get("data").cloned())
}

fn print_failures(report: &SyncReport) {
    for leg in &report.legs {
        for failure in &leg.failed {
            println!("  ✗ {} -> {} {}: {}", leg.source, leg.destination, failure.id, failure.reason);
        }
    }
}
