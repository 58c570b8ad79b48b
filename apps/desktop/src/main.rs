use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, HttpToolApi, MissingDecoderSurface, SessionEvent, ToolSession,
    TransitionOutcome,
};
use shared::domain::{ToolRecord, ToolStatus};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    /// Overrides `api_base_url` from tool_client.toml and the environment.
    #[arg(long)]
    api_base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Lookup { tool_id: String },
    Lend { tool_id: String },
    Return { tool_id: String },
    ReportBroken { tool_id: String },
    Repair { tool_id: String },
}

impl Command {
    fn tool_id(&self) -> &str {
        match self {
            Command::Lookup { tool_id }
            | Command::Lend { tool_id }
            | Command::Return { tool_id }
            | Command::ReportBroken { tool_id }
            | Command::Repair { tool_id } => tool_id,
        }
    }

    fn target(&self) -> Option<ToolStatus> {
        match self {
            Command::Lookup { .. } => None,
            Command::Lend { .. } => Some(ToolStatus::Lent),
            Command::Return { .. } | Command::Repair { .. } => Some(ToolStatus::Available),
            Command::ReportBroken { .. } => Some(ToolStatus::Broken),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(url) = cli.api_base_url.clone() {
        settings.api_base_url = url;
    }
    info!(api = %settings.api_base_url, "tool_desk: starting");

    let api = Arc::new(
        HttpToolApi::new(&settings.api_base_url, settings.request_timeout())
            .with_context(|| format!("invalid api base url: {}", settings.api_base_url))?,
    );
    let session = ToolSession::new(&settings, api, Arc::new(MissingDecoderSurface));
    let mut events = session.subscribe_events();

    session
        .set_identifier(cli.command.tool_id())
        .await
        .context("failed to start lookup")?;
    let wait = settings.lookup_debounce() + settings.request_timeout() * 2;
    let record = tokio::time::timeout(wait, async {
        loop {
            match events.recv().await {
                Ok(SessionEvent::RecordLoaded(record)) => return Ok(record),
                Ok(SessionEvent::LookupFailed { message, .. }) => return Err(anyhow!(message)),
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return Err(anyhow!("session ended during lookup")),
            }
        }
    })
    .await
    .map_err(|_| anyhow!("timed out waiting for tool {}", cli.command.tool_id()))??;

    print_record(&record);

    if let Some(target) = cli.command.target() {
        let outcome = session.request_transition(target).await;
        let state = session.snapshot();
        session.close().await;
        match outcome {
            Ok(TransitionOutcome::Updated(_)) | Ok(TransitionOutcome::Unchanged) => {
                if let Some(message) = state.last_message {
                    println!("{message}");
                }
            }
            Err(err) => bail!(err.user_message()),
        }
    } else {
        session.close().await;
    }

    Ok(())
}

fn print_record(record: &ToolRecord) {
    println!("{} {}", record.id, record.display_name());
    println!("  {:<9} {}", "status", record.status.label());
    let details = [
        ("model", record.model_number.as_str()),
        ("type", record.tool_type.as_str()),
        ("location", record.storage_location.as_str()),
        ("remarks", record.remarks.as_str()),
    ];
    for (label, value) in details {
        if !value.trim().is_empty() {
            println!("  {label:<9} {value}");
        }
    }
}
