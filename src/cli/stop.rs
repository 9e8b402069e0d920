// ABOUTME: CLI stop command
//
// Terminates the recorded server process via the state store's liveness
// identifier. A missing or stale record is a successful no-op.

use anyhow::Result;
use serde::Serialize;

use super::OutputFormat;
use crate::config::AppConfig;
use crate::server::{ServerManager, StateFile, StopOutcome};

/// JSON output structure for the stop command
#[derive(Debug, Serialize)]
struct StopOutput<'a> {
    status: &'a str,
    address: Option<String>,
}

pub async fn execute(format: OutputFormat) -> Result<()> {
    let config = AppConfig::load()?;
    let manager = ServerManager::new(StateFile::at_default_location(), config);

    let outcome = manager.stop().await?;

    match format {
        OutputFormat::Text => match &outcome {
            StopOutcome::NotRunning => println!("No server is running."),
            StopOutcome::Stopped { address } => {
                println!("Stopped the server that was running at http://{address}");
            }
        },
        OutputFormat::Json => {
            let output = match outcome {
                StopOutcome::NotRunning => StopOutput {
                    status: "not-running",
                    address: None,
                },
                StopOutcome::Stopped { address } => StopOutput {
                    status: "stopped",
                    address: Some(address),
                },
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
