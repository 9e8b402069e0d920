// ABOUTME: CLI start command
//
// Starts the site server (or reports the one already running) and prints
// where to reach it. Text output is for humans; JSON carries the full state.

use anyhow::{Context, Result};
use serde::Serialize;

use super::{OutputFormat, StartArgs};
use crate::config::AppConfig;
use crate::server::{LaunchRequest, ServerManager, StartOutcome, StateFile};

/// JSON output structure for the start command
#[derive(Debug, Serialize)]
struct StartOutput<'a> {
    status: &'a str,
    address: String,
    environment: String,
    pid: u32,
}

pub async fn execute(args: StartArgs, format: OutputFormat) -> Result<()> {
    let config = AppConfig::load()?;
    let manager = ServerManager::new(StateFile::at_default_location(), config);

    let project_root = match args.path {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let request = LaunchRequest {
        environment: args.env,
        layout: args.layout,
        reuse_allowed: !args.no_reuse,
    };

    let outcome = manager.start(request, &project_root).await?;

    match format {
        OutputFormat::Text => match &outcome {
            StartOutcome::AlreadyRunning(state) => {
                println!("A server is already running at http://{}", state.address());
            }
            StartOutcome::Started(state) => {
                println!("A server is now running at http://{}", state.address());
            }
        },
        OutputFormat::Json => {
            let status = match &outcome {
                StartOutcome::AlreadyRunning(_) => "already-running",
                StartOutcome::Started(_) => "started",
            };
            let state = outcome.state();
            let output = StartOutput {
                status,
                address: state.address(),
                environment: state.environment.to_string(),
                pid: state.pid,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
