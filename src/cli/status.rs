// ABOUTME: CLI status command
//
// Reads the shared state file and reports whether the recorded server is
// actually alive. Never launches or kills anything.

use anyhow::Result;
use serde::Serialize;

use super::OutputFormat;
use crate::server::StateFile;

/// JSON output structure for the status command
#[derive(Debug, Serialize)]
struct StatusOutput {
    running: bool,
    address: Option<String>,
    environment: Option<String>,
    pid: Option<u32>,
}

#[allow(clippy::unused_async)] // async for routing consistency with the other commands
pub async fn execute(format: OutputFormat) -> Result<()> {
    let state = StateFile::at_default_location().read_live();

    match format {
        OutputFormat::Text => match &state {
            Some(state) => {
                println!(
                    "A {} server is running at http://{} (pid {})",
                    state.environment,
                    state.address(),
                    state.pid
                );
            }
            None => println!("No server is running."),
        },
        OutputFormat::Json => {
            let output = match state {
                Some(state) => StatusOutput {
                    running: true,
                    address: Some(state.address()),
                    environment: Some(state.environment.to_string()),
                    pid: Some(state.pid),
                },
                None => StatusOutput {
                    running: false,
                    address: None,
                    environment: None,
                    pid: None,
                },
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
