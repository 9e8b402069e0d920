// ABOUTME: Main entry point for siteup
//
// Binary: siteup
// Usage: siteup <COMMAND>
// - start: launch the background site server (or reuse a running one)
// - stop: terminate the recorded server
// - status: report the recorded server state

#![allow(missing_docs)]

use anyhow::Result;
use clap::Parser;

use siteup::cli;

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    setup_panic_handler();

    let args = cli::Cli::parse();

    match args.command {
        cli::Commands::Start(start_args) => cli::start::execute(start_args, args.format).await,
        cli::Commands::Stop => cli::stop::execute(args.format).await,
        cli::Commands::Status => cli::status::execute(args.format).await,
    }
}

fn setup_logging() {
    use std::fs::OpenOptions;
    use tracing_subscriber::prelude::*;

    // Create log directory if it doesn't exist
    let log_dir = siteup::config::data_dir().join("logs");
    let _ = std::fs::create_dir_all(&log_dir);

    // Create JSONL log file with timestamp
    let log_file = log_dir.join(format!(
        "siteup-{}.jsonl",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));

    let file = OpenOptions::new().create(true).append(true).open(&log_file);

    // Logging is best effort; the CLI must still work without a log file.
    let Ok(file) = file else { return };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()             // Output in JSON Lines format
                .with_target(true)  // Include target module in JSON
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "siteup=info".into()),
        )
        .init();
}

fn setup_panic_handler() {
    use tracing::error;

    std::panic::set_hook(Box::new(|panic_info| {
        error!("Application panicked: {}", panic_info);
        eprintln!("Application panicked: {}", panic_info);
        eprintln!("Please check the logs for more details.");
    }));
}
