// ABOUTME: Error taxonomy for server lifecycle operations
//
// All failures are terminal for the operation that raised them; there is no
// retry anywhere in this crate. Retrying, if desired, is the caller's call.

use std::path::PathBuf;

use thiserror::Error;

use crate::server::state::ServerEnvironment;

/// Errors that can occur while starting or stopping the site server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// A server is already running and the request forbids reusing it.
    #[error("a {environment} server is already running at {address}; stop it or allow reuse")]
    AlreadyRunning {
        address: String,
        environment: ServerEnvironment,
    },

    /// A server is running in a different environment than requested.
    #[error("a {running} server is already running at {address}, but {requested} was requested")]
    IncompatibleEnvironment {
        requested: ServerEnvironment,
        running: ServerEnvironment,
        address: String,
    },

    /// The site-server artifact could not be located anywhere.
    #[error(
        "site-server binary not found (searched $SITEUP_SERVER_BIN, next to the \
         executable, {}, bundled resources and PATH)",
        .installed_dir.display()
    )]
    BinaryNotFound { installed_dir: PathBuf },

    /// The OS refused to spawn the child process.
    #[error("failed to spawn site-server: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    /// The server exited before announcing readiness.
    #[error("server exited before becoming ready (exit code {code:?}){}", format_stderr(.stderr))]
    StartupFailed { code: Option<i32>, stderr: String },

    /// The server neither announced readiness nor exited within the bound.
    #[error("server did not become ready within {timeout_secs}s{}", format_stderr(.stderr))]
    StartupTimeout { timeout_secs: u64, stderr: String },

    /// The running server could not be terminated.
    #[error("failed to terminate server process {pid}: {message}")]
    Terminate { pid: u32, message: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\nserver output:\n{trimmed}")
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_failure_message_includes_captured_stderr() {
        let err = ServerError::StartupFailed {
            code: Some(3),
            stderr: "missing config file\n".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("exit code Some(3)"));
        assert!(message.contains("missing config file"));
    }

    #[test]
    fn startup_failure_message_omits_empty_stderr() {
        let err = ServerError::StartupFailed {
            code: None,
            stderr: String::new(),
        };
        assert!(!err.to_string().contains("server output"));
    }
}
