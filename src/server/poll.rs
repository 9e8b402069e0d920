// ABOUTME: Fixed-interval readiness polling against the state store
//
// The state store has no change-notification primitive and the server is an
// independent OS process, so readiness is observed by polling: either the
// store shows a record written by the spawned pid, or the child has exited.
// The loop is bounded by a startup timeout so a server that neither writes
// state nor exits cannot hang the caller forever.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::server::launcher::SpawnedProcess;
use crate::server::state::{ServerState, StateFile};

/// Terminal condition of a readiness wait.
#[derive(Debug)]
pub enum PollOutcome {
    /// The spawned server announced itself in the state store.
    Ready(ServerState),
    /// The process exited before announcing readiness.
    Exited { code: Option<i32> },
    /// Neither happened within the startup timeout.
    TimedOut,
}

/// Wait until the spawned process announces readiness or dies.
///
/// A state record only counts when its pid matches the spawned process, so
/// a stale record left by an earlier server can never satisfy readiness.
pub async fn await_ready(
    process: &mut SpawnedProcess,
    store: &StateFile,
    poll_interval: Duration,
    startup_timeout: Duration,
) -> PollOutcome {
    let deadline = Instant::now() + startup_timeout;

    loop {
        if let Some(state) = store.read() {
            if state.pid == process.pid {
                debug!(address = %state.address(), "Server announced readiness");
                return PollOutcome::Ready(state);
            }
        }

        match process.child.try_wait() {
            Ok(Some(status)) => {
                // The server may have written state in its final moments.
                if let Some(state) = store.read() {
                    if state.pid == process.pid {
                        return PollOutcome::Ready(state);
                    }
                }
                debug!(code = ?status.code(), "Server exited before readiness");
                return PollOutcome::Exited {
                    code: status.code(),
                };
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Could not query server process status");
                return PollOutcome::Exited { code: None };
            }
        }

        if Instant::now() >= deadline {
            warn!(
                timeout_secs = startup_timeout.as_secs(),
                "Gave up waiting for server readiness"
            );
            return PollOutcome::TimedOut;
        }

        tokio::time::sleep(poll_interval).await;
    }
}
