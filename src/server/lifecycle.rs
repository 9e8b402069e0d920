// ABOUTME: Server lifecycle orchestration: start (reuse-or-launch) and stop
//
// Start wires the whole chain: read the state store, decide on reuse, spawn
// the server detached, attach stream drainers before anything blocks, then
// poll the store until the new server announces itself or dies. Stop is the
// complementary path operating on the pid recorded in the store.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::server::drain;
use crate::server::error::{Result, ServerError};
use crate::server::launcher::{Launch, ProcessLauncher};
use crate::server::poll::{self, PollOutcome};
use crate::server::reuse::{resolve, Decision, LaunchRequest};
use crate::server::state::{process_alive, ServerState, StateFile};

/// Successful result of a start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// An existing compatible server satisfies the request; nothing was
    /// spawned.
    AlreadyRunning(ServerState),
    /// A new server was launched and confirmed ready.
    Started(ServerState),
}

impl StartOutcome {
    pub fn state(&self) -> &ServerState {
        match self {
            Self::AlreadyRunning(state) | Self::Started(state) => state,
        }
    }
}

/// Result of a stop request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// Nothing to stop: no record, or the recorded process is already dead.
    NotRunning,
    /// The recorded server was terminated.
    Stopped { address: String },
}

/// Orchestrates the site server's lifecycle against one state store.
pub struct ServerManager {
    state_file: StateFile,
    config: AppConfig,
}

impl ServerManager {
    pub fn new(state_file: StateFile, config: AppConfig) -> Self {
        Self { state_file, config }
    }

    pub fn state_file(&self) -> &StateFile {
        &self.state_file
    }

    /// Start the server, reusing a compatible running instance if allowed.
    pub async fn start(&self, request: LaunchRequest, project_root: &Path) -> Result<StartOutcome> {
        let launcher = ProcessLauncher::new(crate::config::data_dir());
        self.start_with(&launcher, request, project_root).await
    }

    /// Start with an injected launcher.
    pub async fn start_with(
        &self,
        launcher: &dyn Launch,
        request: LaunchRequest,
        project_root: &Path,
    ) -> Result<StartOutcome> {
        let existing = self.state_file.read();

        match (resolve(existing.as_ref(), &request), existing) {
            (Decision::Reuse, Some(state)) => {
                info!(address = %state.address(), "Reusing running server");
                return Ok(StartOutcome::AlreadyRunning(state));
            }
            (Decision::Conflict, Some(state)) => {
                return Err(ServerError::AlreadyRunning {
                    address: state.address(),
                    environment: state.environment,
                });
            }
            (Decision::IncompatibleEnvironment { requested, running }, Some(state)) => {
                return Err(ServerError::IncompatibleEnvironment {
                    requested,
                    running,
                    address: state.address(),
                });
            }
            _ => {
                // No server running (or only a stale record). Launch.
            }
        }

        info!(
            environment = %request.environment,
            layout = %request.layout,
            "Launching site-server"
        );

        let mut process = launcher.launch(&request, project_root)?;

        // Drainers must be attached before any wait on the child, or a
        // chatty server can fill its pipe buffer and stall.
        let stderr = drain::attach(&mut process);

        let outcome = poll::await_ready(
            &mut process,
            &self.state_file,
            self.config.poll_interval(),
            self.config.startup_timeout(),
        )
        .await;

        match outcome {
            PollOutcome::Ready(state) => {
                info!(address = %state.address(), pid = state.pid, "Server is ready");
                Ok(StartOutcome::Started(state))
            }
            PollOutcome::Exited { code } => Err(ServerError::StartupFailed {
                code,
                stderr: stderr.collect().await,
            }),
            PollOutcome::TimedOut => Err(ServerError::StartupTimeout {
                timeout_secs: self.config.startup_timeout_secs,
                stderr: stderr.collect().await,
            }),
        }
    }

    /// Stop the recorded server, if one is alive. Idempotent.
    pub async fn stop(&self) -> Result<StopOutcome> {
        let Some(state) = self.state_file.read() else {
            return Ok(StopOutcome::NotRunning);
        };

        if !state.is_alive() {
            // Stale record from a dead process; clear it.
            self.state_file.remove();
            return Ok(StopOutcome::NotRunning);
        }

        let address = state.address();
        info!(pid = state.pid, address = %address, "Stopping server");

        terminate_gracefully(state.pid)?;

        let deadline = Instant::now() + self.config.stop_timeout();
        while process_alive(state.pid) {
            if Instant::now() >= deadline {
                warn!(pid = state.pid, "Server ignored termination request, killing");
                kill_forcefully(state.pid)?;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        // Brief grace for a SIGKILL to land before declaring victory.
        let kill_deadline = Instant::now() + Duration::from_secs(2);
        while process_alive(state.pid) && Instant::now() < kill_deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        if process_alive(state.pid) {
            return Err(ServerError::Terminate {
                pid: state.pid,
                message: "process still alive after SIGKILL".to_string(),
            });
        }

        // The owner is dead; its record is now meaningless.
        self.state_file.remove();
        info!("Server stopped");
        Ok(StopOutcome::Stopped { address })
    }
}

#[cfg(unix)]
fn terminate_gracefully(pid: u32) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| ServerError::Terminate {
        pid,
        message: "pid out of range".to_string(),
    })?;
    kill(Pid::from_raw(raw), Signal::SIGTERM).map_err(|e| ServerError::Terminate {
        pid,
        message: e.to_string(),
    })
}

#[cfg(unix)]
fn kill_forcefully(pid: u32) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| ServerError::Terminate {
        pid,
        message: "pid out of range".to_string(),
    })?;
    kill(Pid::from_raw(raw), Signal::SIGKILL).map_err(|e| ServerError::Terminate {
        pid,
        message: e.to_string(),
    })
}

#[cfg(not(unix))]
fn terminate_gracefully(pid: u32) -> Result<()> {
    kill_forcefully(pid)
}

#[cfg(not(unix))]
fn kill_forcefully(pid: u32) -> Result<()> {
    std::process::Command::new("taskkill")
        .args(["/F", "/PID", &pid.to_string()])
        .output()
        .map_err(|e| ServerError::Terminate {
            pid,
            message: e.to_string(),
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::launcher::MockLaunch;
    use crate::server::state::{ServerEnvironment, SiteLayout};
    use tempfile::TempDir;

    fn request(environment: ServerEnvironment, reuse_allowed: bool) -> LaunchRequest {
        LaunchRequest {
            environment,
            layout: SiteLayout::Fullstack,
            reuse_allowed,
        }
    }

    fn manager_with_state(dir: &TempDir, state_json: Option<&str>) -> ServerManager {
        let path = dir.path().join("state.json");
        if let Some(json) = state_json {
            std::fs::write(&path, json).unwrap();
        }
        ServerManager::new(StateFile::new(path), AppConfig::default())
    }

    fn live_state_json(environment: &str) -> String {
        format!(
            r#"{{"environment":"{environment}","host":"127.0.0.1","port":8080,"pid":{}}}"#,
            std::process::id()
        )
    }

    #[tokio::test]
    async fn compatible_running_server_is_reused_without_spawning() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with_state(&dir, Some(&live_state_json("production")));

        let mut launcher = MockLaunch::new();
        launcher.expect_launch().times(0);

        let outcome = manager
            .start_with(&launcher, request(ServerEnvironment::Production, true), Path::new("."))
            .await
            .unwrap();

        match outcome {
            StartOutcome::AlreadyRunning(state) => assert_eq!(state.address(), "127.0.0.1:8080"),
            StartOutcome::Started(_) => panic!("must not launch when reusing"),
        }
    }

    #[tokio::test]
    async fn running_server_without_reuse_is_a_conflict_and_no_spawn() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with_state(&dir, Some(&live_state_json("production")));

        let mut launcher = MockLaunch::new();
        launcher.expect_launch().times(0);

        let err = manager
            .start_with(&launcher, request(ServerEnvironment::Production, false), Path::new("."))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::AlreadyRunning { .. }));
    }

    #[tokio::test]
    async fn environment_mismatch_is_rejected_and_no_spawn() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with_state(&dir, Some(&live_state_json("development")));

        let mut launcher = MockLaunch::new();
        launcher.expect_launch().times(0);

        let err = manager
            .start_with(&launcher, request(ServerEnvironment::Production, true), Path::new("."))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServerError::IncompatibleEnvironment {
                requested: ServerEnvironment::Production,
                running: ServerEnvironment::Development,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn launch_error_propagates() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with_state(&dir, None);

        let mut launcher = MockLaunch::new();
        launcher.expect_launch().times(1).returning(|_, _| {
            Err(ServerError::Spawn {
                source: std::io::Error::other("no such file"),
            })
        });

        let err = manager
            .start_with(&launcher, request(ServerEnvironment::Development, true), Path::new("."))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Spawn { .. }));
    }

    #[tokio::test]
    async fn stop_with_no_record_is_not_running() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with_state(&dir, None);
        assert_eq!(manager.stop().await.unwrap(), StopOutcome::NotRunning);
    }

    #[tokio::test]
    async fn stop_clears_a_stale_record() {
        let dir = TempDir::new().unwrap();
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let dead = child.id();
        child.wait().unwrap();

        let manager = manager_with_state(
            &dir,
            Some(&format!(
                r#"{{"environment":"development","port":3000,"pid":{dead}}}"#
            )),
        );

        assert_eq!(manager.stop().await.unwrap(), StopOutcome::NotRunning);
        assert!(manager.state_file().read().is_none());
    }
}
