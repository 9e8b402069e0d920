// ABOUTME: Persisted server state record and the file-backed state store
//
// The launched site-server announces itself by writing a small JSON record
// (environment, address, pid) to a well-known path. The orchestrator only
// ever reads that record; a missing, unreadable or corrupt file is simply
// "no known server". A record whose owning pid is dead is stale and treated
// the same way.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

const STATE_FILENAME: &str = "state.json";

/// Mode the site server runs in. Chosen at launch time, persisted in state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ServerEnvironment {
    Development,
    Production,
}

impl ServerEnvironment {
    /// Value passed on the server's command line.
    pub const fn as_arg(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    /// Whether the runtime dev-mode toggle should be passed to the server.
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl fmt::Display for ServerEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

/// How the served site's assets are organized on disk. Passed to the server
/// at launch, not persisted in state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SiteLayout {
    /// Static-export layout: prebuilt assets served as-is.
    Static,
    /// Framework-managed layout with a live application backend.
    Fullstack,
}

impl SiteLayout {
    /// Value passed on the server's command line.
    pub const fn as_arg(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Fullstack => "fullstack",
        }
    }
}

impl fmt::Display for SiteLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

/// Last known status of a server instance, as written by the server itself.
///
/// Parsing is tolerant: unknown fields are ignored and optional fields
/// default to absent, so newer servers can extend the record without
/// breaking older orchestrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerState {
    pub environment: ServerEnvironment,

    /// Host the server bound to.
    #[serde(default = "default_host")]
    pub host: String,

    pub port: u16,

    /// Pid of the process that wrote this record. The record is only
    /// meaningful while that process is alive.
    pub pid: u32,

    /// Server version, if the server reports one.
    #[serde(default)]
    pub version: Option<String>,

    /// When the server bound its endpoint.
    #[serde(default)]
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl ServerState {
    /// Displayable address of the server, e.g. `127.0.0.1:8080`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether the process that wrote this record is still alive.
    pub fn is_alive(&self) -> bool {
        process_alive(self.pid)
    }
}

/// Check whether a process with the given pid is currently running.
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }

    // Signal 0 probes existence without delivering anything. EPERM still
    // means the process exists, just under another user.
    matches!(kill(Pid::from_raw(pid), None), Ok(()) | Err(Errno::EPERM))
}

/// Check whether a process with the given pid is currently running (Windows).
#[cfg(not(unix))]
pub fn process_alive(pid: u32) -> bool {
    std::process::Command::new("tasklist")
        .args(["/FI", &format!("PID eq {pid}"), "/NH", "/FO", "CSV"])
        .output()
        .map(|o| String::from_utf8_lossy(&o.stdout).contains(&format!("\"{pid}\"")))
        .unwrap_or(false)
}

/// File-backed store for the server state record.
///
/// Single writer (the server process), multiple readers (orchestrator
/// invocations). Reads never fail: any problem degrades to `None`.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// State file at the default location under the data directory.
    pub fn at_default_location() -> Self {
        Self::new(crate::config::data_dir().join("server").join(STATE_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the last persisted state, or `None` if the file is absent or
    /// unparsable. Idempotent; safe to call in a polling loop.
    pub fn read(&self) -> Option<ServerState> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "No readable state file");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                // A torn or corrupt record is "state unknown, not running".
                debug!(path = %self.path.display(), error = %e, "Ignoring unparsable state file");
                None
            }
        }
    }

    /// Read the last persisted state, discarding records whose owning
    /// process is no longer alive.
    pub fn read_live(&self) -> Option<ServerState> {
        let state = self.read()?;
        if state.is_alive() {
            Some(state)
        } else {
            debug!(pid = state.pid, "Ignoring stale state record from dead process");
            None
        }
    }

    /// Remove the state file. Only the stop path calls this, after the
    /// owning process is confirmed dead. Best effort.
    pub fn remove(&self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write_state(dir: &TempDir, content: &str) -> StateFile {
        let path = dir.path().join("state.json");
        fs::write(&path, content).unwrap();
        StateFile::new(path)
    }

    /// Pid of a process that has already been reaped.
    fn dead_pid() -> u32 {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        pid
    }

    #[test]
    fn read_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = StateFile::new(dir.path().join("state.json"));
        assert_eq!(store.read(), None);
    }

    #[test]
    fn read_garbage_is_none() {
        let dir = TempDir::new().unwrap();
        let store = write_state(&dir, "not json at all {");
        assert_eq!(store.read(), None);
    }

    #[test]
    fn read_tolerates_unknown_and_missing_optional_fields() {
        let dir = TempDir::new().unwrap();
        let store = write_state(
            &dir,
            r#"{"environment":"production","port":8080,"pid":42,"some_future_field":true}"#,
        );

        let state = store.read().unwrap();
        assert_eq!(state.environment, ServerEnvironment::Production);
        assert_eq!(state.host, "127.0.0.1");
        assert_eq!(state.port, 8080);
        assert_eq!(state.pid, 42);
        assert_eq!(state.version, None);
        assert_eq!(state.started_at, None);
    }

    #[test]
    fn read_rejects_record_missing_required_fields() {
        let dir = TempDir::new().unwrap();
        let store = write_state(&dir, r#"{"environment":"production","port":8080}"#);
        assert_eq!(store.read(), None);
    }

    #[test]
    fn read_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = write_state(
            &dir,
            r#"{"environment":"development","host":"0.0.0.0","port":3000,"pid":7}"#,
        );
        assert_eq!(store.read(), store.read());
    }

    #[test]
    fn read_live_discards_dead_owner() {
        let dir = TempDir::new().unwrap();
        let store = write_state(
            &dir,
            &format!(r#"{{"environment":"development","port":3000,"pid":{}}}"#, dead_pid()),
        );
        assert!(store.read().is_some());
        assert_eq!(store.read_live(), None);
    }

    #[test]
    fn read_live_keeps_live_owner() {
        let dir = TempDir::new().unwrap();
        let store = write_state(
            &dir,
            &format!(
                r#"{{"environment":"development","port":3000,"pid":{}}}"#,
                std::process::id()
            ),
        );
        assert!(store.read_live().is_some());
    }

    #[test]
    fn address_formats_host_and_port() {
        let state = ServerState {
            environment: ServerEnvironment::Production,
            host: "127.0.0.1".to_string(),
            port: 8080,
            pid: 1,
            version: None,
            started_at: None,
        };
        assert_eq!(state.address(), "127.0.0.1:8080");
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = write_state(&dir, "{}");
        store.remove();
        store.remove();
        assert_eq!(store.read(), None);
    }
}
