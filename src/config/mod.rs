// ABOUTME: Configuration for siteup
// Timing knobs for the readiness poll and stop escalation, loaded from
// project-local then user-level TOML files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Data directory for state, logs and installed artifacts.
///
/// `$SITEUP_DATA_DIR` overrides the default of `~/.siteup`.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SITEUP_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".siteup"))
        .unwrap_or_else(|| PathBuf::from(".siteup"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Interval between readiness checks while waiting for the server.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long to wait for the server to announce readiness before
    /// giving up.
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    /// How long to wait for a graceful exit before force-killing on stop.
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_startup_timeout_secs() -> u64 {
    120
}

fn default_stop_timeout_secs() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            startup_timeout_secs: default_startup_timeout_secs(),
            stop_timeout_secs: default_stop_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the first existing location.
    ///
    /// Precedence:
    /// 1. Local project config (`.siteup/config.toml` in the cwd)
    /// 2. User config (`~/.siteup/config.toml`)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self> {
        for path in Self::config_paths() {
            if path.exists() {
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config from {}", path.display()))?;
                let config: Self = toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config from {}", path.display()))?;
                return Ok(config);
            }
        }
        Ok(Self::default())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join(".siteup").join("config.toml"));
        }
        paths.push(data_dir().join("config.toml"));
        paths
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}
