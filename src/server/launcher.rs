// ABOUTME: Locates the site-server artifact and spawns it as a detached child
//
// The spawned process outlives this tool: it gets its own process group and
// is never killed on drop. Its stdout/stderr are piped and must be handed to
// the drainer immediately after spawn, before anything blocks on the child.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::server::error::{Result, ServerError};
use crate::server::reuse::LaunchRequest;

/// File name of the server artifact.
pub const SERVER_BIN_NAME: &str = "site-server";

/// Environment variable overriding artifact resolution entirely.
pub const SERVER_BIN_ENV: &str = "SITEUP_SERVER_BIN";

/// Handle to a spawned, detached server process.
pub struct SpawnedProcess {
    pub child: Child,
    pub pid: u32,
    // Keeps a temp-extracted artifact alive until the orchestrator is done;
    // the file is removed on drop and its absence then is not an error.
    _extracted: Option<tempfile::TempDir>,
}

impl SpawnedProcess {
    fn new(mut child: Child, extracted: Option<tempfile::TempDir>) -> Result<Self> {
        let pid = child.id().ok_or_else(|| ServerError::Spawn {
            source: std::io::Error::other("process exited before its pid could be read"),
        })?;
        Ok(Self {
            child,
            pid,
            _extracted: extracted,
        })
    }
}

/// Seam for spawning the server process, so lifecycle logic can be tested
/// without touching the OS.
#[cfg_attr(test, mockall::automock)]
pub trait Launch {
    /// Spawn the server for `request` with `project_root` as its working
    /// directory. Returns as soon as the OS process exists; readiness is
    /// the poller's job.
    fn launch(&self, request: &LaunchRequest, project_root: &Path) -> Result<SpawnedProcess>;
}

/// Resolves the server artifact and spawns it.
pub struct ProcessLauncher {
    installed_dir: PathBuf,
    binary_override: Option<PathBuf>,
}

impl ProcessLauncher {
    /// Launcher using the standard artifact search chain rooted at the
    /// given data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            installed_dir: data_dir.into().join("bin"),
            binary_override: None,
        }
    }

    /// Launcher pinned to a specific server binary. Used by tests and the
    /// `SITEUP_SERVER_BIN` escape hatch.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            installed_dir: PathBuf::new(),
            binary_override: Some(binary.into()),
        }
    }

    /// Find the site-server artifact.
    ///
    /// Search order:
    /// 1. `SITEUP_SERVER_BIN` env override
    /// 2. Sibling to the current executable (bundled production + dev builds)
    /// 3. Installed at `<data dir>/bin/site-server`
    /// 4. Bundled `resources/site-server` next to the executable, copied to
    ///    a temp file
    /// 5. System PATH
    ///
    /// Returns the resolved path, plus the temp dir guard when the artifact
    /// had to be extracted.
    fn resolve_artifact(&self) -> Result<(PathBuf, Option<tempfile::TempDir>)> {
        if let Some(ref binary) = self.binary_override {
            return Ok((binary.clone(), None));
        }

        if let Ok(overridden) = std::env::var(SERVER_BIN_ENV) {
            let path = PathBuf::from(overridden);
            if path.exists() {
                info!("Using site-server ($SITEUP_SERVER_BIN): {}", path.display());
                return Ok((path, None));
            }
        }

        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));

        if let Some(ref dir) = exe_dir {
            let sibling = dir.join(SERVER_BIN_NAME);
            if sibling.exists() {
                info!("Using site-server (sibling): {}", sibling.display());
                return Ok((sibling, None));
            }
        }

        let installed = self.installed_dir.join(SERVER_BIN_NAME);
        if installed.exists() {
            info!("Using site-server (installed): {}", installed.display());
            return Ok((installed, None));
        }

        if let Some(ref dir) = exe_dir {
            let bundled = dir.join("resources").join(SERVER_BIN_NAME);
            if bundled.exists() {
                return self.extract_bundled(&bundled).map(|(p, d)| (p, Some(d)));
            }
        }

        if let Ok(path) = which::which(SERVER_BIN_NAME) {
            info!("Using site-server (PATH): {}", path.display());
            return Ok((path, None));
        }

        Err(ServerError::BinaryNotFound {
            installed_dir: self.installed_dir.clone(),
        })
    }

    /// Copy a bundled artifact out to a temp file it can be executed from.
    fn extract_bundled(&self, bundled: &Path) -> Result<(PathBuf, tempfile::TempDir)> {
        let dir = tempfile::Builder::new()
            .prefix("siteup-server-")
            .tempdir()
            .map_err(|source| ServerError::Spawn { source })?;
        let target = dir.path().join(SERVER_BIN_NAME);

        std::fs::copy(bundled, &target).map_err(|source| ServerError::Spawn { source })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o755))
                .map_err(|source| ServerError::Spawn { source })?;
        }

        info!(
            "Extracted bundled site-server to {}",
            target.display()
        );
        Ok((target, dir))
    }
}

/// Argument vector for the server's command-line contract.
fn build_args(request: &LaunchRequest) -> Vec<String> {
    let mut args = vec![
        "serve".to_string(),
        "--env".to_string(),
        request.environment.as_arg().to_string(),
        "--layout".to_string(),
        request.layout.as_arg().to_string(),
    ];
    if request.environment.is_development() {
        // Runtime dev-mode toggle for the underlying server framework.
        args.push("--dev".to_string());
    }
    args
}

impl Launch for ProcessLauncher {
    fn launch(&self, request: &LaunchRequest, project_root: &Path) -> Result<SpawnedProcess> {
        let (binary, extracted) = self.resolve_artifact()?;
        let args = build_args(request);

        debug!(binary = %binary.display(), args = ?args, "Spawning site-server");

        let mut cmd = Command::new(&binary);
        cmd.args(&args)
            .current_dir(project_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // The parent environment is inherited deliberately: temp-dir and
        // locale variables must propagate for the child to behave correctly
        // on all host platforms.

        // Own process group so the server survives this tool exiting.
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|source| ServerError::Spawn { source })?;

        let process = SpawnedProcess::new(child, extracted)?;
        info!(pid = process.pid, "Spawned site-server");
        Ok(process)
    }
}
