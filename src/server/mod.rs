// ABOUTME: Site-server lifecycle management
//
// Orchestrates a long-running background server process on behalf of the
// CLI: discover an already-running instance through the shared state file,
// decide on reuse, spawn detached, drain output streams, and poll until the
// server announces readiness.
//
// Key components:
// - state: persisted state record and the file-backed store
// - reuse: pure reuse-or-launch decision over a state snapshot
// - launcher: artifact resolution and detached process spawning
// - drain: concurrent output draining to avoid pipe-buffer deadlock
// - poll: fixed-interval readiness wait
// - lifecycle: the start/stop orchestration tying it together

pub mod drain;
pub mod error;
pub mod launcher;
pub mod lifecycle;
pub mod poll;
pub mod reuse;
pub mod state;

// Re-exports for convenient access
pub use error::{Result, ServerError};
pub use launcher::{Launch, ProcessLauncher, SpawnedProcess};
pub use lifecycle::{ServerManager, StartOutcome, StopOutcome};
pub use poll::PollOutcome;
pub use reuse::{resolve, Decision, LaunchRequest};
pub use state::{process_alive, ServerEnvironment, ServerState, SiteLayout, StateFile};
