// ABOUTME: Decides whether an existing server satisfies a start request
//
// Pure decision logic over a state-file snapshot and the requested launch
// parameters: launch fresh, reuse the running instance, or refuse.

use crate::server::state::{ServerEnvironment, ServerState, SiteLayout};

/// Parameters for one start request.
#[derive(Debug, Clone, Copy)]
pub struct LaunchRequest {
    pub environment: ServerEnvironment,
    pub layout: SiteLayout,
    /// Whether an already-running compatible server may satisfy this request.
    pub reuse_allowed: bool,
}

/// Outcome of weighing an existing server against a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No server is running (no record, or a stale record from a dead
    /// process). Proceed to launch.
    NoExistingServer,
    /// A compatible server is already running and may be reused.
    Reuse,
    /// A server is running but the request forbids reuse.
    Conflict,
    /// A server is running in a different environment; reusing it would
    /// silently serve the wrong mode.
    IncompatibleEnvironment {
        requested: ServerEnvironment,
        running: ServerEnvironment,
    },
}

/// Decide how a start request relates to the recorded server state.
pub fn resolve(existing: Option<&ServerState>, request: &LaunchRequest) -> Decision {
    let Some(state) = existing else {
        return Decision::NoExistingServer;
    };

    if !state.is_alive() {
        return Decision::NoExistingServer;
    }

    if !request.reuse_allowed {
        return Decision::Conflict;
    }

    if state.environment != request.environment {
        return Decision::IncompatibleEnvironment {
            requested: request.environment,
            running: state.environment,
        };
    }

    Decision::Reuse
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn state(environment: ServerEnvironment, pid: u32) -> ServerState {
        ServerState {
            environment,
            host: "127.0.0.1".to_string(),
            port: 8080,
            pid,
            version: None,
            started_at: None,
        }
    }

    fn request(environment: ServerEnvironment, reuse_allowed: bool) -> LaunchRequest {
        LaunchRequest {
            environment,
            layout: SiteLayout::Fullstack,
            reuse_allowed,
        }
    }

    /// Pid of the test process itself: guaranteed alive.
    fn live_pid() -> u32 {
        std::process::id()
    }

    /// Pid of a process that has already been reaped.
    fn dead_pid() -> u32 {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        pid
    }

    #[test]
    fn no_record_means_no_existing_server() {
        for reuse in [true, false] {
            assert_eq!(
                resolve(None, &request(ServerEnvironment::Production, reuse)),
                Decision::NoExistingServer
            );
        }
    }

    #[test]
    fn dead_owner_means_no_existing_server_regardless_of_request() {
        let stale = state(ServerEnvironment::Production, dead_pid());
        for env in [ServerEnvironment::Development, ServerEnvironment::Production] {
            for reuse in [true, false] {
                assert_eq!(
                    resolve(Some(&stale), &request(env, reuse)),
                    Decision::NoExistingServer
                );
            }
        }
    }

    #[test]
    fn alive_server_without_reuse_is_a_conflict() {
        let running = state(ServerEnvironment::Development, live_pid());
        assert_eq!(
            resolve(Some(&running), &request(ServerEnvironment::Development, false)),
            Decision::Conflict
        );
    }

    #[test]
    fn alive_server_in_other_environment_is_never_reused() {
        let running = state(ServerEnvironment::Development, live_pid());
        assert_eq!(
            resolve(Some(&running), &request(ServerEnvironment::Production, true)),
            Decision::IncompatibleEnvironment {
                requested: ServerEnvironment::Production,
                running: ServerEnvironment::Development,
            }
        );
    }

    #[test]
    fn alive_matching_server_is_reused() {
        let running = state(ServerEnvironment::Production, live_pid());
        assert_eq!(
            resolve(Some(&running), &request(ServerEnvironment::Production, true)),
            Decision::Reuse
        );
    }
}
