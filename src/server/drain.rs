// ABOUTME: Concurrent draining of the spawned server's output streams
//
// Hosts give children a small pipe buffer; a stream nobody reads can stall
// the child indefinitely. Both streams are therefore consumed from the
// moment of attachment: stdout is discarded, stderr is kept for diagnosis
// if the start operation ultimately fails. A closed pipe ends a drain task
// silently; it is a normal terminal condition, not a failure.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::trace;

use crate::server::launcher::SpawnedProcess;

/// Accumulated stderr of a draining process.
pub struct StderrCapture {
    buf: Arc<Mutex<String>>,
    task: Option<JoinHandle<()>>,
}

impl StderrCapture {
    /// Collect whatever stderr has been produced so far.
    ///
    /// Waits briefly for the drain task to reach end-of-stream so that a
    /// just-exited process's final lines are included; if the process is
    /// still running, returns what is buffered.
    pub async fn collect(mut self) -> String {
        if let Some(task) = self.task.take() {
            let _ = tokio::time::timeout(Duration::from_secs(2), task).await;
        }
        match self.buf.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Attach drain tasks to both output streams of a freshly spawned process.
///
/// Must be called before any blocking wait on the child.
pub fn attach(process: &mut SpawnedProcess) -> StderrCapture {
    if let Some(stdout) = process.child.stdout.take() {
        tokio::spawn(async move {
            let mut stdout = stdout;
            let mut sink = tokio::io::sink();
            // Content is unused today but must still be read to completion.
            let _ = tokio::io::copy(&mut stdout, &mut sink).await;
            trace!("stdout drain reached end of stream");
        });
    }

    let buf = Arc::new(Mutex::new(String::new()));
    let task = process.child.stderr.take().map(|stderr| {
        let buf = Arc::clone(&buf);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Ok(mut guard) = buf.lock() {
                    guard.push_str(&line);
                    guard.push('\n');
                }
            }
            trace!("stderr drain reached end of stream");
        })
    });

    StderrCapture { buf, task }
}
