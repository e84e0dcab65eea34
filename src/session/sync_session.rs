//! Synchronous execution session.

use std::collections::HashMap;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{append_message, ExecState, ExecuteHandler, CANCELLED_MESSAGE, TIMED_OUT_MESSAGE};
use crate::process::{ProcessRunner, TimeoutGuard};

/// Poll interval while waiting for the process to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One synchronous invocation of the managed binary.
///
/// Same states and callback contract as [`super::AsyncSession`], but
/// [`SyncSession::run`] blocks the calling thread until the execution
/// reaches `Completed`; callbacks are invoked on that thread just before
/// the call returns. The session is cheaply cloneable so another thread
/// can hold a handle and call [`SyncSession::cancel`] while `run` blocks.
#[derive(Clone)]
pub struct SyncSession {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<ExecState>,
    completed: AtomicBool,
    cancel_requested: AtomicBool,
}

impl SyncSession {
    /// Create a session in the `Idle` state.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ExecState::Idle),
                completed: AtomicBool::new(false),
                cancel_requested: AtomicBool::new(false),
            }),
        }
    }

    /// Run the command to completion on the calling thread.
    ///
    /// The deadline is snapshotted from `timeout` on entry. Blocks until a
    /// terminal outcome is reached, which may be forced from another thread
    /// via [`SyncSession::cancel`].
    pub fn run(
        &self,
        command_line: &str,
        env: Option<&HashMap<String, String>>,
        timeout: Option<Duration>,
        handler: &dyn ExecuteHandler,
    ) {
        handler.on_start();
        self.advance(ExecState::Running);

        let mut child = match ProcessRunner::spawn_std(command_line, env) {
            Ok(child) => child,
            Err(err) => {
                warn!(%err, "failed to spawn process");
                self.finish(ExecState::Failed, handler, |h| {
                    h.on_failure(&format!("failed to spawn process: {err}"))
                });
                return;
            }
        };

        let stdout = child.stdout.take().map(spawn_drain_thread);
        let stderr = child.stderr.take().map(spawn_drain_thread);

        let guard = TimeoutGuard::arm(timeout);
        let mut forced = false;
        let outcome = loop {
            if self.shared.cancel_requested.load(Ordering::SeqCst) {
                forced = true;
                break ExecState::Cancelled;
            }
            if guard.is_expired() {
                warn!("execution deadline passed, killing process");
                forced = true;
                break ExecState::TimedOut;
            }
            match child.try_wait() {
                Ok(Some(status)) if status.success() => break ExecState::Succeeded,
                Ok(Some(status)) => {
                    debug!(?status, "process exited with failure status");
                    break ExecState::Failed;
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(err) => {
                    warn!(%err, "failed polling process status");
                    forced = true;
                    break ExecState::Failed;
                }
            }
        };

        if forced {
            // Kill may race a natural exit; either way the process is gone
            // and wait reaps it.
            let _ = child.kill();
            let _ = child.wait();
        }

        let mut output = stdout.map(join_drain_thread).unwrap_or_default();
        output.push_str(&stderr.map(join_drain_thread).unwrap_or_default());

        match outcome {
            ExecState::Succeeded => {
                info!("execution finished successfully");
                self.finish(outcome, handler, |h| h.on_success(&output));
            }
            ExecState::Failed => {
                self.finish(outcome, handler, |h| h.on_failure(&output));
            }
            ExecState::TimedOut => {
                let message = append_message(&output, TIMED_OUT_MESSAGE);
                self.finish(outcome, handler, |h| h.on_failure(&message));
            }
            ExecState::Cancelled => {
                let message = append_message(&output, CANCELLED_MESSAGE);
                self.finish(outcome, handler, |h| h.on_failure(&message));
            }
            _ => unreachable!("poll loop only breaks with a terminal outcome"),
        }
    }

    /// Request forced termination of a blocked `run` call.
    ///
    /// Idempotent; a no-op once the session has completed.
    pub fn cancel(&self) {
        if self.is_completed() {
            debug!("cancel requested after completion, ignoring");
            return;
        }
        if !self.shared.cancel_requested.swap(true, Ordering::SeqCst) {
            info!("cancelling running synchronous execution");
        }
    }

    /// True once the finish callback has been dispatched.
    pub fn is_completed(&self) -> bool {
        self.shared.completed.load(Ordering::Acquire)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ExecState {
        self.shared
            .state
            .lock()
            .map(|s| *s)
            .unwrap_or(ExecState::Completed)
    }

    fn advance(&self, target: ExecState) {
        if let Ok(mut state) = self.shared.state.lock() {
            if let Err(err) = state.transition_to(target) {
                warn!(%err, "rejected session state transition");
            }
        }
    }

    fn finish<F>(&self, outcome: ExecState, handler: &dyn ExecuteHandler, dispatch: F)
    where
        F: FnOnce(&dyn ExecuteHandler),
    {
        self.advance(outcome);
        dispatch(handler);
        self.advance(ExecState::Completed);
        self.shared.completed.store(true, Ordering::Release);
        handler.on_finish();
    }
}

impl Default for SyncSession {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_drain_thread<R>(mut reader: R) -> std::thread::JoinHandle<String>
where
    R: Read + Send + 'static,
{
    std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = reader.read_to_string(&mut buf);
        buf
    })
}

fn join_drain_thread(handle: std::thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, event: impl Into<String>) {
            self.events.lock().unwrap().push(event.into());
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ExecuteHandler for Recorder {
        fn on_start(&self) {
            self.push("start");
        }
        fn on_success(&self, output: &str) {
            self.push(format!("success:{output}"));
        }
        fn on_failure(&self, message: &str) {
            self.push(format!("failure:{message}"));
        }
        fn on_finish(&self) {
            self.push("finish");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_run_blocks_until_complete() {
        let session = SyncSession::new();
        let recorder = Recorder::default();

        session.run("/bin/echo sync hello", None, None, &recorder);

        // run has returned, so everything must already have fired
        assert!(session.is_completed());
        assert_eq!(session.state(), ExecState::Completed);
        let events = recorder.events();
        assert_eq!(events.first().map(String::as_str), Some("start"));
        assert!(events.iter().any(|e| e.contains("sync hello")));
        assert_eq!(events.last().map(String::as_str), Some("finish"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_timeout() {
        let session = SyncSession::new();
        let recorder = Recorder::default();

        session.run(
            "/bin/sleep 30",
            None,
            Some(Duration::from_millis(100)),
            &recorder,
        );

        let events = recorder.events();
        let failure = events
            .iter()
            .find(|e| e.starts_with("failure:"))
            .expect("timeout must surface as failure");
        assert!(failure.contains(TIMED_OUT_MESSAGE));
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_from_other_thread_unblocks() {
        let session = SyncSession::new();
        let canceller = session.clone();

        let thread = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            canceller.cancel();
        });

        let recorder = Recorder::default();
        let start = std::time::Instant::now();
        session.run("/bin/sleep 30", None, None, &recorder);
        thread.join().unwrap();

        // Unblocked by the cancel, not the sleep running its course
        assert!(start.elapsed() < Duration::from_secs(10));
        let failure = recorder
            .events()
            .into_iter()
            .find(|e| e.starts_with("failure:"))
            .expect("cancel must surface as failure");
        assert!(failure.contains(CANCELLED_MESSAGE));
    }

    #[test]
    fn test_cancel_after_completion_is_noop() {
        let session = SyncSession::new();
        let recorder = Recorder::default();

        session.run("/nonexistent/ffproc-test-binary", None, None, &recorder);
        assert!(session.is_completed());

        session.cancel();
        session.cancel();

        let finishes = recorder
            .events()
            .iter()
            .filter(|e| e.as_str() == "finish")
            .count();
        assert_eq!(finishes, 1);
    }

    #[test]
    fn test_spawn_failure_reports_failure() {
        let session = SyncSession::new();
        let recorder = Recorder::default();

        session.run("/nonexistent/ffproc-test-binary", None, None, &recorder);

        let events = recorder.events();
        assert!(events
            .iter()
            .any(|e| e.starts_with("failure:") && e.contains("failed to spawn")));
        assert_eq!(events.last().map(String::as_str), Some("finish"));
    }
}
