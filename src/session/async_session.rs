//! Asynchronous execution session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

use super::{append_message, ExecState, ExecuteHandler, CANCELLED_MESSAGE, TIMED_OUT_MESSAGE};
use crate::process::{ProcessRunner, TimeoutGuard};

/// One asynchronous invocation of the managed binary.
///
/// `start` spawns a background task that owns the process, streams output
/// lines to the handler, and races natural exit against the timeout guard
/// and cancellation. The caller observes progress only through the handler
/// callbacks or by polling [`AsyncSession::is_completed`].
pub struct AsyncSession {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<ExecState>,
    completed: AtomicBool,
    cancel_requested: AtomicBool,
    cancel: Notify,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(ExecState::Idle),
            completed: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
            cancel: Notify::new(),
        }
    }

    fn advance(&self, target: ExecState) {
        if let Ok(mut state) = self.state.lock() {
            if let Err(err) = state.transition_to(target) {
                warn!(%err, "rejected session state transition");
            }
        }
    }

    fn state(&self) -> ExecState {
        self.state.lock().map(|s| *s).unwrap_or(ExecState::Completed)
    }
}

impl AsyncSession {
    /// Start an execution.
    ///
    /// The deadline is snapshotted here from `timeout` (`None` leaves the
    /// guard unarmed). Callbacks fire on the spawned task, in the order
    /// start, progress*, success|failure, finish.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(
        command_line: String,
        env: Option<HashMap<String, String>>,
        timeout: Option<Duration>,
        handler: Arc<dyn ExecuteHandler>,
    ) -> Self {
        let shared = Arc::new(Shared::new());
        let task_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            run(task_shared, command_line, env, timeout, handler).await;
        });
        Self { shared }
    }

    /// True once the finish callback has been dispatched.
    pub fn is_completed(&self) -> bool {
        self.shared.completed.load(Ordering::Acquire)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ExecState {
        self.shared.state()
    }

    /// Request forced termination.
    ///
    /// Idempotent and never fails: calling this on a completed session is a
    /// no-op, and repeat calls while running have no additional effect.
    pub fn cancel(&self) {
        if self.is_completed() {
            debug!("cancel requested after completion, ignoring");
            return;
        }
        if !self.shared.cancel_requested.swap(true, Ordering::SeqCst) {
            info!("cancelling running execution");
        }
        self.shared.cancel.notify_one();
    }
}

async fn run(
    shared: Arc<Shared>,
    command_line: String,
    env: Option<HashMap<String, String>>,
    timeout: Option<Duration>,
    handler: Arc<dyn ExecuteHandler>,
) {
    handler.on_start();
    shared.advance(ExecState::Running);

    let mut child = match ProcessRunner::spawn(&command_line, env.as_ref()) {
        Ok(child) => child,
        Err(err) => {
            warn!(%err, "failed to spawn process");
            finish(&shared, ExecState::Failed, &handler, |h| {
                h.on_failure(&format!("failed to spawn process: {err}"))
            });
            return;
        }
    };

    let (tx, mut rx) = mpsc::channel::<String>(64);
    if let Some(stdout) = child.stdout.take() {
        spawn_line_reader(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_reader(stderr, tx.clone());
    }
    drop(tx);

    let guard = TimeoutGuard::arm(timeout);
    let mut output = String::new();
    let mut streams_open = true;

    // Exactly one of the three terminating branches wins; the losers are
    // cancelled with the select, so a late natural exit after a kill (or a
    // pending timer after a natural exit) cannot produce a second outcome.
    let outcome = loop {
        tokio::select! {
            line = rx.recv(), if streams_open => match line {
                Some(line) => {
                    handler.on_progress(&line);
                    output.push_str(&line);
                    output.push('\n');
                }
                None => streams_open = false,
            },
            status = child.wait() => {
                break match status {
                    Ok(status) if status.success() => ExecState::Succeeded,
                    Ok(status) => {
                        debug!(?status, "process exited with failure status");
                        ExecState::Failed
                    }
                    Err(err) => {
                        warn!(%err, "failed waiting for process");
                        ExecState::Failed
                    }
                };
            }
            _ = guard.expired() => {
                warn!("execution deadline passed, killing process");
                break ExecState::TimedOut;
            }
            _ = shared.cancel.notified() => {
                break ExecState::Cancelled;
            }
        }
    };

    if matches!(outcome, ExecState::TimedOut | ExecState::Cancelled) {
        // Forced termination; kill also reaps the exit status.
        let _ = child.kill().await;
    }

    // Drain whatever the pipes still hold; the readers hit EOF once the
    // process is gone.
    while let Some(line) = rx.recv().await {
        handler.on_progress(&line);
        output.push_str(&line);
        output.push('\n');
    }

    match outcome {
        ExecState::Succeeded => {
            info!("execution finished successfully");
            finish(&shared, outcome, &handler, |h| h.on_success(&output));
        }
        ExecState::Failed => {
            finish(&shared, outcome, &handler, |h| h.on_failure(&output));
        }
        ExecState::TimedOut => {
            let message = append_message(&output, TIMED_OUT_MESSAGE);
            finish(&shared, outcome, &handler, |h| h.on_failure(&message));
        }
        ExecState::Cancelled => {
            let message = append_message(&output, CANCELLED_MESSAGE);
            finish(&shared, outcome, &handler, |h| h.on_failure(&message));
        }
        _ => unreachable!("select loop only breaks with a terminal outcome"),
    }
}

fn finish<F>(shared: &Shared, outcome: ExecState, handler: &Arc<dyn ExecuteHandler>, dispatch: F)
where
    F: FnOnce(&dyn ExecuteHandler),
{
    shared.advance(outcome);
    dispatch(handler.as_ref());
    shared.advance(ExecState::Completed);
    shared.completed.store(true, Ordering::Release);
    handler.on_finish();
}

fn spawn_line_reader<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
}
