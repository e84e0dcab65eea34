//! Engine facade.
//!
//! [`FfmpegEngine`] is the single entry point callers hold, usually behind
//! an `Arc`. It owns at most one outstanding asynchronous session and at
//! most one outstanding synchronous session, enforces the single-flight
//! invariant on the async slot, applies the configured timeout, and
//! dispatches to the binary resolver and process runner.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::arch;
use crate::binary::BinaryResolver;
use crate::error::FfprocError;
use crate::process::ProcessRunner;
use crate::session::{AsyncSession, ExecuteHandler, LoadHandler, SyncSession};
use crate::Result;

/// Smallest timeout a caller may configure. Values below this floor are
/// silently ignored by [`FfmpegEngine::set_timeout`].
pub const MINIMUM_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Version of the FFmpeg build shipped with the binary assets.
pub const BUNDLED_FFMPEG_VERSION: &str = "4.2.1";

/// Execution manager for the bundled FFmpeg binary.
///
/// Explicitly constructed and explicitly owned; there is no hidden global
/// instance. All methods take `&self`, so one engine value can be shared
/// across threads behind an `Arc`.
///
/// The async slot rejects a new [`FfmpegEngine::execute`] while its current
/// session is unfinished. The sync slot carries no such guard: synchronous
/// execution is meant for callers that manage their own dispatch, one call
/// at a time, matching the reference behavior.
pub struct FfmpegEngine {
    resolver: Arc<dyn BinaryResolver>,
    /// Configured timeout; `None` means unbounded. Each execution snapshots
    /// this at start, so changing it never affects an in-flight deadline.
    timeout: Mutex<Option<Duration>>,
    async_slot: Mutex<Option<AsyncSession>>,
    sync_slot: Mutex<Option<SyncSession>>,
    load_task: Mutex<Option<JoinHandle<()>>>,
}

impl FfmpegEngine {
    /// Create an engine over the given binary resolver.
    pub fn new(resolver: Arc<dyn BinaryResolver>) -> Self {
        Self {
            resolver,
            timeout: Mutex::new(None),
            async_slot: Mutex::new(None),
            sync_slot: Mutex::new(None),
            load_task: Mutex::new(None),
        }
    }

    /// Detect the host architecture and resolve the matching binary,
    /// reporting the outcome through `handler`.
    ///
    /// Fails immediately with [`FfprocError::UnsupportedEnvironment`] when
    /// the hardware matches no binary variant; no installation is attempted
    /// in that case. Fails with [`FfprocError::AlreadyRunning`] while a
    /// previous load is still in flight. Resolution itself runs on a
    /// background task since the first call may extract assets.
    ///
    /// Must be called within a tokio runtime.
    pub fn load_binary(&self, handler: Arc<dyn LoadHandler>) -> Result<()> {
        let tag = arch::detect();
        if !tag.is_supported() {
            return Err(FfprocError::UnsupportedEnvironment);
        }

        let mut load_slot = self.load_task.lock().map_err(|_| FfprocError::LockPoisoned)?;
        if let Some(task) = load_slot.as_ref() {
            if !task.is_finished() {
                return Err(FfprocError::AlreadyRunning);
            }
        }
        info!(?tag, "loading FFmpeg binary");

        let resolver = Arc::clone(&self.resolver);
        let task = tokio::spawn(async move {
            handler.on_start();
            let resolved =
                tokio::task::spawn_blocking(move || resolver.resolve_for_arch(tag)).await;
            match resolved {
                Ok(Ok(path)) => {
                    info!(path = %path.display(), "FFmpeg binary ready");
                    handler.on_success();
                }
                Ok(Err(err)) => {
                    warn!(%err, "binary resolution failed");
                    handler.on_failure(&err.to_string());
                }
                Err(err) => {
                    warn!(%err, "binary resolution task failed");
                    handler.on_failure(&format!("binary resolution aborted: {err}"));
                }
            }
            handler.on_finish();
        });

        *load_slot = Some(task);
        Ok(())
    }

    /// Start an asynchronous execution of `<resolved-binary> <command>`.
    ///
    /// Fails with [`FfprocError::AlreadyRunning`] while the previous async
    /// session is unfinished and with [`FfprocError::InvalidArgument`] for a
    /// blank command. `command` must not include the binary name. Outcomes
    /// reach the caller only through `handler`.
    ///
    /// Must be called within a tokio runtime.
    pub fn execute(
        &self,
        env: Option<HashMap<String, String>>,
        command: &str,
        handler: Arc<dyn ExecuteHandler>,
    ) -> Result<()> {
        let mut slot = self.async_slot.lock().map_err(|_| FfprocError::LockPoisoned)?;
        if let Some(session) = slot.as_ref() {
            if !session.is_completed() {
                return Err(FfprocError::AlreadyRunning);
            }
        }
        if command.trim().is_empty() {
            return Err(FfprocError::InvalidArgument("command cannot be empty".into()));
        }

        let binary = self.resolver.resolve_default(env.as_ref())?;
        let command_line = format!("{} {}", binary.display(), command);
        let timeout = self.configured_timeout();
        info!(%command, "starting FFmpeg execution");

        *slot = Some(AsyncSession::start(command_line, env, timeout, handler));
        Ok(())
    }

    /// True while the async slot holds an unfinished session.
    pub fn is_running(&self) -> bool {
        self.async_slot
            .lock()
            .map(|slot| slot.as_ref().is_some_and(|s| !s.is_completed()))
            .unwrap_or(false)
    }

    /// Cancel the running async session and any in-flight binary load.
    ///
    /// Returns true iff both terminations succeeded or there was nothing
    /// to terminate. Safe to call at any time.
    pub fn kill_all(&self) -> bool {
        let execution_killed = match self.async_slot.lock() {
            Ok(slot) => {
                if let Some(session) = slot.as_ref() {
                    session.cancel();
                }
                true
            }
            Err(_) => false,
        };

        let load_killed = match self.load_task.lock() {
            Ok(mut task) => {
                if let Some(task) = task.take() {
                    task.abort();
                }
                true
            }
            Err(_) => false,
        };

        execution_killed && load_killed
    }

    /// Configure the execution timeout applied to subsequent executions.
    ///
    /// Silently ignored when `timeout` is below [`MINIMUM_TIMEOUT`]; this is
    /// not an error. In-flight executions keep their snapshotted deadline.
    pub fn set_timeout(&self, timeout: Duration) {
        if timeout < MINIMUM_TIMEOUT {
            warn!(?timeout, "ignoring timeout below the minimum floor");
            return;
        }
        if let Ok(mut slot) = self.timeout.lock() {
            *slot = Some(timeout);
        }
    }

    /// Query the version of the installed binary by running `-version`.
    ///
    /// Returns an empty string on any failure (unresolvable binary, spawn
    /// failure, non-zero exit); version queries never raise. Blocks the
    /// calling thread and bypasses the async slot.
    pub fn device_version(&self) -> String {
        let Ok(binary) = self.resolver.resolve_default(None) else {
            return String::new();
        };
        let command_line = format!("{} -version", binary.display());
        match ProcessRunner::run_blocking(&command_line, None) {
            Ok(result) if result.success => result
                .output
                .split_whitespace()
                .nth(2)
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        }
    }

    /// Version of the FFmpeg build shipped with the binary assets. No
    /// process execution involved.
    pub fn bundled_version(&self) -> &'static str {
        BUNDLED_FFMPEG_VERSION
    }

    /// Run `<resolved-binary> <command>` synchronously on the calling
    /// thread, invoking `handler` callbacks before returning.
    ///
    /// Uses the independent sync slot; the facade does not guard against a
    /// concurrent sync execution (single ownership of the slot is the
    /// caller's contract). `cancel_sync` from another thread unblocks the
    /// call with the cancelled outcome.
    pub fn execute_sync(&self, command: &str, handler: &dyn ExecuteHandler) -> Result<()> {
        if command.trim().is_empty() {
            return Err(FfprocError::InvalidArgument("command cannot be empty".into()));
        }

        let binary = self.resolver.resolve_default(None)?;
        let command_line = format!("{} {}", binary.display(), command);
        let timeout = self.configured_timeout();
        info!(%command, "starting synchronous FFmpeg execution");

        let session = SyncSession::new();
        {
            let mut slot = self.sync_slot.lock().map_err(|_| FfprocError::LockPoisoned)?;
            *slot = Some(session.clone());
        }
        session.run(&command_line, None, timeout, handler);
        Ok(())
    }

    /// Cancel the running synchronous session, if any. Safe no-op otherwise.
    pub fn cancel_sync(&self) {
        if let Ok(slot) = self.sync_slot.lock() {
            if let Some(session) = slot.as_ref() {
                session.cancel();
            }
        }
    }

    /// True while the sync slot holds an unfinished session.
    pub fn is_sync_running(&self) -> bool {
        self.sync_slot
            .lock()
            .map(|slot| slot.as_ref().is_some_and(|s| !s.is_completed()))
            .unwrap_or(false)
    }

    fn configured_timeout(&self) -> Option<Duration> {
        self.timeout.lock().map(|t| *t).unwrap_or(None)
    }
}
