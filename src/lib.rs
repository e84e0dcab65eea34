//! # ffproc
//!
//! Single-flight execution manager for a bundled FFmpeg binary.
//!
//! This crate wraps an external FFmpeg executable in a process-execution
//! and concurrency-control layer: it selects the right prebuilt binary for
//! the host architecture, runs at most one command per slot at a time,
//! enforces caller-configured timeouts, and supports forceful cancellation.
//! It contains no media-processing logic of its own.
//!
//! ## Features
//!
//! - **Architecture-aware binary selection**: x86, ARMv7, and ARMv7+NEON
//!   variants, detected once per process
//! - **Single-flight execution**: a new command is rejected while the
//!   previous one is still running
//! - **Async and sync paths**: fire-and-forget sessions with callbacks, or
//!   blocking execution on the caller's thread
//! - **Timeouts and cancellation**: forced termination with distinct
//!   outcome reporting
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ffproc::{DirResolver, ExecuteHandler, FfmpegEngine};
//!
//! struct PrintHandler;
//!
//! impl ExecuteHandler for PrintHandler {
//!     fn on_success(&self, output: &str) {
//!         println!("done: {output}");
//!     }
//!     fn on_failure(&self, message: &str) {
//!         eprintln!("failed: {message}");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> ffproc::Result<()> {
//!     // Initialize logging
//!     ffproc::logging::try_init().ok();
//!
//!     let resolver = Arc::new(DirResolver::new("/opt/ffmpeg"));
//!     let engine = FfmpegEngine::new(resolver);
//!
//!     engine.execute(None, "-i input.mp4 output.mkv", Arc::new(PrintHandler))?;
//!
//!     while engine.is_running() {
//!         tokio::time::sleep(std::time::Duration::from_millis(100)).await;
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod arch;
pub mod binary;
pub mod engine;
pub mod error;
pub mod logging;
pub mod process;
pub mod session;

// Re-export commonly used types
pub use arch::ArchTag;
pub use binary::{BinaryResolver, DirResolver, BINARY_NAME};
pub use engine::{FfmpegEngine, BUNDLED_FFMPEG_VERSION, MINIMUM_TIMEOUT};
pub use error::{FfprocError, Result};
pub use process::{CommandResult, ProcessRunner, TimeoutGuard};
pub use session::{AsyncSession, ExecState, ExecuteHandler, LoadHandler, SyncSession};
