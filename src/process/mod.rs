//! Process spawning and supervision primitives.
//!
//! [`ProcessRunner`] turns a composed command line into an OS process with
//! captured output, for both the async (tokio) and blocking (std) paths.
//! [`TimeoutGuard`] holds the deadline an execution snapshotted at start
//! and decides when a still-running process must be force-terminated.

mod result;
mod runner;
mod timeout;

pub use result::CommandResult;
pub use runner::ProcessRunner;
pub use timeout::TimeoutGuard;
