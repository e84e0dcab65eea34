//! Execution sessions.
//!
//! A session tracks one invocation of the managed binary from start to
//! terminal outcome: the [`ExecState`] machine, the response handler
//! callbacks, and the async/sync execution drivers.

mod async_session;
mod handler;
mod state;
mod sync_session;

pub use async_session::AsyncSession;
pub use handler::{ExecuteHandler, LoadHandler};
pub use state::ExecState;
pub use sync_session::SyncSession;

/// Message passed to `on_failure` when an execution hits its deadline.
pub const TIMED_OUT_MESSAGE: &str = "execution timed out and the process was killed";

/// Message passed to `on_failure` when an execution is cancelled.
pub const CANCELLED_MESSAGE: &str = "execution cancelled by caller";

/// Append an outcome message to the captured output.
fn append_message(output: &str, message: &str) -> String {
    if output.is_empty() {
        message.to_string()
    } else {
        format!("{output}\n{message}")
    }
}
