//! Response handler traits.
//!
//! Callers observe execution outcomes through these capability-style
//! handlers. All methods default to no-ops so a handler only implements the
//! callbacks it cares about.

/// Receives lifecycle callbacks for one command execution.
///
/// Per execution the callbacks fire in order: `on_start`, zero or more
/// `on_progress`, exactly one of `on_success` / `on_failure`, then
/// `on_finish`. Async sessions invoke these on a background task, not on
/// the context that started the execution.
pub trait ExecuteHandler: Send + Sync {
    /// The process is about to be spawned.
    fn on_start(&self) {}

    /// One line of process output, delivered while the process runs.
    fn on_progress(&self, _line: &str) {}

    /// The process exited with status zero; `output` is the captured output.
    fn on_success(&self, _output: &str) {}

    /// The process failed, timed out, or was cancelled. Timeout and
    /// cancellation carry distinct messages appended to the output.
    fn on_failure(&self, _message: &str) {}

    /// Terminal callback; fires exactly once after success or failure.
    fn on_finish(&self) {}
}

/// Receives callbacks for a binary load/installation request.
pub trait LoadHandler: Send + Sync {
    /// Resolution is starting; the first call may install assets.
    fn on_start(&self) {}

    /// The binary is resolved and ready to execute.
    fn on_success(&self) {}

    /// Resolution failed.
    fn on_failure(&self, _message: &str) {}

    /// Fires exactly once after success or failure.
    fn on_finish(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;
    impl ExecuteHandler for Silent {}
    impl LoadHandler for Silent {}

    #[test]
    fn test_default_methods_are_noops() {
        let handler = Silent;
        ExecuteHandler::on_start(&handler);
        handler.on_progress("frame=  10");
        ExecuteHandler::on_success(&handler, "done");
        ExecuteHandler::on_failure(&handler, "oops");
        ExecuteHandler::on_finish(&handler);
        LoadHandler::on_success(&handler);
    }
}
