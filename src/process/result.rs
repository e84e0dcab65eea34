//! Command result type.

use std::process::ExitStatus;

/// Outcome of one process invocation.
///
/// Produced once per execution and immutable thereafter. `success` is true
/// iff the process terminated normally with a zero exit status; `output` is
/// the concatenated stdout and stderr regardless of status.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Captured output (stdout followed by stderr).
    pub output: String,
}

impl CommandResult {
    /// Create a result from an exit status and captured streams.
    pub fn from_status(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Self {
        let mut output = String::from_utf8_lossy(stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(stderr));
        Self {
            success: status.success(),
            output,
        }
    }

    /// Create a failed result carrying a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
        }
    }

    /// Captured output with surrounding whitespace trimmed.
    pub fn output_trimmed(&self) -> &str {
        self.output.trim()
    }
}
