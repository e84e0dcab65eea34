//! Error types for ffproc.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for ffproc operations.
///
/// Precondition violations (unsupported hardware, concurrency conflicts,
/// bad arguments) surface synchronously through these variants. Runtime
/// process outcomes never do; they reach the caller only through the
/// response handler callbacks.
#[derive(Error, Debug)]
pub enum FfprocError {
    /// Host hardware is not one of the supported architectures.
    #[error("device architecture is not supported")]
    UnsupportedEnvironment,

    /// A command is already running in the async slot.
    #[error("an FFmpeg command is already running, only one command may run at a time")]
    AlreadyRunning,

    /// Caller-supplied argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The resolved binary does not exist on disk.
    #[error("FFmpeg binary not found at {0}")]
    BinaryNotFound(PathBuf),

    /// Invalid state transition attempted.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: crate::session::ExecState,
        to: crate::session::ExecState,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,
}

/// Convenience Result type for ffproc operations.
pub type Result<T> = std::result::Result<T, FfprocError>;
