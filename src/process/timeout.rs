//! Deadline tracking for running processes.

use std::time::Duration;

use tokio::time::Instant;

/// Tracks the forced-termination deadline of one execution.
///
/// The deadline is snapshotted when the guard is armed, so later changes to
/// the engine's configured timeout never affect an in-flight execution. An
/// unarmed guard (no timeout configured) never expires. Dropping the guard
/// disarms it; exactly one of natural completion or forced termination
/// happens per execution, and the losing side of that race is a no-op.
#[derive(Debug)]
pub struct TimeoutGuard {
    deadline: Option<Instant>,
}

impl TimeoutGuard {
    /// Arm a guard with `deadline = now + timeout`, or leave it unarmed
    /// when no timeout is configured.
    pub fn arm(timeout: Option<Duration>) -> Self {
        Self {
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    /// An unarmed guard that never expires.
    pub fn unarmed() -> Self {
        Self { deadline: None }
    }

    /// Whether a deadline is set.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolves when the deadline passes; pends forever when unarmed.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }

    /// Synchronous deadline check for blocking poll loops.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
