//! Execution state machine.

/// Lifecycle state of one execution.
///
/// Exactly one terminal-outcome transition happens per execution, followed
/// by `Completed` once the finish callback has been dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecState {
    /// Execution has been created but the process is not yet running.
    #[default]
    Idle,
    /// The process is running.
    Running,
    /// The process exited normally with status zero.
    Succeeded,
    /// The process exited with a non-zero status or failed to spawn.
    Failed,
    /// The process was force-terminated at its deadline.
    TimedOut,
    /// The process was force-terminated by an explicit cancel.
    Cancelled,
    /// All callbacks have fired; no further mutation is permitted.
    Completed,
}

impl ExecState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Idle -> Running
    /// - Running -> Succeeded | Failed | TimedOut | Cancelled
    /// - Succeeded | Failed | TimedOut | Cancelled -> Completed
    ///
    /// Spawn failures surface as Running -> Failed: the session enters
    /// Running when the start callback fires, before the spawn attempt.
    pub fn can_transition_to(&self, target: ExecState) -> bool {
        use ExecState::*;
        matches!(
            (*self, target),
            (Idle, Running)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, TimedOut)
                | (Running, Cancelled)
                | (Succeeded, Completed)
                | (Failed, Completed)
                | (TimedOut, Completed)
                | (Cancelled, Completed)
        )
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(&mut self, target: ExecState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::FfprocError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// True for the outcome states that precede `Completed`.
    pub fn is_terminal_outcome(&self) -> bool {
        matches!(
            self,
            ExecState::Succeeded | ExecState::Failed | ExecState::TimedOut | ExecState::Cancelled
        )
    }

    /// True once all callbacks have fired.
    pub fn is_completed(&self) -> bool {
        matches!(self, ExecState::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut state = ExecState::Idle;
        assert!(state.transition_to(ExecState::Running).is_ok());
        assert!(state.transition_to(ExecState::Succeeded).is_ok());
        assert!(state.is_terminal_outcome());
        assert!(state.transition_to(ExecState::Completed).is_ok());
        assert!(state.is_completed());
    }

    #[test]
    fn test_each_outcome_reaches_completed() {
        for outcome in [
            ExecState::Succeeded,
            ExecState::Failed,
            ExecState::TimedOut,
            ExecState::Cancelled,
        ] {
            let mut state = ExecState::Running;
            assert!(state.transition_to(outcome).is_ok());
            assert!(state.transition_to(ExecState::Completed).is_ok());
        }
    }

    #[test]
    fn test_spawn_failure_goes_through_running() {
        let mut state = ExecState::Idle;
        assert!(state.transition_to(ExecState::Failed).is_err());
        state.transition_to(ExecState::Running).unwrap();
        assert!(state.transition_to(ExecState::Failed).is_ok());
        assert!(state.transition_to(ExecState::Completed).is_ok());
    }

    #[test]
    fn test_no_second_terminal_outcome() {
        let mut state = ExecState::Running;
        state.transition_to(ExecState::TimedOut).unwrap();
        assert!(state.transition_to(ExecState::Cancelled).is_err());
        assert!(state.transition_to(ExecState::Succeeded).is_err());
        // State unchanged after rejected transitions
        assert_eq!(state, ExecState::TimedOut);
    }

    #[test]
    fn test_completed_is_final() {
        let mut state = ExecState::Completed;
        assert!(state.transition_to(ExecState::Running).is_err());
        assert!(state.transition_to(ExecState::Idle).is_err());
        assert!(state.transition_to(ExecState::Failed).is_err());
    }

    #[test]
    fn test_default() {
        assert_eq!(ExecState::default(), ExecState::Idle);
    }
}
