//! Terminal results and lifecycle states of a fetch.

use std::fmt;

/// Terminal snapshot of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult<T, E> {
    /// The fetch produced a value.
    Success(T),
    /// The fetch failed.
    Error(E),
    /// The fetch was canceled. Not a failure.
    Canceled,
}

impl<T, E> TaskResult<T, E> {
    /// Returns `true` for [`TaskResult::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success(_))
    }

    /// Returns `true` for [`TaskResult::Error`].
    pub fn is_error(&self) -> bool {
        matches!(self, TaskResult::Error(_))
    }

    /// Returns `true` for [`TaskResult::Canceled`].
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskResult::Canceled)
    }

    /// The value, if successful.
    pub fn value(&self) -> Option<&T> {
        match self {
            TaskResult::Success(value) => Some(value),
            _ => None,
        }
    }

    /// The error, if failed.
    pub fn error(&self) -> Option<&E> {
        match self {
            TaskResult::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Maps the success value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> TaskResult<U, E> {
        match self {
            TaskResult::Success(value) => TaskResult::Success(f(value)),
            TaskResult::Error(error) => TaskResult::Error(error),
            TaskResult::Canceled => TaskResult::Canceled,
        }
    }

    /// Converts into a `Result`, with cancellation as `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>, E> {
        match self {
            TaskResult::Success(value) => Ok(Some(value)),
            TaskResult::Error(error) => Err(error),
            TaskResult::Canceled => Ok(None),
        }
    }

    /// The lifecycle state this result terminates in.
    pub fn state(&self) -> TaskState {
        match self {
            TaskResult::Success(_) => TaskState::Succeeded,
            TaskResult::Error(_) => TaskState::Failed,
            TaskResult::Canceled => TaskState::Canceled,
        }
    }
}

impl<T, E> From<Result<T, E>> for TaskResult<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => TaskResult::Success(value),
            Err(error) => TaskResult::Error(error),
        }
    }
}

/// Lifecycle of a coordinator.
///
/// `Idle -> Running -> {Succeeded, Failed, Canceled}`, back to `Idle` on reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Nothing has run since creation or the last reset.
    #[default]
    Idle,
    /// A fetch is in flight.
    Running,
    /// The last fetch produced a value.
    Succeeded,
    /// The last fetch failed.
    Failed,
    /// The last fetch was canceled.
    Canceled,
}

impl TaskState {
    /// Whether the state is one of the terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Canceled
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Idle => "idle",
            TaskState::Running => "running",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed => "failed",
            TaskState::Canceled => "canceled",
        };
        f.write_str(name)
    }
}
