// src/task/exception.rs

use crate::errors::TaskmasterError;

/// What a task has captured in its exception slot.
#[derive(Debug)]
pub enum TaskException {
    Error(TaskmasterError),
    /// An arbitrary non-error value; raising it yields
    /// [`TaskmasterError::Captured`].
    Payload(String),
}

impl TaskException {
    pub fn error(&self) -> Option<&TaskmasterError> {
        match self {
            TaskException::Error(err) => Some(err),
            TaskException::Payload(_) => None,
        }
    }

    pub fn forces_stop(&self) -> bool {
        self.error().is_some_and(TaskmasterError::forces_stop)
    }

    pub fn into_error(self) -> TaskmasterError {
        match self {
            TaskException::Error(err) => err,
            TaskException::Payload(payload) => TaskmasterError::Captured(payload),
        }
    }
}

impl From<TaskmasterError> for TaskException {
    fn from(err: TaskmasterError) -> Self {
        TaskException::Error(err)
    }
}
