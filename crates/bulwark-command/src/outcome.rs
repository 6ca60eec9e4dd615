use crate::error::CommandError;
use bulwark_core::CommandStatus;

/// The captured outcome of a command invoked in
/// [`OnFailure::Return`](bulwark_core::OnFailure::Return) mode.
#[derive(Debug)]
pub struct CommandResult<T> {
    status: CommandStatus,
    result: Result<T, CommandError>,
}

impl<T> CommandResult<T> {
    pub(crate) fn new(status: CommandStatus, result: Result<T, CommandError>) -> Self {
        Self { status, result }
    }

    /// Final classification of the invocation.
    pub fn status(&self) -> CommandStatus {
        self.status
    }

    /// Returns `true` if the work ran to completion.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The value, if the work ran to completion.
    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    /// The failure, if the work did not run to completion.
    pub fn error(&self) -> Option<&CommandError> {
        self.result.as_ref().err()
    }

    /// Converts into the result a `Throw`-mode caller would have seen.
    pub fn into_result(self) -> Result<T, CommandError> {
        self.result
    }

    /// Takes the value, discarding any failure.
    pub fn into_value(self) -> Option<T> {
        self.result.ok()
    }
}
