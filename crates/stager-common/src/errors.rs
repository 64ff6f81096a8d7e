// Error types shared by the shell facades and the steps.

use stager_sdk::InvalidArgument;

/// A single external command that did not complete successfully.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Command '{command}' could not be run")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{command}' exited with code {exit_code}: {stderr}")]
    ExitCode {
        command: String,
        exit_code: i32,
        stderr: String,
    },
}

impl CommandError {
    /// The command line that failed.
    pub fn command(&self) -> &str {
        match self {
            CommandError::Spawn { command, .. } | CommandError::ExitCode { command, .. } => {
                command
            }
        }
    }

    /// The exit code, if the process ran at all.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandError::Spawn { .. } => None,
            CommandError::ExitCode { exit_code, .. } => Some(*exit_code),
        }
    }
}

/// Failure of a step as seen by whoever invoked it.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// Bad or missing arguments. Raised before any command runs.
    #[error("Missing or invalid arguments: {0}")]
    Validation(String),

    /// A command failed and no retry was configured around it.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The pull/tag/tag/push sequence for an image kept failing.
    #[error("Failed to stage image '{image}' after {attempts} attempt(s)")]
    Staging {
        image: String,
        attempts: u32,
        #[source]
        source: CommandError,
    },

    /// Local filesystem failure.
    #[error("{message}")]
    FailedOperation {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl StepError {
    pub fn validation(message: impl Into<String>) -> Self {
        StepError::Validation(message.into())
    }

    pub fn failed_operation(message: impl Into<String>, source: std::io::Error) -> Self {
        StepError::FailedOperation {
            message: message.into(),
            source,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, StepError::Validation(_))
    }
}

impl From<InvalidArgument> for StepError {
    fn from(err: InvalidArgument) -> Self {
        StepError::Validation(err.0)
    }
}
