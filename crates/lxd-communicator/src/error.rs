//! Error types for container communication

use thiserror::Error;

/// Unified error type for communicator operations
#[derive(Error, Debug)]
pub enum Error {
    /// The command wrapper rejected the command
    #[error("failed to wrap command `{command}`: {reason}")]
    Wrap {
        /// The command that was being wrapped
        command: String,
        /// Why the wrapper refused it
        reason: String,
    },

    /// Failed to spawn a process
    #[error("failed to spawn process: {reason}")]
    SpawnFailed {
        /// The reason for the spawn failure
        reason: String,
    },

    /// A synchronous operation ran but its process exited unsuccessfully
    #[error("{operation} failed{}{}", format_code(.code), format_stderr(.stderr))]
    CommandFailed {
        /// The operation that was attempted
        operation: String,
        /// Exit code reported by the process, if any
        code: Option<i32>,
        /// Trimmed stderr captured from the process
        stderr: String,
    },

    /// The operation is not supported by the lxc CLI
    #[error("{operation} is not implemented for lxc")]
    Unsupported {
        /// Name of the unsupported operation
        operation: &'static str,
    },

    /// Directory upload source is not usable
    #[error("invalid upload source {path}: {reason}")]
    InvalidSource {
        /// The offending local path
        path: String,
        /// What is wrong with it
        reason: String,
    },

    /// The task reporting a started command's exit status went away
    #[error("command completion was dropped before an exit status was reported")]
    CompletionLost,

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn format_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {code}"),
        None => " without an exit code".to_string(),
    }
}

fn format_stderr(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

impl Error {
    /// Create a spawn failed error
    pub fn spawn_failed(reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            reason: reason.into(),
        }
    }

    /// Create a wrap error for the given command
    pub fn wrap(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Wrap {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Create a command failed error
    pub fn command_failed(
        operation: impl Into<String>,
        code: Option<i32>,
        stderr: impl AsRef<str>,
    ) -> Self {
        Self::CommandFailed {
            operation: operation.into(),
            code,
            stderr: stderr.as_ref().trim().to_string(),
        }
    }

    /// Prefix spawn and wrap failures with the operation that was attempted
    pub fn with_operation_context(self, operation: &str) -> Self {
        match self {
            Error::SpawnFailed { reason } => Error::SpawnFailed {
                reason: format!("{operation}: {reason}"),
            },
            Error::Wrap { command, reason } => Error::Wrap {
                command,
                reason: format!("{operation}: {reason}"),
            },
            other => other,
        }
    }

    /// Prefix a local I/O failure with the operation it interrupted
    pub fn with_io_context(self, operation: &str) -> Self {
        match self {
            Error::Io(e) => {
                Error::Io(std::io::Error::new(e.kind(), format!("{operation}: {e}")))
            }
            other => other,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
