//! Child process ownership and exit status handling

use async_process::{Child, ChildStderr, ChildStdin, ChildStdout};
use futures::io::{AsyncRead, AsyncReadExt};

use crate::command::Command;
use crate::error::{Error, Result};

/// Exit code reported when the platform does not expose a real one
///
/// This covers processes terminated by a signal and failures of the wait call
/// itself.
pub const FALLBACK_EXIT_CODE: i32 = 1;

/// Process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit code if the process exited normally
    pub code: Option<i32>,
    /// Signal that terminated the process (Unix only)
    #[cfg(unix)]
    pub signal: Option<i32>,
}

impl ExitStatus {
    /// Returns true if the process exited successfully (code 0)
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Returns true if the process was terminated by a signal
    pub fn terminated_by_signal(&self) -> bool {
        #[cfg(unix)]
        {
            self.signal.is_some()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    /// The integer status reported to callers of a remote command
    pub fn remote_code(&self) -> i32 {
        self.code.unwrap_or(FALLBACK_EXIT_CODE)
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
            #[cfg(unix)]
            signal: {
                use std::os::unix::process::ExitStatusExt;
                status.signal()
            },
        }
    }
}

/// A spawned local process together with the command line that started it
///
/// The handle is owned by exactly one task; it is moved, never shared.
pub struct ChildProcess {
    child: Child,
    command_line: String,
}

impl ChildProcess {
    /// Spawn the given command
    pub fn spawn(command: &Command) -> Result<Self> {
        let command_line = command.display();
        let child = command
            .prepare()
            .spawn()
            .map_err(|e| Error::spawn_failed(format!("{command_line}: {e}")))?;

        tracing::debug!(pid = child.id(), command = %command_line, "spawned process");

        Ok(Self {
            child,
            command_line,
        })
    }

    /// Take the piped stdin, if any
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    /// Take the piped stdout, if any
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Take the piped stderr, if any
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Wait for the process to complete and return its exit status
    ///
    /// Any stdin still held by the handle is closed first.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        let status = self.child.status().await?;
        Ok(status.into())
    }

    /// Wait for the process and turn a non-zero exit into an error
    ///
    /// `stderr` is whatever the caller captured from the process; it is attached
    /// to the error so the tool's own complaint reaches the user.
    pub async fn wait_success(&mut self, operation: &str, stderr: &str) -> Result<()> {
        let status = self.wait().await?;
        if status.success() {
            Ok(())
        } else {
            tracing::debug!(
                command = %self.command_line,
                code = ?status.code,
                "{operation} exited unsuccessfully"
            );
            Err(Error::command_failed(operation, status.code, stderr))
        }
    }
}

/// Read a child stream to the end as lossy UTF-8
pub(crate) async fn read_to_string<R: AsyncRead + Unpin>(stream: Option<R>) -> Result<String> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
