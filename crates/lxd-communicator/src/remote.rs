//! Remote command requests and their asynchronous completion
//!
//! [`Communicator::start`](crate::Communicator::start) consumes a
//! [`RemoteCommand`], launches the process and hands back a
//! [`CommandCompletion`]. A detached task owns the child from then on: it feeds
//! stdin, drains stdout and stderr into the caller's sinks, reaps the process
//! and writes the exit status into the completion exactly once.

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_process::ChildStdin;
use futures::channel::oneshot;
use futures::future::{self, Either};
use futures::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::command::{Command, StdioMode};
use crate::error::{Error, Result};
use crate::process::{ChildProcess, ExitStatus, FALLBACK_EXIT_CODE};

/// Boxed input source for a remote command
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed output sink for a remote command
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A command to run inside the container, with its stream endpoints
///
/// Streams that are not set are connected to the null device.
pub struct RemoteCommand {
    command: String,
    stdin: Option<BoxedReader>,
    stdout: Option<BoxedWriter>,
    stderr: Option<BoxedWriter>,
}

impl RemoteCommand {
    /// Create a request for the given shell command
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            stdin: None,
            stdout: None,
            stderr: None,
        }
    }

    /// Feed the command's standard input from `reader`
    pub fn with_stdin(mut self, reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        self.stdin = Some(Box::new(reader));
        self
    }

    /// Copy the command's standard output into `writer`
    pub fn with_stdout(mut self, writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.stdout = Some(Box::new(writer));
        self
    }

    /// Copy the command's standard error into `writer`
    pub fn with_stderr(mut self, writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.stderr = Some(Box::new(writer));
        self
    }

    /// The shell command to run
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Split into the command string and the stream endpoints
    pub(crate) fn into_parts(self) -> (String, RemoteIo) {
        (
            self.command,
            RemoteIo {
                stdin: self.stdin,
                stdout: self.stdout,
                stderr: self.stderr,
            },
        )
    }

    /// Configure the local process's stdio to match the attached endpoints
    pub(crate) fn configure_stdio(&self, cmd: &mut Command) {
        let mode = |attached: bool| {
            if attached {
                StdioMode::Piped
            } else {
                StdioMode::Null
            }
        };
        cmd.stdin(mode(self.stdin.is_some()))
            .stdout(mode(self.stdout.is_some()))
            .stderr(mode(self.stderr.is_some()));
    }
}

impl fmt::Debug for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCommand")
            .field("command", &self.command)
            .field("stdin", &self.stdin.is_some())
            .field("stdout", &self.stdout.is_some())
            .field("stderr", &self.stderr.is_some())
            .finish()
    }
}

/// The write half of a completion slot; consumed by the single report
pub(crate) struct CompletionSender(oneshot::Sender<i32>);

impl CompletionSender {
    fn report(self, code: i32) {
        // The caller may have dropped its completion; nobody is left to tell.
        let _ = self.0.send(code);
    }
}

/// Resolves to the exit status of a started remote command
///
/// The status is delivered once, after the process has terminated and its
/// output has been drained into the attached sinks.
#[derive(Debug)]
pub struct CommandCompletion {
    command: String,
    receiver: oneshot::Receiver<i32>,
}

impl CommandCompletion {
    pub(crate) fn channel(command: impl Into<String>) -> (CompletionSender, Self) {
        let (tx, rx) = oneshot::channel();
        (
            CompletionSender(tx),
            Self {
                command: command.into(),
                receiver: rx,
            },
        )
    }

    /// The command this completion belongs to
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Check for the exit status without waiting
    ///
    /// Returns `Ok(None)` while the command is still running.
    pub fn try_status(&mut self) -> Result<Option<i32>> {
        self.receiver.try_recv().map_err(|_| Error::CompletionLost)
    }
}

impl Future for CommandCompletion {
    type Output = Result<i32>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().receiver)
            .poll(cx)
            .map(|received| received.map_err(|_| Error::CompletionLost))
    }
}

/// Stream endpoints moved into the completion task
pub(crate) struct RemoteIo {
    stdin: Option<BoxedReader>,
    stdout: Option<BoxedWriter>,
    stderr: Option<BoxedWriter>,
}

/// Derive the status reported for a started command
///
/// A reported exit code always wins. A clean exit is downgraded to the fallback
/// code when an output sink failed, and a failed wait reports the fallback.
pub(crate) fn completion_code(status: Result<ExitStatus>, streams: io::Result<()>) -> i32 {
    match status {
        Ok(status) if status.success() => match streams {
            Ok(()) => 0,
            Err(_) => FALLBACK_EXIT_CODE,
        },
        Ok(status) => status.remote_code(),
        Err(_) => FALLBACK_EXIT_CODE,
    }
}

async fn feed_stdin(source: Option<BoxedReader>, stdin: Option<ChildStdin>) -> io::Result<()> {
    if let (Some(source), Some(mut stdin)) = (source, stdin) {
        futures::io::copy(source, &mut stdin).await?;
        stdin.close().await?;
    }
    Ok(())
}

async fn drain<R: AsyncRead + Unpin>(
    stream: Option<R>,
    sink: Option<BoxedWriter>,
) -> io::Result<()> {
    if let (Some(stream), Some(mut sink)) = (stream, sink) {
        futures::io::copy(stream, &mut sink).await?;
        sink.flush().await?;
    }
    Ok(())
}

/// Drive a started command to completion and report its status
pub(crate) async fn drive(
    mut child: ChildProcess,
    endpoints: RemoteIo,
    completion: CompletionSender,
    command: String,
) {
    let RemoteIo {
        stdin,
        stdout,
        stderr,
    } = endpoints;
    let child_stdin = child.take_stdin();
    let child_stdout = child.take_stdout();
    let child_stderr = child.take_stderr();

    let feed = feed_stdin(stdin, child_stdin);
    let finish = async {
        let (status, out, err) = futures::join!(
            child.wait(),
            drain(child_stdout, stdout),
            drain(child_stderr, stderr)
        );
        if let Err(e) = &status {
            tracing::warn!(command = %command, "failed to wait for lxc exec: {e}");
        }
        let streams = out.and(err);
        if let Err(e) = &streams {
            tracing::warn!(command = %command, "failed to copy lxc exec output: {e}");
        }
        completion_code(status, streams)
    };
    futures::pin_mut!(feed, finish);

    // Input is abandoned once the process is gone; it cannot be consumed anymore.
    let code = match future::select(feed, finish).await {
        Either::Left((fed, finish)) => {
            if let Err(e) = fed {
                tracing::debug!(command = %command, "stopped feeding stdin: {e}");
            }
            finish.await
        }
        Either::Right((code, _feed)) => code,
    };

    tracing::info!("lxc exec execution exited with '{code}': '{command}'");
    completion.report(code);
}
