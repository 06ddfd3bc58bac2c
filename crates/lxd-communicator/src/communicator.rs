//! The communicator: remote operations translated into `lxc` invocations

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use futures::FutureExt;
use futures::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::command::{Command, StdioMode, shell_escape};
use crate::error::{Error, Result};
use crate::process::{ChildProcess, read_to_string};
use crate::remote::{self, CommandCompletion, RemoteCommand};
use crate::spawn::{SmolSpawner, Spawner};
use crate::target::ContainerTarget;
use crate::wrapper::CommandWrapper;

/// Command whose output tells whether the container's init system is up
pub const RUNLEVEL_COMMAND: &str = "/sbin/runlevel";

/// Runs commands and moves files in and out of an LXD container via `lxc`
///
/// Every invocation is built as a shell string, passed once through the
/// configured [`CommandWrapper`], and run locally with `/bin/sh -c`.
pub struct Communicator {
    target: ContainerTarget,
    wrapper: Arc<dyn CommandWrapper>,
    spawner: Arc<dyn Spawner>,
}

impl Communicator {
    /// Create a communicator for the given container
    pub fn new<W: CommandWrapper + 'static>(target: ContainerTarget, wrapper: W) -> Self {
        Self {
            target,
            wrapper: Arc::new(wrapper),
            spawner: Arc::new(SmolSpawner),
        }
    }

    /// Run completion tasks on a different executor
    pub fn with_spawner<S: Spawner + 'static>(mut self, spawner: S) -> Self {
        self.spawner = Arc::new(spawner);
        self
    }

    /// The container this communicator talks to
    pub fn target(&self) -> &ContainerTarget {
        &self.target
    }

    /// Description of the configured wrapper
    pub fn wrapper_description(&self) -> String {
        self.wrapper.description()
    }

    fn cli(&self) -> &str {
        self.target.cli()
    }

    /// Pass a command line through the wrapper and build the local shell command
    fn wrap(&self, operation: &str, command_line: &str) -> Result<Command> {
        let wrapped = self
            .wrapper
            .wrap(command_line)
            .map_err(|e| e.with_operation_context(operation))?;
        tracing::debug!(operation, command = %wrapped, "wrapped command");
        Ok(Command::shell(wrapped))
    }

    /// The unwrapped `lxc exec` line that runs `command` in the container
    pub fn exec_command_line(&self, command: &str) -> String {
        format!(
            "{}{} exec {} -- /bin/sh -c {}",
            if self.target.sudo_exec() { "sudo " } else { "" },
            self.cli(),
            shell_escape(&self.target.instance()),
            shell_escape(command),
        )
    }

    /// Build the local command that runs `command` inside the container
    ///
    /// Nothing is spawned; stdio defaults to the null device.
    pub fn execute(&self, command: &str) -> Result<Command> {
        tracing::debug!(
            container = %self.target.instance(),
            "executing with lxc exec: {command}"
        );
        if command.trim().is_empty() {
            return Err(Error::wrap(command, "command is empty"));
        }
        self.wrap("exec", &self.exec_command_line(command))
    }

    /// Start a command in the container without waiting for it
    ///
    /// Returns once the local process is running. Wrapping and spawn failures
    /// are returned here; everything after that, including a non-zero exit, is
    /// reported as the integer status the returned completion resolves to.
    pub fn start(&self, remote: RemoteCommand) -> Result<CommandCompletion> {
        let mut cmd = self.execute(remote.command())?;
        remote.configure_stdio(&mut cmd);

        let child = ChildProcess::spawn(&cmd).map_err(|e| e.with_operation_context("exec"))?;
        let (command, endpoints) = remote.into_parts();
        let (sender, completion) = CommandCompletion::channel(command.clone());

        self.spawner
            .spawn(remote::drive(child, endpoints, sender, command).boxed());

        Ok(completion)
    }

    /// Write `source` to `destination` inside the container
    pub async fn upload<R>(&self, destination: &str, source: R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let qualified = self.target.qualify(destination);
        let operation = format!("upload to {qualified}");
        let mut cmd = self.wrap(
            &operation,
            &format!("{} file push - {}", self.cli(), shell_escape(&qualified)),
        )?;
        cmd.stdin(StdioMode::Piped).stderr(StdioMode::Piped);

        tracing::info!("Running copy command: {}", cmd.display());
        let mut child =
            ChildProcess::spawn(&cmd).map_err(|e| e.with_operation_context(&operation))?;
        let stdin = child.take_stdin();
        let stderr = child.take_stderr();

        let feed = async move {
            if let Some(mut stdin) = stdin {
                futures::io::copy(source, &mut stdin).await?;
                stdin.close().await?;
            }
            Ok::<_, Error>(())
        };
        let (fed, stderr) = futures::join!(feed, read_to_string(stderr));

        // The tool's own exit status explains a broken pipe better than the pipe does.
        child.wait_success(&operation, &stderr?).await?;
        fed
    }

    /// Recursively upload the local directory `source` into `destination`
    ///
    /// `lxc file push` cannot copy directories, so the tree is streamed through
    /// `tar`: a local archiver running in `source` pipes into a `tar -x` running
    /// in the container. Entries matching any `exclude` pattern (tar
    /// `--exclude` syntax) are left out. The destination directory must exist.
    pub async fn upload_dir(
        &self,
        destination: &str,
        source: impl AsRef<Path>,
        exclude: &[String],
    ) -> Result<()> {
        let source = source.as_ref();
        if !source.is_dir() {
            return Err(Error::InvalidSource {
                path: source.display().to_string(),
                reason: "not a directory".to_string(),
            });
        }

        let mut archive_line = String::from("tar -czf -");
        for pattern in exclude {
            archive_line.push(' ');
            archive_line.push_str(&shell_escape(&format!("--exclude={pattern}")));
        }
        archive_line.push_str(" .");
        let mut archiver = self.wrap("archive", &archive_line)?;
        archiver
            .current_dir(source)
            .stdout(StdioMode::Piped)
            .stderr(StdioMode::Piped);

        let extract_line = format!(
            "{} exec {} -- tar -xzf - -C {}",
            self.cli(),
            shell_escape(&self.target.instance()),
            shell_escape(destination),
        );
        let mut extractor = self.wrap("extract", &extract_line)?;
        extractor.stdin(StdioMode::Piped).stderr(StdioMode::Piped);

        tracing::info!("Starting tar command: {}", archiver.display());
        let mut tar =
            ChildProcess::spawn(&archiver).map_err(|e| e.with_operation_context("archive"))?;

        tracing::info!("Running cp command: {}", extractor.display());
        let mut cp = match ChildProcess::spawn(&extractor) {
            Ok(cp) => cp,
            Err(e) => {
                drop(tar.take_stdout());
                let _ = tar.wait().await;
                return Err(e.with_operation_context("extract"));
            }
        };

        let archive = tar.take_stdout();
        let archive_stderr = tar.take_stderr();
        let extract_stdin = cp.take_stdin();
        let extract_stderr = cp.take_stderr();

        // Closing the extractor's stdin at the end of the archive is what lets it finish.
        let pump = async move {
            if let (Some(archive), Some(mut stdin)) = (archive, extract_stdin) {
                futures::io::copy(archive, &mut stdin).await?;
                stdin.close().await?;
            }
            Ok::<_, std::io::Error>(())
        };
        let (pumped, extract_stderr, archive_stderr) = futures::join!(
            pump,
            read_to_string(extract_stderr),
            read_to_string(archive_stderr)
        );

        let extract_operation = format!("extract into {}:{destination}", self.target.instance());
        if let Err(e) = cp.wait_success(&extract_operation, &extract_stderr?).await {
            tracing::error!("Error running cp command: {e}");
            let _ = tar.wait().await;
            return Err(e);
        }

        let archive_operation = format!("archive {}", source.display());
        if let Err(e) = tar.wait_success(&archive_operation, &archive_stderr?).await {
            tracing::error!("Error running tar command: {e}");
            return Err(e);
        }

        pumped.map_err(Error::from)
    }

    /// Copy the file at `source` inside the container into `destination`
    pub async fn download<W>(&self, source: &str, destination: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let qualified = self.target.qualify(source);
        let operation = format!("download from {qualified}");
        let mut cmd = self.wrap(
            &operation,
            &format!("{} file pull {} -", self.cli(), shell_escape(&qualified)),
        )?;
        cmd.stdout(StdioMode::Piped).stderr(StdioMode::Piped);

        tracing::info!("Running copy command: {}", cmd.display());
        let mut child =
            ChildProcess::spawn(&cmd).map_err(|e| e.with_operation_context(&operation))?;
        let stdout = child.take_stdout();
        let stderr = child.take_stderr();

        let copy = async {
            if let Some(stdout) = stdout {
                futures::io::copy(stdout, destination).await?;
                destination.flush().await?;
            }
            Ok::<_, Error>(())
        };
        let (copied, stderr) = futures::join!(copy, read_to_string(stderr));

        // A failing sink closes the pipe early; the tool's exit only echoes that.
        if let Err(e) = copied {
            let _ = child.wait().await;
            return Err(e.with_io_context(&operation));
        }
        child.wait_success(&operation, &stderr?).await
    }

    /// Directory download is not available through `lxc file pull`
    ///
    /// Always fails without touching `destination`.
    pub async fn download_dir(
        &self,
        source: &str,
        destination: impl AsRef<Path>,
        _exclude: &[String],
    ) -> Result<()> {
        tracing::debug!(
            source,
            destination = %destination.as_ref().display(),
            "refusing directory download"
        );
        Err(Error::Unsupported {
            operation: "download_dir",
        })
    }

    /// Run `/sbin/runlevel` in the container and return its trimmed output
    ///
    /// Callers poll this until the init system reports a usable runlevel.
    pub async fn check_init(&self) -> Result<String> {
        tracing::debug!("Debug runlevel exec");
        let mut cmd = self.execute(RUNLEVEL_COMMAND)?;
        cmd.stdout(StdioMode::Piped).stderr(StdioMode::Piped);

        let mut child =
            ChildProcess::spawn(&cmd).map_err(|e| e.with_operation_context("runlevel"))?;
        let stdout = child.take_stdout();
        let stderr = child.take_stderr();
        let (output, stderr) = futures::join!(read_to_string(stdout), read_to_string(stderr));
        let output = output?;

        child.wait_success("runlevel check", &stderr?).await?;
        Ok(output.trim().to_string())
    }
}

impl fmt::Debug for Communicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Communicator")
            .field("target", &self.target)
            .field("wrapper", &self.wrapper.description())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wrapper::{Passthrough, PrefixWrapper};

    #[test]
    fn test_exec_command_line() {
        let comm = Communicator::new(ContainerTarget::new("build-box"), Passthrough);
        assert_eq!(
            comm.exec_command_line("echo \"hi\" $HOME"),
            "sudo lxc exec build-box -- /bin/sh -c 'echo \"hi\" $HOME'"
        );

        let comm = Communicator::new(
            ContainerTarget::new("build-box")
                .with_remote("images")
                .with_sudo_exec(false),
            Passthrough,
        );
        assert_eq!(
            comm.exec_command_line("/sbin/runlevel"),
            "lxc exec images:build-box -- /bin/sh -c /sbin/runlevel"
        );
    }

    #[test]
    fn test_execute_applies_wrapper() {
        let comm = Communicator::new(
            ContainerTarget::new("build-box").with_sudo_exec(false),
            PrefixWrapper::new("env LC_ALL=C"),
        );
        let cmd = comm.execute("uptime").unwrap();
        assert_eq!(
            cmd.display(),
            "/bin/sh -c env LC_ALL=C lxc exec build-box -- /bin/sh -c uptime"
        );
    }

    #[test]
    fn test_execute_rejects_empty_command() {
        let comm = Communicator::new(ContainerTarget::new("build-box"), Passthrough);
        assert!(matches!(comm.execute("  "), Err(Error::Wrap { .. })));
    }

    #[test]
    fn test_debug_shows_wrapper() {
        let comm = Communicator::new(ContainerTarget::new("build-box"), PrefixWrapper::new("sudo"));
        let rendered = format!("{comm:?}");
        assert!(rendered.contains("build-box"));
        assert!(rendered.contains("prefix `sudo`"));
    }
}
