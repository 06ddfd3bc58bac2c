use anyhow::{Context, Result};
use lxd_communicator::RemoteCommand;
use std::path::Path;

/// Run `command` with the terminal's streams attached and return its status
pub async fn run(config_path: &Path, command: &str, forward_stdin: bool) -> Result<i32> {
    let communicator = super::communicator(config_path)?;

    let mut remote = RemoteCommand::new(command)
        .with_stdout(smol::Unblock::new(std::io::stdout()))
        .with_stderr(smol::Unblock::new(std::io::stderr()));
    if forward_stdin {
        remote = remote.with_stdin(smol::Unblock::new(std::io::stdin()));
    }

    let status = communicator
        .start(remote)
        .with_context(|| format!("Failed to start '{command}'"))?
        .await
        .context("Lost track of the remote command")?;

    tracing::debug!(status, "remote command finished");
    Ok(status)
}
