//! Remote command execution inside LXD containers through the `lxc` CLI
//!
//! This crate treats a local LXD container as if it were a remote machine. It
//! never talks to the LXD API: every operation is translated into an `lxc`
//! invocation (`exec`, `file push`, `file pull`), passed through a caller
//! supplied [`CommandWrapper`], and run as a local child process.
//!
//! ```no_run
//! use lxd_communicator::{Communicator, ContainerTarget, RemoteCommand};
//! use lxd_communicator::wrapper::Passthrough;
//!
//! # async fn example() -> lxd_communicator::Result<()> {
//! let comm = Communicator::new(ContainerTarget::new("build-box"), Passthrough);
//!
//! let completion = comm.start(RemoteCommand::new("apt-get update"))?;
//! let status = completion.await?;
//! println!("exited with {status}");
//!
//! comm.upload("/etc/motd", &b"welcome\n"[..]).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod command;
pub mod communicator;
pub mod error;
pub mod process;
pub mod remote;
pub mod spawn;
pub mod target;
pub mod wrapper;

pub use command::Command;
pub use communicator::{Communicator, RUNLEVEL_COMMAND};
pub use error::{Error, Result};
pub use process::{ChildProcess, ExitStatus, FALLBACK_EXIT_CODE};
pub use remote::{CommandCompletion, RemoteCommand};
pub use spawn::{SmolSpawner, Spawner};
pub use target::ContainerTarget;
pub use wrapper::CommandWrapper;
