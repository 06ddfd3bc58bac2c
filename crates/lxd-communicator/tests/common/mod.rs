//! Common test utilities
//!
//! Tests run against a shell-script stand-in for `lxc`. The "container" is a
//! directory inside a temp dir: `exec` runs the command locally with that
//! directory as working directory, and `file push`/`file pull` map
//! `<name>/<path>` onto it. Every invocation is appended to a log file so tests
//! can tell whether anything was spawned at all.

#![allow(dead_code)]

use anyhow::{Context, Result};
use futures::io::AsyncWrite;
use lxd_communicator::wrapper::{CommandWrapper, Passthrough};
use lxd_communicator::{Communicator, ContainerTarget};
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context as TaskContext, Poll};
use tempfile::TempDir;

/// Name of the container the stand-in pretends to host
pub const CONTAINER: &str = "test-box";

const FAKE_LXC: &str = r#"#!/bin/sh
ROOT='@ROOT@'
LOG='@LOG@'
echo "$*" >> "$LOG"

cmd="$1"
shift
case "$cmd" in
  exec)
    shift
    [ "$1" = "--" ] && shift
    case "$*" in
      */sbin/runlevel*) printf 'N 5\n'; exit 0 ;;
    esac
    cd "$ROOT" || exit 1
    exec "$@"
    ;;
  file)
    sub="$1"
    shift
    case "$sub" in
      push)
        path="${2#*/}"
        mkdir -p "$(dirname "$ROOT/$path")"
        cat > "$ROOT/$path"
        ;;
      pull)
        path="${1#*/}"
        if [ ! -f "$ROOT/$path" ]; then
          echo "Error: not found" >&2
          exit 1
        fi
        cat "$ROOT/$path"
        ;;
      *)
        echo "Error: unknown file subcommand $sub" >&2
        exit 64
        ;;
    esac
    ;;
  *)
    echo "Error: unknown command $cmd" >&2
    exit 64
    ;;
esac
"#;

/// A sandboxed stand-in for the `lxc` CLI
pub struct FakeLxc {
    dir: TempDir,
    script: PathBuf,
    root: PathBuf,
    log: PathBuf,
}

impl FakeLxc {
    /// Write the stand-in script and create an empty container root
    pub fn setup() -> Result<Self> {
        let dir = tempfile::tempdir().context("Failed to create temp dir")?;
        let root = dir.path().join("rootfs");
        let log = dir.path().join("invocations.log");
        let script = dir.path().join("fake-lxc");

        std::fs::create_dir_all(&root).context("Failed to create container root")?;
        let body = FAKE_LXC
            .replace("@ROOT@", &root.to_string_lossy())
            .replace("@LOG@", &log.to_string_lossy());
        std::fs::write(&script, body).context("Failed to write fake lxc")?;

        Ok(Self {
            dir,
            script,
            root,
            log,
        })
    }

    /// The `cli` value that invokes the stand-in
    pub fn cli(&self) -> String {
        format!("sh '{}'", self.script.display())
    }

    /// Target pointing at the stand-in, without sudo
    pub fn target(&self) -> ContainerTarget {
        ContainerTarget::new(CONTAINER)
            .with_cli(self.cli())
            .with_sudo_exec(false)
    }

    /// Communicator with a passthrough wrapper
    pub fn communicator(&self) -> Communicator {
        self.communicator_with(Passthrough)
    }

    /// Communicator with the given wrapper
    pub fn communicator_with<W: CommandWrapper + 'static>(&self, wrapper: W) -> Communicator {
        Communicator::new(self.target(), wrapper)
    }

    /// Host path backing a container path
    pub fn container_path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    /// Root directory of the fake container
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A scratch directory outside the container
    pub fn scratch(&self, name: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(&path).context("Failed to create scratch dir")?;
        Ok(path)
    }

    /// Recorded invocations of the stand-in
    pub fn invocations(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log)
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// An output sink that can be inspected after the command has finished
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Everything written so far, as lossy UTF-8
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl AsyncWrite for SharedBuffer {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut TaskContext<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// A sink that accepts one write and then fails every later one
#[derive(Default)]
pub struct FailingSink {
    accepted: bool,
}

impl AsyncWrite for FailingSink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut TaskContext<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.accepted {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::StorageFull, "disk full")));
        }
        self.accepted = true;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
