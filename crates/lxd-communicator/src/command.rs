//! Local command builder for the processes the communicator spawns

use async_process::{Command as AsyncCommand, Stdio};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Shell used to interpret every wrapped command string
pub const SHELL: &str = "/bin/sh";

/// How a standard stream of the child should be connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdioMode {
    /// Connect to the null device
    #[default]
    Null,
    /// Create a pipe the communicator reads from or writes to
    Piped,
}

impl StdioMode {
    fn to_stdio(self) -> Stdio {
        match self {
            StdioMode::Null => Stdio::null(),
            StdioMode::Piped => Stdio::piped(),
        }
    }
}

/// A command to be executed locally
///
/// This is a builder that is converted to an `async_process::Command` when the
/// process is spawned. Unlike `AsyncCommand`, it is `Clone` and can be logged.
#[derive(Debug, Clone)]
pub struct Command {
    /// The program to execute
    program: OsString,
    /// The arguments to pass to the program
    args: Vec<OsString>,
    /// Working directory for the command
    current_dir: Option<PathBuf>,
    stdin: StdioMode,
    stdout: StdioMode,
    stderr: StdioMode,
}

impl Command {
    /// Create a new command for the given program
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            current_dir: None,
            stdin: StdioMode::Null,
            stdout: StdioMode::Null,
            stderr: StdioMode::Null,
        }
    }

    /// Create a command that runs `command_line` through `/bin/sh -c`
    pub fn shell(command_line: impl AsRef<OsStr>) -> Self {
        let mut cmd = Self::new(SHELL);
        cmd.arg("-c").arg(command_line);
        cmd
    }

    /// Add an argument to the command
    pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Set the working directory for the command
    pub fn current_dir<P: AsRef<Path>>(&mut self, dir: P) -> &mut Self {
        self.current_dir = Some(dir.as_ref().to_owned());
        self
    }

    /// Configure stdin
    pub fn stdin(&mut self, mode: StdioMode) -> &mut Self {
        self.stdin = mode;
        self
    }

    /// Configure stdout
    pub fn stdout(&mut self, mode: StdioMode) -> &mut Self {
        self.stdout = mode;
        self
    }

    /// Configure stderr
    pub fn stderr(&mut self, mode: StdioMode) -> &mut Self {
        self.stderr = mode;
        self
    }

    /// Get the program name
    pub fn get_program(&self) -> &OsStr {
        &self.program
    }

    /// Get the arguments
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Get the current directory
    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Render the command line for logs and error messages
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Prepare this command for execution by converting to an `async_process::Command`
    pub fn prepare(&self) -> AsyncCommand {
        let mut cmd = AsyncCommand::new(&self.program);

        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(self.stdin.to_stdio());
        cmd.stdout(self.stdout.to_stdio());
        cmd.stderr(self.stderr.to_stdio());

        cmd
    }
}

/// Escape a string for safe inclusion in a POSIX shell command
///
/// Strings made only of safe characters are returned unchanged; anything else is
/// single-quoted with embedded single quotes closed, escaped and reopened.
pub fn shell_escape(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if s.contains(|c: char| c.is_whitespace() || "\"'\\$`!*?<>|&;()[]{}~#=%".contains(c)) {
        format!("'{}'", s.replace('\'', "'\"'\"'"))
    } else {
        s.to_string()
    }
}
