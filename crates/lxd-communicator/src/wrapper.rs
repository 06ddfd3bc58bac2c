//! Command wrappers that adapt a shell command string to its execution environment
//!
//! A wrapper receives the full command the communicator wants to run locally
//! (for example `sudo lxc exec box -- /bin/sh -c 'uptime'`) and returns the
//! string that is actually handed to `/bin/sh -c`. Wrappers only build strings;
//! they never spawn anything.
//!
//! # Example
//!
//! ```
//! use lxd_communicator::wrapper::{CommandWrapper, LayeredWrapper, PrefixWrapper, SshWrapper};
//!
//! let wrapper = LayeredWrapper::new()
//!     .with_layer(PrefixWrapper::new("env LC_ALL=C"))
//!     .with_layer(SshWrapper::new("builder@10.0.0.5").with_port(2222));
//!
//! let wrapped = wrapper.wrap("lxc list").unwrap();
//! assert_eq!(wrapped, "ssh -p 2222 builder@10.0.0.5 'env LC_ALL=C lxc list'");
//! ```

use std::path::PathBuf;

use crate::command::shell_escape;
use crate::error::{Error, Result};

/// Placeholder substituted by [`TemplateWrapper`]
pub const COMMAND_PLACEHOLDER: &str = "{{.Command}}";

/// Trait for wrappers that transform a command string before it is run
pub trait CommandWrapper: Send + Sync {
    /// Wrap a command string, or refuse it
    fn wrap(&self, command: &str) -> Result<String>;

    /// Get a description of this wrapper for debugging
    fn description(&self) -> String;
}

impl<F> CommandWrapper for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn wrap(&self, command: &str) -> Result<String> {
        self(command)
    }

    fn description(&self) -> String {
        "custom wrapper".to_string()
    }
}

/// Wrapper that runs the command unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl CommandWrapper for Passthrough {
    fn wrap(&self, command: &str) -> Result<String> {
        Ok(command.to_string())
    }

    fn description(&self) -> String {
        "passthrough".to_string()
    }
}

/// Wrapper that prepends a fixed prefix such as `sudo -E`
#[derive(Debug, Clone)]
pub struct PrefixWrapper {
    prefix: String,
}

impl PrefixWrapper {
    /// Create a new prefix wrapper
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl CommandWrapper for PrefixWrapper {
    fn wrap(&self, command: &str) -> Result<String> {
        let prefix = self.prefix.trim();
        if prefix.is_empty() {
            return Ok(command.to_string());
        }
        Ok(format!("{prefix} {command}"))
    }

    fn description(&self) -> String {
        format!("prefix `{}`", self.prefix)
    }
}

/// Wrapper driven by a template containing `{{.Command}}`
///
/// Every occurrence of the placeholder is replaced with the raw command, so
/// `sudo sh -c "{{.Command}}"` behaves the way provisioning configs expect.
#[derive(Debug, Clone)]
pub struct TemplateWrapper {
    template: String,
}

impl TemplateWrapper {
    /// Create a template wrapper, rejecting templates without the placeholder
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(COMMAND_PLACEHOLDER) {
            return Err(Error::wrap(
                template,
                format!("template does not contain {COMMAND_PLACEHOLDER}"),
            ));
        }
        Ok(Self { template })
    }
}

impl CommandWrapper for TemplateWrapper {
    fn wrap(&self, command: &str) -> Result<String> {
        Ok(self.template.replace(COMMAND_PLACEHOLDER, command))
    }

    fn description(&self) -> String {
        format!("template `{}`", self.template)
    }
}

/// Wrapper that hops to another host over SSH before running the command
#[derive(Debug, Clone)]
pub struct SshWrapper {
    /// SSH destination (user@host or just host)
    pub destination: String,
    /// SSH port (optional)
    pub port: Option<u16>,
    /// SSH identity file (optional)
    pub identity_file: Option<PathBuf>,
    /// Additional SSH options, passed through verbatim
    pub options: Vec<String>,
}

impl SshWrapper {
    /// Create a new SSH wrapper
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            port: None,
            identity_file: None,
            options: Vec::new(),
        }
    }

    /// Set the SSH port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the SSH identity file
    pub fn with_identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    /// Add an SSH option
    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }
}

impl CommandWrapper for SshWrapper {
    fn wrap(&self, command: &str) -> Result<String> {
        if self.destination.trim().is_empty() {
            return Err(Error::wrap(command, "SSH destination is empty"));
        }

        let mut parts = vec!["ssh".to_string()];
        if let Some(port) = self.port {
            parts.push("-p".to_string());
            parts.push(port.to_string());
        }
        if let Some(identity) = &self.identity_file {
            parts.push("-i".to_string());
            parts.push(shell_escape(&identity.to_string_lossy()));
        }
        parts.extend(self.options.iter().map(|option| shell_escape(option)));
        parts.push(shell_escape(&self.destination));
        parts.push(shell_escape(command));

        Ok(parts.join(" "))
    }

    fn description(&self) -> String {
        format!("SSH to {}", self.destination)
    }
}

/// Wrapper that applies a stack of wrappers, innermost first
#[derive(Default)]
pub struct LayeredWrapper {
    layers: Vec<Box<dyn CommandWrapper>>,
}

impl LayeredWrapper {
    /// Create an empty stack, which behaves like [`Passthrough`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a wrapper to the outside of the stack
    pub fn with_layer<W: CommandWrapper + 'static>(mut self, layer: W) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    /// Get the number of layers in the stack
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Get descriptions of all layers for debugging
    pub fn layer_descriptions(&self) -> Vec<String> {
        self.layers.iter().map(|layer| layer.description()).collect()
    }
}

impl CommandWrapper for LayeredWrapper {
    fn wrap(&self, command: &str) -> Result<String> {
        self.layers
            .iter()
            .try_fold(command.to_string(), |cmd, layer| {
                layer
                    .wrap(&cmd)
                    .map_err(|e| e.with_operation_context(&layer.description()))
            })
    }

    fn description(&self) -> String {
        if self.layers.is_empty() {
            "passthrough".to_string()
        } else {
            self.layer_descriptions().join(" -> ")
        }
    }
}

impl std::fmt::Debug for LayeredWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredWrapper")
            .field("layers", &self.layer_descriptions())
            .finish()
    }
}
