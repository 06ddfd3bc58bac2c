//! # LXD Communicator Configuration
//!
//! YAML configuration for the LXD communicator.
//!
//! A configuration names the container to talk to and describes how commands
//! reach it: which `lxc` to run, whether `exec` goes through `sudo`, an
//! optional `{{.Command}}` template and an optional SSH hop.

#![warn(missing_docs)]

use lxd_communicator::wrapper::{LayeredWrapper, SshWrapper, TemplateWrapper};
use lxd_communicator::{Communicator, ContainerTarget};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub mod parser;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Environment variable not found
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// The command wrapper could not be built
    #[error("Invalid command wrapper: {0}")]
    WrapperError(#[from] lxd_communicator::Error),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

fn default_cli() -> String {
    lxd_communicator::target::DEFAULT_CLI.to_string()
}

fn default_sudo_exec() -> bool {
    true
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Name of the container to operate on
    pub container: String,

    /// LXD remote hosting the container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,

    /// The `lxc` program, inserted verbatim into command lines
    #[serde(default = "default_cli")]
    pub cli: String,

    /// Whether `lxc exec` runs through `sudo`
    #[serde(default = "default_sudo_exec")]
    pub sudo_exec: bool,

    /// Template applied to every command, containing `{{.Command}}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_wrapper: Option<String>,

    /// SSH hop applied outside the template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh: Option<SshHop>,
}

/// An SSH hop to the machine that hosts the container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SshHop {
    /// SSH destination (user@host or just host)
    pub destination: String,

    /// SSH port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Identity file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<PathBuf>,

    /// Extra options passed to ssh verbatim
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl Config {
    /// The container target described by this configuration
    pub fn target(&self) -> ContainerTarget {
        let target = ContainerTarget::new(&self.container)
            .with_cli(&self.cli)
            .with_sudo_exec(self.sudo_exec);
        match &self.remote {
            Some(remote) => target.with_remote(remote),
            None => target,
        }
    }

    /// The command wrapper: template first, then the SSH hop
    pub fn wrapper(&self) -> Result<LayeredWrapper> {
        let mut wrapper = LayeredWrapper::new();

        if let Some(template) = &self.command_wrapper {
            wrapper = wrapper.with_layer(TemplateWrapper::new(template)?);
        }

        if let Some(hop) = &self.ssh {
            let mut ssh = SshWrapper::new(&hop.destination);
            if let Some(port) = hop.port {
                ssh = ssh.with_port(port);
            }
            if let Some(identity) = &hop.identity_file {
                ssh = ssh.with_identity_file(identity);
            }
            for option in &hop.options {
                ssh = ssh.with_option(option);
            }
            wrapper = wrapper.with_layer(ssh);
        }

        Ok(wrapper)
    }

    /// Build a communicator from this configuration
    pub fn communicator(&self) -> Result<Communicator> {
        Ok(Communicator::new(self.target(), self.wrapper()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lxd_communicator::CommandWrapper;

    fn config() -> Config {
        Config {
            version: "1.0".to_string(),
            container: "build-box".to_string(),
            remote: None,
            cli: default_cli(),
            sudo_exec: true,
            command_wrapper: None,
            ssh: None,
        }
    }

    #[test]
    fn test_target_from_config() {
        let mut config = config();
        config.remote = Some("images".to_string());
        config.sudo_exec = false;

        let target = config.target();
        assert_eq!(target.instance(), "images:build-box");
        assert_eq!(target.cli(), "lxc");
        assert!(!target.sudo_exec());
    }

    #[test]
    fn test_wrapper_layers() {
        let mut config = config();
        assert_eq!(config.wrapper().unwrap().layer_count(), 0);

        config.command_wrapper = Some("sudo {{.Command}}".to_string());
        config.ssh = Some(SshHop {
            destination: "ops@host".to_string(),
            port: Some(2200),
            identity_file: None,
            options: vec![],
        });

        let wrapper = config.wrapper().unwrap();
        assert_eq!(wrapper.layer_count(), 2);
        assert_eq!(
            wrapper.wrap("lxc list").unwrap(),
            "ssh -p 2200 ops@host 'sudo lxc list'"
        );
    }

    #[test]
    fn test_invalid_template_is_rejected() {
        let mut config = config();
        config.command_wrapper = Some("sudo".to_string());
        assert!(matches!(config.wrapper(), Err(ConfigError::WrapperError(_))));
        assert!(config.communicator().is_err());
    }
}
