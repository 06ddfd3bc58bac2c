//! Configuration parser with environment variable substitution

use crate::{Config, ConfigError, Result};
use lxd_communicator::wrapper::COMMAND_PLACEHOLDER;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("environment variable pattern is valid"));

/// Parse a YAML configuration file
pub fn parse_file(path: impl AsRef<Path>) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_str(&content)
}

/// Parse YAML configuration from a string
pub fn parse_str(content: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(content)?;
    let config = resolve_env(config, |name| std::env::var(name).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Substitute environment variables in every string field
fn resolve_env<F>(mut config: Config, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    config.container = substitute_with(&config.container, &lookup)?;
    config.cli = substitute_with(&config.cli, &lookup)?;
    if let Some(remote) = &config.remote {
        config.remote = Some(substitute_with(remote, &lookup)?);
    }
    if let Some(template) = &config.command_wrapper {
        config.command_wrapper = Some(substitute_with(template, &lookup)?);
    }
    if let Some(hop) = &mut config.ssh {
        hop.destination = substitute_with(&hop.destination, &lookup)?;
        if let Some(identity) = &hop.identity_file {
            let resolved = substitute_with(&identity.to_string_lossy(), &lookup)?;
            hop.identity_file = Some(PathBuf::from(resolved));
        }
        for option in &mut hop.options {
            *option = substitute_with(option, &lookup)?;
        }
    }
    Ok(config)
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.version != "1.0" {
        return Err(ConfigError::ValidationError(format!(
            "Unsupported version: {}, expected 1.0",
            config.version
        )));
    }

    if config.container.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "container name must not be empty".to_string(),
        ));
    }

    if config
        .container
        .contains(|c: char| c.is_whitespace() || c == '/' || c == ':')
    {
        return Err(ConfigError::ValidationError(format!(
            "container name '{}' must not contain whitespace, '/' or ':'",
            config.container
        )));
    }

    if config.cli.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "cli must not be empty".to_string(),
        ));
    }

    if let Some(template) = &config.command_wrapper {
        if !template.contains(COMMAND_PLACEHOLDER) {
            return Err(ConfigError::ValidationError(format!(
                "command_wrapper '{}' must contain {}",
                template, COMMAND_PLACEHOLDER
            )));
        }
    }

    if let Some(hop) = &config.ssh {
        if hop.destination.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "ssh.destination must not be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Substitute `${VAR}` and `${VAR:-default}` using `lookup`
///
/// All missing variables without a default are reported together.
fn substitute_with<F>(input: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in ENV_VAR.captures_iter(input) {
        let full_match = &cap[0];
        let var_expr = &cap[1];

        // Handle default values: ${VAR:-default}
        let (var_name, default_value) = match var_expr.find(":-") {
            Some(pos) => (&var_expr[..pos], Some(&var_expr[pos + 2..])),
            None => (var_expr, None),
        };

        match (lookup(var_name), default_value) {
            (Some(value), _) => result = result.replace(full_match, &value),
            (None, Some(default)) => result = result.replace(full_match, default),
            (None, None) => errors.push(var_name.to_string()),
        }
    }

    if !errors.is_empty() {
        return Err(ConfigError::EnvVarNotFound(errors.join(", ")));
    }

    Ok(result)
}
