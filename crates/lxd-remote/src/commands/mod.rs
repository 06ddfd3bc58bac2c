pub mod exec;
pub mod pull;
pub mod pull_dir;
pub mod push;
pub mod push_dir;
pub mod ready;
pub mod validate;

use anyhow::{Context, Result};
use lxd_communicator::Communicator;
use std::path::Path;

/// Load the configuration and build a communicator from it
pub(crate) fn communicator(config_path: &Path) -> Result<Communicator> {
    let config = lxd_config::parser::parse_file(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let communicator = config
        .communicator()
        .context("Failed to build communicator")?;

    tracing::debug!(
        container = %communicator.target().instance(),
        wrapper = %communicator.wrapper_description(),
        "communicator ready"
    );
    Ok(communicator)
}
