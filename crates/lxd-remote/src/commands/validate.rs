use anyhow::{Context, Result};
use lxd_communicator::Communicator;
use lxd_config::parser;
use std::path::Path;

pub async fn run(config_path: &Path) -> Result<()> {
    println!("Validating {}...", config_path.display());

    // Substitution and validation both happen during parsing
    let config = parser::parse_file(config_path).context("Failed to parse configuration")?;
    let communicator: Communicator = config
        .communicator()
        .context("Failed to build command wrapper")?;

    println!("✓ Configuration valid");
    println!("  Version: {}", config.version);
    println!("  Container: {}", communicator.target().instance());
    println!("  CLI: {}", communicator.target().cli());
    println!("  Sudo exec: {}", config.sudo_exec);
    println!("  Wrapper: {}", communicator.wrapper_description());
    println!(
        "  Example: {}",
        communicator.exec_command_line(lxd_communicator::RUNLEVEL_COMMAND)
    );

    Ok(())
}
