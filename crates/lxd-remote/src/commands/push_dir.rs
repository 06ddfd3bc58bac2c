use anyhow::{Context, Result};
use std::path::Path;

pub async fn run(config_path: &Path, local: &Path, remote: &str, exclude: &[String]) -> Result<()> {
    let communicator = super::communicator(config_path)?;

    if !exclude.is_empty() {
        tracing::info!("Excluding: {}", exclude.join(", "));
    }

    communicator
        .upload_dir(remote, local, exclude)
        .await
        .with_context(|| format!("Failed to upload directory {}", local.display()))?;

    println!(
        "✓ {}/ -> {}:{remote}",
        local.display(),
        communicator.target().instance()
    );
    Ok(())
}
