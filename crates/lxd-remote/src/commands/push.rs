use anyhow::{Context, Result};
use std::path::Path;

pub async fn run(config_path: &Path, local: &Path, remote: &str) -> Result<()> {
    let communicator = super::communicator(config_path)?;

    let file = smol::fs::File::open(local)
        .await
        .with_context(|| format!("Failed to open {}", local.display()))?;
    communicator
        .upload(remote, file)
        .await
        .with_context(|| format!("Failed to upload {}", local.display()))?;

    println!("✓ {} -> {}", local.display(), communicator.target().qualify(remote));
    Ok(())
}
