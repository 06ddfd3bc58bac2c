use anyhow::{Context, Result};
use std::path::Path;

pub async fn run(config_path: &Path, remote: &str, local: &Path) -> Result<()> {
    let communicator = super::communicator(config_path)?;

    communicator
        .download_dir(remote, local, &[])
        .await
        .with_context(|| format!("Failed to download directory {remote}"))
}
