use anyhow::{Context, Result};
use futures::io::AsyncWrite;
use std::path::Path;

pub async fn run(config_path: &Path, remote: &str, local: &str) -> Result<()> {
    let communicator = super::communicator(config_path)?;

    let mut sink: Box<dyn AsyncWrite + Unpin> = if local == "-" {
        Box::new(smol::Unblock::new(std::io::stdout()))
    } else {
        let file = smol::fs::File::create(local)
            .await
            .with_context(|| format!("Failed to create {local}"))?;
        Box::new(file)
    };

    communicator
        .download(remote, &mut *sink)
        .await
        .with_context(|| format!("Failed to download {remote}"))?;

    if local != "-" {
        println!("✓ {} -> {local}", communicator.target().qualify(remote));
    }
    Ok(())
}
