use anyhow::{Context, Result};
use std::path::Path;
use std::time::{Duration, Instant};

const PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Probe the init system, retrying for up to `wait_secs` seconds
pub async fn run(config_path: &Path, wait_secs: u64) -> Result<()> {
    let communicator = super::communicator(config_path)?;
    let deadline = Instant::now() + Duration::from_secs(wait_secs);

    loop {
        match communicator.check_init().await {
            Ok(runlevel) => {
                println!("{runlevel}");
                return Ok(());
            }
            Err(e) if Instant::now() < deadline => {
                tracing::debug!("init not ready yet: {e}");
                smol::Timer::after(PROBE_INTERVAL).await;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "{} did not answer the runlevel probe",
                        communicator.target().instance()
                    )
                });
            }
        }
    }
}
