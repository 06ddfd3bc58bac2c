//! Spawning of background completion tasks

use futures::future::BoxFuture;

/// Something that can run a future to completion in the background
///
/// The communicator only needs fire-and-forget spawning, so callers on any
/// runtime can plug in their own executor.
pub trait Spawner: Send + Sync {
    /// Spawn a future on the runtime and detach it
    fn spawn(&self, future: BoxFuture<'static, ()>);
}

/// Spawner backed by smol's global executor
#[derive(Debug, Clone, Copy, Default)]
pub struct SmolSpawner;

impl Spawner for SmolSpawner {
    fn spawn(&self, future: BoxFuture<'static, ()>) {
        smol::spawn(future).detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use futures::channel::oneshot;

    #[smol_potat::test]
    async fn test_smol_spawner_runs_detached() {
        let (tx, rx) = oneshot::channel();
        SmolSpawner.spawn(
            async move {
                let _ = tx.send(7);
            }
            .boxed(),
        );
        assert_eq!(rx.await.unwrap(), 7);
    }
}
