//! Task spawning abstraction.
//!
//! [`ReceiverMonitor`](crate::services::ReceiverMonitor) spawns its poll loop
//! and settle refreshes through [`TaskSpawner`], so embedders with their own
//! executor handle can supply it instead of the ambient Tokio runtime.

use std::future::Future;

/// Abstraction for spawning background tasks.
pub trait TaskSpawner: Send + Sync {
    /// Spawns a future as a detached background task.
    ///
    /// The spawner provides no way to join the task; monitor tasks stop
    /// through their cancellation token.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Spawner backed by a Tokio runtime handle.
#[derive(Clone, Debug)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Creates a spawner for the given runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates a spawner for the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn spawned_task_runs_to_completion() {
        let spawner = TokioSpawner::current();
        let ran = Arc::new(AtomicBool::new(false));
        let (tx, rx) = oneshot::channel();

        let flag = Arc::clone(&ran);
        spawner.spawn(async move {
            flag.store(true, Ordering::SeqCst);
            let _ = tx.send(());
        });

        rx.await.unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn spawner_works_from_outside_the_runtime() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let spawner = TokioSpawner::new(runtime.handle().clone());
        let (tx, rx) = oneshot::channel();

        spawner.spawn(async move {
            let _ = tx.send(7u8);
        });

        assert_eq!(runtime.block_on(rx).unwrap(), 7);
    }
}
