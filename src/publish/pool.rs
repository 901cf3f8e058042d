use std::{future::Future, sync::Arc};

use tokio::{
    sync::Semaphore,
    task::{JoinError, JoinSet},
};

/// Fixed-size pool for independent units of work.
///
/// Units never share state with each other, they only hand their output
/// back through the batch that spawned them.
#[derive(Debug, Clone)]
pub struct DispatchPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl DispatchPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Opens a batch whose units share this pool's concurrency limit.
    pub fn batch<T: Send + 'static>(&self) -> DispatchBatch<T> {
        DispatchBatch {
            permits: Arc::clone(&self.permits),
            tasks: JoinSet::new(),
        }
    }
}

pub struct DispatchBatch<T> {
    permits: Arc<Semaphore>,
    tasks: JoinSet<T>,
}

impl<T: Send + 'static> DispatchBatch<T> {
    pub fn submit<F>(&mut self, unit: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        self.tasks.spawn(async move {
            // the semaphore is never closed, so acquiring only waits
            let _permit = permits.acquire_owned().await.ok();
            unit.await
        });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Next finished unit, in completion order. `None` once drained.
    pub async fn next(&mut self) -> Option<Result<T, JoinError>> {
        self.tasks.join_next().await
    }

    pub async fn await_all(mut self) -> Vec<Result<T, JoinError>> {
        let mut out = Vec::with_capacity(self.tasks.len());
        while let Some(done) = self.tasks.join_next().await {
            out.push(done);
        }
        out
    }
}
