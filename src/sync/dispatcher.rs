use std::{
    future::Future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::{future::BoxFuture, FutureExt};
use log::warn;
use tokio::{
    sync::{mpsc, Semaphore},
    task::JoinHandle,
};

/// The Hue bridge starts resetting connections with more than 5 requests in
/// flight.
pub const BRIDGE_CONCURRENCY: usize = 5;

type Task = BoxFuture<'static, ()>;

/// Decrements the pending counter exactly once, whether the task finished,
/// panicked or was dropped without ever running.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// FIFO task queue running at most `concurrency` tasks at a time.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Task>,
    pending: Arc<AtomicUsize>,
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    worker: Arc<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn new(concurrency: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let worker = tokio::spawn(run_queue(rx, semaphore.clone()));

        Dispatcher {
            tx,
            pending: Default::default(),
            semaphore,
            concurrency,
            worker: Arc::new(worker),
        }
    }

    pub fn enqueue<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let guard = PendingGuard(self.pending.clone());

        let task = async move {
            let _guard = guard;
            task.await;
        }
        .boxed();

        if self.tx.send(task).is_err() {
            warn!("Dispatcher has been shut down, dropping task");
        }
    }

    /// Enqueues `task` once `delay` has elapsed. The task doesn't count as
    /// pending while it waits.
    pub fn enqueue_after<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let dispatcher = self.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            dispatcher.enqueue(task);
        });
    }

    /// Whether any task is queued or running.
    pub fn pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    /// Number of tasks currently holding a slot.
    pub fn running(&self) -> usize {
        self.concurrency - self.semaphore.available_permits()
    }

    /// Stops starting new tasks. Tasks that are already running finish on
    /// their own.
    pub fn shutdown(&self) {
        self.worker.abort();
        self.semaphore.close();
    }
}

async fn run_queue(mut rx: mpsc::UnboundedReceiver<Task>, semaphore: Arc<Semaphore>) {
    // Tasks only leave the channel once a slot is free, so they start in
    // submission order
    while let Some(task) = rx.recv().await {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };

        tokio::spawn(async move {
            task.await;
            drop(permit);
        });
    }
}
