//! Fire-and-forget task spawning.
//!
//! Generation runs detached from the call that created the favicon. The
//! pipeline hands each task to a [`Spawner`] instead of calling
//! `tokio::spawn` itself, so tests can hold tasks back and observe the
//! `PENDING` state before driving them to completion.

use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio_util::task::TaskTracker;

/// A detached unit of work. It owns everything it needs and reports its own
/// outcome; nobody awaits its result.
pub type Task = BoxFuture<'static, ()>;

/// Runs detached tasks.
pub trait Spawner: Send + Sync {
    fn spawn(&self, task: Task);
}

/// Spawns every task onto the current Tokio runtime.
///
/// Tasks are tracked so the process can wait for in-flight generation before
/// it exits. There is no bound on how many run at once: one task per
/// creation call.
#[derive(Debug, Clone, Default)]
pub struct TokioSpawner {
    tracker: TaskTracker,
}
impl TokioSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every task spawned so far, and any spawned while waiting.
    ///
    /// Tasks can still be spawned afterwards.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
impl Spawner for TokioSpawner {
    fn spawn(&self, task: Task) {
        self.tracker.spawn(task);
    }
}

/// Queues tasks until [`run_pending()`](Self::run_pending) is called.
///
/// Tasks run one after the other, in submission order, on the caller's task.
#[derive(Default)]
pub struct DeferredSpawner {
    queue: Mutex<VecDeque<Task>>,
}
impl DeferredSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Run queued tasks until the queue is empty, including tasks queued by
    /// the tasks themselves. Returns how many ran.
    pub async fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // Pop in its own statement so the guard is dropped before awaiting.
            let next = self.lock().pop_front();
            let Some(task) = next else {
                return ran;
            };
            task.await;
            ran += 1;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Task>> {
        // A panicking task never holds the lock, so poisoning carries no
        // meaning here.
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
impl Spawner for DeferredSpawner {
    fn spawn(&self, task: Task) {
        self.lock().push_back(task);
    }
}
