//! Fixed-size worker pool with a FIFO task queue.
//!
//! Workers block on a condition variable when the queue is empty and wake on
//! enqueue or shutdown. Shutdown is drain-then-exit: every task queued before
//! the shutdown flag flips is executed before the workers return, so signal
//! side-effects of already-accepted ticks are never lost. Enqueue never
//! blocks; the queue is unbounded by contract.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

/// Default worker count when the caller does not size the pool.
pub const DEFAULT_WORKERS: usize = 8;

type Task = Box<dyn FnOnce() + Send>;

struct PoolShared {
    queue: Mutex<VecDeque<Task>>,
    available: Condvar,
    shutdown: AtomicBool,
}

/// Pool of OS threads draining one shared FIFO queue.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        let shared = Arc::new(PoolShared {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let workers = (0..num_workers)
            .map(|i| {
                let shared = shared.clone();
                thread::Builder::new()
                    .name(format!("alpha-worker-{i}"))
                    .spawn(move || worker_loop(shared))
                    .unwrap_or_else(|e| panic!("failed to spawn worker thread {i}: {e}"))
            })
            .collect();

        debug!("Worker pool started with {} workers", num_workers);

        Self {
            shared,
            workers: Mutex::new(workers),
        }
    }

    /// Queue a task. Silently ignored after shutdown.
    pub fn execute(&self, task: impl FnOnce() + Send + 'static) {
        if self.shared.shutdown.load(Ordering::Acquire) {
            return;
        }
        self.shared.queue.lock().push_back(Box::new(task));
        self.shared.available.notify_one();
    }

    /// Tasks currently waiting for a worker.
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Flag shutdown, wake everyone, and join the workers after they drain
    /// the queue. Idempotent.
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.available.notify_all();
        for handle in self.workers.lock().drain(..) {
            if handle.join().is_err() {
                warn!("Worker thread panicked during shutdown");
            }
        }
        debug!("Worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<PoolShared>) {
    loop {
        let task = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(task) = queue.pop_front() {
                    break Some(task);
                }
                if shared.shutdown.load(Ordering::Acquire) {
                    break None;
                }
                shared.available.wait(&mut queue);
            }
        };

        match task {
            Some(task) => task(),
            None => return,
        }
    }
}
