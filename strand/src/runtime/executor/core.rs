use crate::host::HostError;
use crate::runtime::Handle;
use crate::runtime::executor::worker::Worker;
use crate::runtime::queue::RunQueue;

use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Owns the worker threads of a runtime.
pub(crate) struct Executor {
    /// Queue shared by all workers.
    queue: Arc<RunQueue>,

    /// Join handles of the worker threads.
    workers: Vec<JoinHandle<()>>,
}

impl Executor {
    /// Starts `threads` workers named `{name}-{id}`.
    ///
    /// If the OS refuses a thread, the workers already started are stopped
    /// again and [`HostError::Unavailable`] is returned.
    pub(crate) fn new(queue: Arc<RunQueue>, threads: usize, name: &str) -> Result<Self, HostError> {
        let handle = Handle::new(queue.clone());
        let mut executor = Self {
            queue: queue.clone(),
            workers: Vec::with_capacity(threads),
        };

        for id in 0..threads {
            let worker = Worker::new(id, queue.clone(), handle.clone());

            let spawned = thread::Builder::new()
                .name(format!("{name}-{id}"))
                .spawn(move || worker.run());

            match spawned {
                Ok(join) => executor.workers.push(join),
                Err(err) => {
                    tracing::error!(worker = id, %err, "failed to spawn runtime worker thread");

                    executor.shutdown();
                    executor.join();
                    return Err(HostError::Unavailable);
                }
            }
        }

        Ok(executor)
    }

    /// Closes the run queue; workers exit once they finish their current work.
    pub(crate) fn shutdown(&self) {
        self.queue.close();
    }

    /// Waits for every worker to exit.
    ///
    /// A worker cannot join itself, so when the runtime is dropped from one
    /// of its own workers that thread is left to exit on its own.
    pub(crate) fn join(&mut self) {
        let me = thread::current().id();

        for worker in self.workers.drain(..) {
            if worker.thread().id() == me {
                continue;
            }

            let _ = worker.join();
        }
    }
}
