use crate::runtime::Handle;
use crate::runtime::context::enter_context;
use crate::runtime::queue::{RunQueue, Work};
use crate::utils::panic_message;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// One worker thread of the runtime.
pub(crate) struct Worker {
    id: usize,
    queue: Arc<RunQueue>,
    handle: Handle,
}

impl Worker {
    pub(crate) fn new(id: usize, queue: Arc<RunQueue>, handle: Handle) -> Self {
        Self { id, queue, handle }
    }

    /// Executes work until the run queue is closed.
    ///
    /// The runtime handle stays installed for the whole loop so that
    /// spawned tasks and drain passes can reach it.
    pub(crate) fn run(self) {
        tracing::debug!(worker = self.id, "worker started");

        enter_context(self.handle.clone(), || {
            while let Some(work) = self.queue.next() {
                self.execute(work);
            }
        });

        tracing::debug!(worker = self.id, "worker stopped");
    }

    /// Runs one piece of work.
    ///
    /// Tasks capture their own panics. A posted job that panics (for
    /// example a drain pass whose continuation failed) is reported here and
    /// the worker carries on.
    fn execute(&self, work: Work) {
        match work {
            Work::Task(task) => task.run(),
            Work::Job(job) => {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                    tracing::error!(
                        worker = self.id,
                        panic = panic_message(payload.as_ref()),
                        "posted job panicked"
                    );
                }
            }
        }
    }
}
