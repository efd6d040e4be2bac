use crate::host::{Callback, HostContext, HostError};
use crate::runtime::context;
use crate::runtime::queue::{RunQueue, Work};
use crate::runtime::task::{JoinHandle, Task};

use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A cloneable reference to a running [`Runtime`](crate::Runtime).
///
/// The handle is the runtime's [`HostContext`]: posting a callback queues
/// it for one of the worker threads. Once the runtime is dropped, posting
/// fails with [`HostError::ShutDown`].
#[derive(Clone)]
pub struct Handle {
    queue: Arc<RunQueue>,
}

impl Handle {
    pub(crate) fn new(queue: Arc<RunQueue>) -> Self {
        Self { queue }
    }

    /// Returns the handle of the runtime driving the current thread.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a runtime.
    pub fn current() -> Self {
        Self::try_current().expect("Handle::current must be called within the context of a runtime")
    }

    /// Returns the handle of the runtime driving the current thread, if any.
    pub fn try_current() -> Option<Self> {
        context::current_handle()
    }

    /// Spawns a future onto this runtime.
    ///
    /// A future spawned after shutdown never runs; its handle never resolves.
    pub fn spawn<F, T>(&self, future: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let task = Arc::new(Task::new(future, self.queue.clone()));

        if let Err(err) = self.queue.push(Work::Task(task.clone())) {
            tracing::warn!(%err, "task spawned on a runtime that has shut down");
        }

        JoinHandle { task }
    }

    /// Returns `true` once the runtime stopped accepting work.
    pub fn is_shut_down(&self) -> bool {
        self.queue.is_closed()
    }
}

impl HostContext for Handle {
    fn post(&self, callback: Callback) -> Result<(), HostError> {
        self.queue.push(Work::Job(callback))
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
