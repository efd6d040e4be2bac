use super::Handle;
use super::builder::RuntimeBuilder;
use super::executor::core::Executor;
use super::queue::RunQueue;
use super::task::JoinHandle;
use crate::host::HostError;

use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};
use std::thread::{self, Thread};

/// The bundled multi-threaded runtime.
///
/// `Runtime` is responsible for:
/// - running spawned tasks on its worker threads,
/// - running callbacks posted through its [`Handle`] (the serializer's
///   drain passes),
/// - providing a synchronous entry point via [`block_on`](Self::block_on).
///
/// Dropping the runtime closes its run queue and joins its workers. Work
/// still queued at that point is discarded.
pub struct Runtime {
    executor: Executor,
    handle: Handle,
}

impl Runtime {
    /// Creates a runtime with the default configuration.
    pub fn new() -> Self {
        RuntimeBuilder::new().build()
    }

    /// Starts `worker_threads` workers.
    pub(crate) fn start(worker_threads: usize, thread_name: &str) -> Result<Self, HostError> {
        let queue = Arc::new(RunQueue::new());
        let executor = Executor::new(queue.clone(), worker_threads, thread_name)?;

        tracing::debug!(worker_threads, "runtime started");

        Ok(Self {
            executor,
            handle: Handle::new(queue),
        })
    }

    /// Returns a handle to this runtime.
    ///
    /// The handle is the [`HostContext`](crate::HostContext) to give to
    /// serializers that should run on this runtime.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawns a future onto the runtime.
    pub fn spawn<F, T>(&self, future: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Runs a future to completion on the runtime, blocking the current
    /// thread until it finishes.
    ///
    /// # Panics
    ///
    /// Resumes the future's panic, if it panicked.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let runtime = RuntimeBuilder::new().worker_threads(2).build();
    /// assert_eq!(runtime.block_on(async { 42 }), 42);
    /// ```
    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        park_until_ready(self.spawn(future))
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.executor.shutdown();
        self.executor.join();

        tracing::debug!("runtime stopped");
    }
}

/// Wakes a thread parked in [`park_until_ready`].
struct Unparker(Thread);

impl Wake for Unparker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.unpark();
    }
}

/// Polls `future` on the calling thread, parking between polls.
fn park_until_ready<F: Future>(future: F) -> F::Output {
    let waker = Waker::from(Arc::new(Unparker(thread::current())));
    let mut cx = Context::from_waker(&waker);
    let mut future = pin!(future);

    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
            return output;
        }

        thread::park();
    }
}
