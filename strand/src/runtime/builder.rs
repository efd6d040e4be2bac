use super::Runtime;

use std::thread;

/// Builder for configuring and creating a [`Runtime`].
///
/// # Examples
///
/// ```rust,ignore
/// let runtime = RuntimeBuilder::new()
///     .worker_threads(4)
///     .thread_name("mailbox")
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct RuntimeBuilder {
    /// Number of worker threads.
    worker_threads: usize,

    /// Prefix of the worker thread names.
    thread_name: String,
}

impl RuntimeBuilder {
    /// Creates a builder with one worker per available CPU (falling back
    /// to `1`) and threads named `strand-worker-{id}`.
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            worker_threads,
            thread_name: String::from("strand-worker"),
        }
    }

    /// Sets the number of worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.worker_threads = n;
        self
    }

    /// Sets the prefix of the worker thread names.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Starts the runtime.
    ///
    /// # Panics
    ///
    /// Panics if the worker threads cannot be spawned. Use
    /// [`try_build`](Self::try_build) to handle that case.
    pub fn build(self) -> Runtime {
        match self.try_build() {
            Ok(runtime) => runtime,
            Err(err) => panic!("failed to start runtime: {err}"),
        }
    }

    /// Starts the runtime, reporting a failure to spawn its workers.
    pub fn try_build(self) -> crate::Result<Runtime> {
        Ok(Runtime::start(self.worker_threads, &self.thread_name)?)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
