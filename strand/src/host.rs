//! Host execution contexts.
//!
//! An [`ExecutionSerializer`](crate::serializer::ExecutionSerializer) never
//! runs its drain passes by itself: it asks a host to "run this callback
//! eventually". Anything able to do that can act as a host, for example
//! the bundled [`Runtime`](crate::Runtime) (through its
//! [`Handle`](crate::Handle)) or [`ThreadPerPass`].

use std::fmt;
use std::sync::Arc;
use std::thread;

use thiserror::Error;

/// A callback handed to a host for later execution.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Errors reported by a host when it cannot accept a callback.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    /// The host no longer accepts work.
    #[error("host execution context has shut down")]
    ShutDown,

    /// The host failed to obtain an execution resource (thread, slot, ...).
    #[error("host execution context could not start the callback")]
    Unavailable,
}

/// An opaque scheduler that eventually runs posted callbacks.
///
/// Implementations decide on which thread and when a callback runs. The
/// only requirement is that an accepted callback is eventually invoked.
/// A callback that panics is the host's problem to report.
pub trait HostContext: Send + Sync {
    /// Requests that `callback` be run at some later point.
    fn post(&self, callback: Callback) -> Result<(), HostError>;
}

impl<H: HostContext + ?Sized> HostContext for Arc<H> {
    fn post(&self, callback: Callback) -> Result<(), HostError> {
        (**self).post(callback)
    }
}

/// A host that runs every callback on a freshly spawned OS thread.
///
/// Useful when no runtime is around: a serializer requests at most one
/// drain pass per idle period, so bursts of work cost a single thread.
#[derive(Clone, Default)]
pub struct ThreadPerPass {
    name: Option<String>,
}

impl ThreadPerPass {
    /// Creates a host with anonymous threads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the threads spawned by this host.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

impl HostContext for ThreadPerPass {
    fn post(&self, callback: Callback) -> Result<(), HostError> {
        let mut builder = thread::Builder::new();
        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }

        builder.spawn(callback).map(drop).map_err(|err| {
            tracing::warn!(%err, "failed to spawn host thread");
            HostError::Unavailable
        })
    }
}

impl fmt::Debug for ThreadPerPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPerPass")
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{Callback, HostContext, HostError};

    use std::collections::VecDeque;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// A host that only stores callbacks; tests run them explicitly.
    #[derive(Clone, Default)]
    pub(crate) struct ManualHost {
        callbacks: Arc<Mutex<VecDeque<Callback>>>,
        posted: Arc<AtomicUsize>,
        refuse: Arc<AtomicBool>,
    }

    impl ManualHost {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Number of callbacks ever accepted.
        pub(crate) fn posted(&self) -> usize {
            self.posted.load(Ordering::SeqCst)
        }

        /// Number of callbacks waiting to run.
        pub(crate) fn queued(&self) -> usize {
            self.callbacks.lock().unwrap().len()
        }

        /// Makes every following `post` fail with `ShutDown`.
        pub(crate) fn refuse(&self) {
            self.refuse.store(true, Ordering::SeqCst);
        }

        /// Runs the oldest callback. Returns `Ok(false)` when nothing was
        /// queued and `Err(())` when the callback panicked.
        pub(crate) fn run_next(&self) -> Result<bool, ()> {
            let next = self.callbacks.lock().unwrap().pop_front();
            match next {
                Some(callback) => panic::catch_unwind(AssertUnwindSafe(callback))
                    .map(|()| true)
                    .map_err(drop),
                None => Ok(false),
            }
        }
    }

    impl HostContext for ManualHost {
        fn post(&self, callback: Callback) -> Result<(), HostError> {
            if self.refuse.load(Ordering::SeqCst) {
                return Err(HostError::ShutDown);
            }

            self.posted.fetch_add(1, Ordering::SeqCst);
            self.callbacks.lock().unwrap().push_back(callback);
            Ok(())
        }
    }
}
