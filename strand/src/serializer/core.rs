use super::context::{self, DrainScope, SerializerId};
use super::suspend::SuspensionPoint;
use crate::config::ConfigError;
use crate::host::{Callback, HostContext};
use crate::utils::{MpscQueue, panic_message};

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// A unit of work waiting to run on a serializer.
pub type Continuation = Callback;

/// What a drain pass does when a continuation panics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FaultPolicy {
    /// Let the panic escape the drain pass into the host.
    ///
    /// The pending counter is left above zero with nobody draining: every
    /// later continuation is accepted but never runs. The serializer is
    /// stalled for good.
    #[default]
    Propagate,

    /// Catch the panic, log it, and keep draining.
    Isolate,
}

impl FromStr for FaultPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "propagate" => Ok(FaultPolicy::Propagate),
            "isolate" => Ok(FaultPolicy::Isolate),
            _ => Err(ConfigError::InvalidFaultPolicy {
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for FaultPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultPolicy::Propagate => f.write_str("propagate"),
            FaultPolicy::Isolate => f.write_str("isolate"),
        }
    }
}

/// Builder for an [`ExecutionSerializer`].
///
/// # Examples
///
/// ```rust,ignore
/// let serializer = ExecutionSerializer::builder()
///     .fault_policy(FaultPolicy::Isolate)
///     .build(runtime.handle().clone());
/// ```
#[derive(Clone, Debug, Default)]
pub struct SerializerBuilder {
    fault_policy: FaultPolicy,
}

impl SerializerBuilder {
    /// Creates a builder with the default [`FaultPolicy::Propagate`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets what happens when a continuation panics.
    pub fn fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    /// Creates a serializer whose drain passes run on `host`.
    pub fn build<H: HostContext + 'static>(self, host: H) -> ExecutionSerializer {
        let inner = Inner {
            id: SerializerId::next(),
            continuations: MpscQueue::new(),
            pending: AtomicUsize::new(0),
            drain_requests: AtomicUsize::new(0),
            policy: self.fault_policy,
            host: Box::new(host),
        };

        ExecutionSerializer {
            inner: Arc::new(inner),
        }
    }
}

/// Runs continuations submitted from any thread one at a time, without
/// locking.
///
/// Cloning is cheap; clones share the same queue and counter and thus the
/// same execution stream.
#[derive(Clone)]
pub struct ExecutionSerializer {
    inner: Arc<Inner>,
}

struct Inner {
    id: SerializerId,

    /// Continuations accepted but not yet started.
    continuations: MpscQueue<Continuation>,

    /// Continuations accepted but not yet finished. Zero means idle.
    pending: AtomicUsize,

    /// Drain passes requested from the host so far.
    drain_requests: AtomicUsize,

    policy: FaultPolicy,

    host: Box<dyn HostContext>,
}

impl ExecutionSerializer {
    /// Creates a serializer with the default configuration.
    pub fn new<H: HostContext + 'static>(host: H) -> Self {
        SerializerBuilder::new().build(host)
    }

    /// Returns a builder to configure a serializer.
    pub fn builder() -> SerializerBuilder {
        SerializerBuilder::new()
    }

    /// Returns this serializer's identity.
    pub fn id(&self) -> SerializerId {
        self.inner.id
    }

    /// Returns the policy applied to panicking continuations.
    pub fn fault_policy(&self) -> FaultPolicy {
        self.inner.policy
    }

    /// Schedules `continuation` to run on this serializer.
    ///
    /// Never blocks. If the serializer was idle, one drain pass is
    /// requested from the host; otherwise the running pass will reach the
    /// continuation by itself.
    pub fn schedule<F>(&self, continuation: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_boxed(Box::new(continuation));
    }

    /// Same as [`schedule`](Self::schedule) for an already boxed continuation.
    pub fn schedule_boxed(&self, continuation: Continuation) {
        let inner = &self.inner;

        // Push strictly before the increment: the drain loop relies on every
        // counted continuation being in the queue.
        inner.continuations.push(continuation);
        let previous = inner.pending.fetch_add(1, Ordering::AcqRel);

        tracing::trace!(
            serializer = %inner.id,
            pending = previous + 1,
            nested = self.is_current(),
            "continuation scheduled"
        );

        if previous == 0 {
            inner.request_drain();
        }
    }

    /// Returns an awaitable that resumes through this serializer.
    pub fn suspension_point(&self) -> SuspensionPoint {
        SuspensionPoint::new(self.clone())
    }

    /// Number of continuations accepted but not finished yet.
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Number of drain passes requested from the host since creation.
    pub fn drain_requests(&self) -> usize {
        self.inner.drain_requests.load(Ordering::Acquire)
    }

    /// Returns `true` if the calling thread is inside this serializer's
    /// drain pass.
    pub fn is_current(&self) -> bool {
        context::current_id() == Some(self.inner.id)
    }
}

impl fmt::Debug for ExecutionSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionSerializer")
            .field("id", &self.inner.id)
            .field("pending", &self.pending())
            .field("fault_policy", &self.inner.policy)
            .finish()
    }
}

impl Inner {
    /// Asks the host for one drain pass. Called on the 0 → 1 transition only.
    fn request_drain(self: &Arc<Self>) {
        self.drain_requests.fetch_add(1, Ordering::AcqRel);

        let inner = Arc::clone(self);
        if let Err(err) = self.host.post(Box::new(move || inner.drain())) {
            tracing::warn!(
                serializer = %self.id,
                %err,
                "host refused drain pass, serializer stalled"
            );
        }
    }

    /// Runs continuations until the pending counter drops back to zero.
    fn drain(&self) {
        let _scope = DrainScope::enter(self.id);
        let _stall = StallReport(self);

        tracing::debug!(serializer = %self.id, "drain pass started");

        let mut ran = 0usize;
        loop {
            // Safety: this pass is the only consumer. A pass is requested on
            // the 0 -> 1 transition only and the counter stays above zero
            // until its final decrement below. The counter being above zero
            // also guarantees a fully pushed continuation is waiting.
            let continuation = unsafe { self.continuations.pop_published() };

            self.invoke(continuation);
            ran += 1;

            if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                break;
            }
        }

        tracing::debug!(serializer = %self.id, ran, "drain pass finished, serializer idle");
    }

    fn invoke(&self, continuation: Continuation) {
        tracing::trace!(serializer = %self.id, "running continuation");

        match self.policy {
            FaultPolicy::Propagate => continuation(),
            FaultPolicy::Isolate => {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(continuation)) {
                    tracing::error!(
                        serializer = %self.id,
                        panic = panic_message(payload.as_ref()),
                        "continuation panicked, continuing drain"
                    );
                }
            }
        }
    }
}

/// Reports a drain pass left by a panic.
struct StallReport<'a>(&'a Inner);

impl Drop for StallReport<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            tracing::error!(
                serializer = %self.0.id,
                pending = self.0.pending.load(Ordering::Acquire),
                "continuation panicked, serializer stalled"
            );
        }
    }
}
