use super::JoinHandle;
use super::state::{COMPLETE, IDLE, NOTIFIED, RUNNING, SCHEDULED};
use crate::runtime::Handle;
use crate::runtime::queue::{RunQueue, Work};

use std::cell::UnsafeCell;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, Wake, Waker};
use std::thread;

/// Something a worker can execute.
///
/// Lets the run queue hold tasks of every output type behind
/// `Arc<dyn Runnable>`.
pub(crate) trait Runnable: Send + Sync {
    fn run(self: Arc<Self>);
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A spawned future together with its scheduling state and output slot.
pub(crate) struct Task<T> {
    /// The future; `None` once it completed.
    future: UnsafeCell<Option<BoxFuture<T>>>,

    /// The output, or the panic payload if polling panicked.
    output: UnsafeCell<Option<thread::Result<T>>>,

    /// One of the constants in [`state`](super::state).
    pub(crate) state: AtomicUsize,

    /// Queue the task is pushed back onto when woken.
    queue: Arc<RunQueue>,

    /// Waker of the `JoinHandle` awaiting this task, if any.
    joiner: Mutex<Option<Waker>>,
}

// Safety: `future` is only touched by the worker that moved the state to
// RUNNING, `output` is written before COMPLETE is published and read only
// after COMPLETE is observed.
unsafe impl<T: Send> Send for Task<T> {}
unsafe impl<T: Send> Sync for Task<T> {}

impl<T: Send + 'static> Task<T> {
    pub(crate) fn new<F>(future: F, queue: Arc<RunQueue>) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            future: UnsafeCell::new(Some(Box::pin(future))),
            output: UnsafeCell::new(None),
            state: AtomicUsize::new(SCHEDULED),
            queue,
            joiner: Mutex::new(None),
        }
    }

    /// Polls the future once.
    ///
    /// A panic raised by the future is captured as the task's output so the
    /// joiner observes it instead of the worker.
    fn poll_once(self: Arc<Self>) {
        if self
            .state
            .compare_exchange(SCHEDULED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let waker = Waker::from(self.clone());
        let mut cx = Context::from_waker(&waker);

        // Safety: the RUNNING state grants exclusive access.
        let slot = unsafe { &mut *self.future.get() };
        let Some(future) = slot.as_mut() else {
            return;
        };

        match panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx))) {
            Ok(Poll::Pending) => {
                if self
                    .state
                    .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    // Woken mid-poll: the state is NOTIFIED.
                    self.state.store(SCHEDULED, Ordering::Release);
                    self.clone().enqueue();
                }
            }
            Ok(Poll::Ready(value)) => self.complete(slot, Ok(value)),
            Err(payload) => self.complete(slot, Err(payload)),
        }
    }

    fn complete(&self, slot: &mut Option<BoxFuture<T>>, output: thread::Result<T>) {
        *slot = None;

        // Safety: still RUNNING, nobody reads `output` before COMPLETE.
        unsafe { *self.output.get() = Some(output) };
        self.state.store(COMPLETE, Ordering::Release);

        let joiner = self
            .joiner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(waker) = joiner {
            waker.wake();
        }
    }

    fn enqueue(self: Arc<Self>) {
        if self.queue.push(Work::Task(self.clone())).is_err() {
            tracing::trace!("runtime shut down, dropping woken task");
        }
    }

    /// Takes the output if the task is complete.
    pub(crate) fn take_output(&self) -> Option<thread::Result<T>> {
        if self.state.load(Ordering::Acquire) != COMPLETE {
            return None;
        }

        // Safety: COMPLETE was observed with Acquire, and only the single
        // `JoinHandle` takes the output.
        unsafe { (*self.output.get()).take() }
    }

    pub(crate) fn register_joiner(&self, waker: &Waker) {
        *self.joiner.lock().unwrap_or_else(PoisonError::into_inner) = Some(waker.clone());
    }
}

impl<T: Send + 'static> Wake for Task<T> {
    /// Queues the task again, or flags it if it is being polled right now.
    fn wake(self: Arc<Self>) {
        loop {
            match self.state.load(Ordering::Acquire) {
                IDLE => {
                    if self
                        .state
                        .compare_exchange(IDLE, SCHEDULED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.enqueue();
                        return;
                    }
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                _ => return,
            }
        }
    }
}

impl<T: Send + 'static> Runnable for Task<T> {
    fn run(self: Arc<Self>) {
        self.poll_once();
    }
}

/// Spawns a future onto the current runtime.
///
/// # Panics
///
/// Panics if called outside the context of a runtime.
pub fn spawn<F, T>(future: F) -> JoinHandle<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    Handle::current().spawn(future)
}
