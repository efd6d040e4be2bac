use super::core::ExecutionSerializer;

use std::fmt;
use std::future::{Future, IntoFuture};
use std::mem;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

/// A reusable awaitable bound to one [`ExecutionSerializer`].
///
/// Awaiting it always suspends, even when already running inside the
/// serializer's drain pass: there is no fast path, so operations queued
/// through the same point can never overtake one another.
///
/// - [`enter`](Self::enter) resolves once its (empty) continuation went
///   through the drain loop, i.e. after everything scheduled before it.
/// - [`run`](Self::run) executes a closure inside the drain loop and
///   resolves to its result. This is how state owned by the serializer is
///   read and written.
#[derive(Clone)]
pub struct SuspensionPoint {
    serializer: ExecutionSerializer,
}

impl SuspensionPoint {
    pub(crate) fn new(serializer: ExecutionSerializer) -> Self {
        Self { serializer }
    }

    /// The serializer this point resumes through.
    pub fn serializer(&self) -> &ExecutionSerializer {
        &self.serializer
    }

    /// Returns a future resolving after a round trip through the serializer.
    pub fn enter(&self) -> Enter {
        fn resume() {}

        Enter {
            run: self.run(resume as fn()),
        }
    }

    /// Returns a future that runs `body` inside the serializer's drain loop
    /// and resolves to its result.
    ///
    /// Nothing is scheduled until the future is first polled. Once
    /// scheduled, `body` runs even if the future is dropped.
    ///
    /// # Panics
    ///
    /// The future panics if `body` panicked: the panic itself is handled
    /// by the serializer's [`FaultPolicy`](super::FaultPolicy).
    pub fn run<F, R>(&self, body: F) -> Run<F, R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        Run {
            state: RunState::Unscheduled {
                serializer: self.serializer.clone(),
                body,
            },
        }
    }
}

impl<'a> IntoFuture for &'a SuspensionPoint {
    type Output = ();
    type IntoFuture = Enter;

    fn into_future(self) -> Enter {
        self.enter()
    }
}

impl fmt::Debug for SuspensionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspensionPoint")
            .field("serializer", &self.serializer.id())
            .finish()
    }
}

/// Future returned by [`SuspensionPoint::enter`].
#[must_use = "futures do nothing unless awaited"]
pub struct Enter {
    run: Run<fn(), ()>,
}

impl Future for Enter {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        Pin::new(&mut self.run).poll(cx)
    }
}

/// Future returned by [`SuspensionPoint::run`].
#[must_use = "futures do nothing unless awaited"]
pub struct Run<F, R> {
    state: RunState<F, R>,
}

enum RunState<F, R> {
    Unscheduled {
        serializer: ExecutionSerializer,
        body: F,
    },
    Scheduled(Arc<Completion<R>>),
    Done,
}

// `body` is moved out by value and never pinned.
impl<F, R> Unpin for Run<F, R> {}

impl<F, R> Future for Run<F, R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    type Output = R;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<R> {
        let this = self.get_mut();

        match mem::replace(&mut this.state, RunState::Done) {
            RunState::Unscheduled { serializer, body } => {
                let completion = Arc::new(Completion::new(cx.waker().clone()));
                let completer = Completer(Some(completion.clone()));

                serializer.schedule(move || completer.complete(body()));

                this.state = RunState::Scheduled(completion);
                Poll::Pending
            }
            RunState::Scheduled(completion) => match completion.poll_take(cx.waker()) {
                Poll::Ready(Some(value)) => Poll::Ready(value),
                Poll::Ready(None) => panic!("operation on the execution serializer panicked"),
                Poll::Pending => {
                    this.state = RunState::Scheduled(completion);
                    Poll::Pending
                }
            },
            RunState::Done => panic!("`Run` polled after completion"),
        }
    }
}

enum Slot<R> {
    Waiting(Waker),
    Ready(R),
    Abandoned,
    Taken,
}

/// Handoff between a continuation and the future awaiting it.
struct Completion<R> {
    slot: Mutex<Slot<R>>,
}

impl<R> Completion<R> {
    fn new(waker: Waker) -> Self {
        Self {
            slot: Mutex::new(Slot::Waiting(waker)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<R>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `Ready(None)` means the continuation was dropped without a value.
    fn poll_take(&self, waker: &Waker) -> Poll<Option<R>> {
        let mut slot = self.lock();

        match mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(value) => Poll::Ready(Some(value)),
            Slot::Abandoned | Slot::Taken => Poll::Ready(None),
            Slot::Waiting(current) => {
                let waker = if current.will_wake(waker) {
                    current
                } else {
                    waker.clone()
                };
                *slot = Slot::Waiting(waker);
                Poll::Pending
            }
        }
    }
}

/// Producer side of a [`Completion`], moved into the continuation.
///
/// Dropping it without completing (the body panicked) marks the
/// completion as abandoned so the awaiting future does not hang.
struct Completer<R>(Option<Arc<Completion<R>>>);

impl<R> Completer<R> {
    fn complete(mut self, value: R) {
        self.settle(Slot::Ready(value));
    }

    fn settle(&mut self, outcome: Slot<R>) {
        let Some(completion) = self.0.take() else {
            return;
        };

        let previous = mem::replace(&mut *completion.lock(), outcome);
        if let Slot::Waiting(waker) = previous {
            waker.wake();
        }
    }
}

impl<R> Drop for Completer<R> {
    fn drop(&mut self) {
        self.settle(Slot::Abandoned);
    }
}

#[cfg(test)]
mod tests {
    use crate::host::testing::ManualHost;
    use crate::serializer::{ExecutionSerializer, FaultPolicy};

    use std::future::Future;
    use std::panic::{self, AssertUnwindSafe};
    use std::pin::pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll, Waker};

    #[test]
    fn enter_always_suspends_first() {
        let host = ManualHost::new();
        let serializer = ExecutionSerializer::new(host.clone());
        let point = serializer.suspension_point();
        let mut cx = Context::from_waker(Waker::noop());

        let mut enter = pin!(point.enter());
        assert_eq!(enter.as_mut().poll(&mut cx), Poll::Pending);
        assert_eq!(enter.as_mut().poll(&mut cx), Poll::Pending);
        assert_eq!(serializer.pending(), 1);

        host.run_next().unwrap();
        assert_eq!(enter.as_mut().poll(&mut cx), Poll::Ready(()));
    }

    #[test]
    fn enter_suspends_even_inside_the_drain() {
        let host = ManualHost::new();
        let serializer = ExecutionSerializer::new(host.clone());
        let point = serializer.suspension_point();
        let first_poll = Arc::new(Mutex::new(None));

        let parked = Arc::new(Mutex::new(None));
        {
            let point = point.clone();
            let first_poll = first_poll.clone();
            let parked = parked.clone();
            serializer.schedule(move || {
                assert!(point.serializer().is_current());

                let mut enter = Box::pin(point.enter());
                let poll = enter.as_mut().poll(&mut Context::from_waker(Waker::noop()));
                *first_poll.lock().unwrap() = Some(poll);
                *parked.lock().unwrap() = Some(enter);
            });
        }

        host.run_next().unwrap();

        assert_eq!(*first_poll.lock().unwrap(), Some(Poll::Pending));
        // The resumption was queued behind and drained by the same pass.
        assert_eq!(serializer.drain_requests(), 1);
        assert_eq!(serializer.pending(), 0);

        let mut enter = parked.lock().unwrap().take().unwrap();
        let resumed = enter.as_mut().poll(&mut Context::from_waker(Waker::noop()));
        assert_eq!(resumed, Poll::Ready(()));
    }

    #[test]
    fn run_executes_body_inside_the_drain() {
        let host = ManualHost::new();
        let serializer = ExecutionSerializer::new(host.clone());
        let point = serializer.suspension_point();
        let mut cx = Context::from_waker(Waker::noop());

        let inside = {
            let serializer = serializer.clone();
            move || (serializer.is_current(), 6 * 7)
        };
        let mut run = pin!(point.run(inside));

        assert_eq!(run.as_mut().poll(&mut cx), Poll::Pending);
        host.run_next().unwrap();
        assert_eq!(run.as_mut().poll(&mut cx), Poll::Ready((true, 42)));
    }

    #[test]
    fn unpolled_run_schedules_nothing() {
        let host = ManualHost::new();
        let serializer = ExecutionSerializer::new(host.clone());
        let touched = Arc::new(AtomicBool::new(false));

        let run = {
            let touched = touched.clone();
            serializer
                .suspension_point()
                .run(move || touched.store(true, Ordering::SeqCst))
        };
        drop(run);

        assert_eq!(host.posted(), 0);
        assert_eq!(serializer.pending(), 0);
        assert!(!touched.load(Ordering::SeqCst));
    }

    #[test]
    fn panicking_body_fails_its_awaiter() {
        let host = ManualHost::new();
        let serializer = ExecutionSerializer::builder()
            .fault_policy(FaultPolicy::Isolate)
            .build(host.clone());
        let point = serializer.suspension_point();
        let mut cx = Context::from_waker(Waker::noop());

        let mut run = Box::pin(point.run(|| -> u32 { panic!("body failed") }));
        assert_eq!(run.as_mut().poll(&mut cx), Poll::Pending);

        host.run_next().unwrap();
        assert_eq!(serializer.pending(), 0);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| run.as_mut().poll(&mut cx)));
        assert!(outcome.is_err());
    }
}
