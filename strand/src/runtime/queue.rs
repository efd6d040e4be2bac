use crate::host::{Callback, HostError};
use crate::runtime::task::Runnable;

use std::collections::VecDeque;
use std::mem;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// A unit of work picked up by a worker.
pub(crate) enum Work {
    /// A spawned task to poll.
    Task(Arc<dyn Runnable>),

    /// A callback posted through [`HostContext`](crate::HostContext).
    Job(Callback),
}

struct State {
    items: VecDeque<Work>,
    closed: bool,
}

/// The run queue shared by every worker of a runtime.
///
/// Workers block on a condition variable while the queue is empty. Once
/// closed, the queue rejects new work and wakes every worker so they can
/// exit.
pub(crate) struct RunQueue {
    state: Mutex<State>,
    available: Condvar,
}

impl RunQueue {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends work and wakes one idle worker.
    pub(crate) fn push(&self, work: Work) -> Result<(), HostError> {
        let mut state = self.lock();
        if state.closed {
            return Err(HostError::ShutDown);
        }

        state.items.push_back(work);
        drop(state);

        self.available.notify_one();
        Ok(())
    }

    /// Takes the next piece of work, blocking while the queue is empty.
    ///
    /// Returns `None` once the queue has been closed.
    pub(crate) fn next(&self) -> Option<Work> {
        let mut state = self.lock();

        loop {
            if state.closed {
                return None;
            }

            if let Some(work) = state.items.pop_front() {
                return Some(work);
            }

            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Rejects further work, discards what is queued and wakes all workers.
    ///
    /// Returns the number of discarded posted jobs. Each of them may be a
    /// drain pass, whose serializer then stays stalled.
    pub(crate) fn close(&self) -> usize {
        let leftover = {
            let mut state = self.lock();
            state.closed = true;
            mem::take(&mut state.items)
        };

        let jobs = leftover
            .iter()
            .filter(|work| matches!(work, Work::Job(_)))
            .count();
        let tasks = leftover.len() - jobs;

        if jobs > 0 {
            tracing::warn!(
                discarded_jobs = jobs,
                discarded_tasks = tasks,
                "run queue closed with posted jobs, their serializers stay stalled"
            );
        } else if tasks > 0 {
            tracing::debug!(discarded_tasks = tasks, "run queue closed with pending tasks");
        }

        // Dropped outside the lock: tasks hold handles back to this queue.
        drop(leftover);
        self.available.notify_all();

        jobs
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
