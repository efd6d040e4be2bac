//! Lifecycle states of a spawned task.
//!
//! ```text
//!   SCHEDULED ──poll──▶ RUNNING ──Pending──▶ IDLE ──wake──▶ SCHEDULED
//!                          │  └──wake──▶ NOTIFIED ──Pending──▶ SCHEDULED
//!                          └──Ready / panic──▶ COMPLETE
//! ```

/// Parked: waiting for its waker to fire.
pub(crate) const IDLE: usize = 0;

/// Sitting in the run queue.
pub(crate) const SCHEDULED: usize = 1;

/// Being polled by a worker. Only one worker can observe this state.
pub(crate) const RUNNING: usize = 2;

/// Woken while being polled; must be queued again right after the poll.
pub(crate) const NOTIFIED: usize = 3;

/// The future finished (or panicked) and its output is stored.
pub(crate) const COMPLETE: usize = 4;
