//! Serialized execution without locks.
//!
//! An [`ExecutionSerializer`] accepts continuations from any number of
//! threads and runs them one at a time, in a single logical stream:
//!
//! - `schedule` pushes the continuation onto a lock-free queue, then bumps
//!   an atomic pending counter;
//! - the producer whose increment moves the counter from 0 to 1 asks the
//!   host execution context for one *drain pass*;
//! - the drain pass pops and runs continuations, decrementing the counter
//!   after each, and stops exactly when the counter returns to 0.
//!
//! Because only the 0 → 1 transition requests a pass, and a pass only
//! stops when it observes 0, at most one pass drains a serializer at any
//! time.
//!
//! On top of that sit a [`SuspensionPoint`], an awaitable that only
//! resumes after its continuation went through the drain loop, and a
//! [`Mailbox`], an unbounded FIFO whose queue is only ever touched from
//! inside the drain loop.

mod context;
mod core;
mod mailbox;
mod suspend;

pub use self::context::{SerializerId, current_id};
pub use self::core::{Continuation, ExecutionSerializer, FaultPolicy, SerializerBuilder};
pub use mailbox::Mailbox;
pub use suspend::{Enter, Run, SuspensionPoint};
