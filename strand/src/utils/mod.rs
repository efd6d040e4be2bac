//! Low-level building blocks shared by the serializer and the runtime.
//!
//! - [`MpscQueue`]: an unbounded lock-free multi-producer, single-consumer
//!   queue used as the serializer's continuation queue.
//! - [`panic_message`]: renders a caught panic payload for logging.

mod mpsc;
mod panic;

pub(crate) use mpsc::MpscQueue;
pub(crate) use panic::panic_message;
