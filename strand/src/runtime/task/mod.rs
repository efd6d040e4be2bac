//! Spawning and joining tasks on the bundled runtime.
//!
//! Most code only needs [`spawn`] and the [`JoinHandle`] it returns, for
//! example to run several mailbox producers concurrently.

pub(crate) mod handle;
pub(crate) mod state;

mod core;

pub(crate) use self::core::{Runnable, Task};

pub use self::core::spawn;
pub use handle::JoinHandle;
