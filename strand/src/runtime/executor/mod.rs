//! Worker threads of the runtime.
//!
//! - [`core`]: spawns the workers and owns their join handles,
//! - [`worker`]: the loop each worker thread runs.

pub(crate) mod core;
pub(crate) mod worker;
