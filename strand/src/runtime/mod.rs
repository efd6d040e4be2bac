//! The bundled host execution context.
//!
//! A small, fixed pool of worker threads pulling work from one shared run
//! queue. It serves two purposes:
//! - it is a [`HostContext`](crate::HostContext) (through [`Handle`]) able
//!   to run serializer drain passes,
//! - it drives the futures returned by the serializer and the mailbox
//!   ([`spawn`](task::spawn), [`Runtime::block_on`]).
//!
//! There is no I/O, no timer and no work stealing here.

mod core;
mod executor;
mod handle;
mod queue;

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod yield_now;

pub mod task;

pub use self::core::Runtime;
pub use handle::Handle;
