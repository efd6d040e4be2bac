//! # Strand
//!
//! **Strand** serializes work submitted from any number of threads onto a
//! single logical execution stream, without putting a lock around the
//! state it protects.
//!
//! The core is the [`ExecutionSerializer`]: a lock-free continuation queue
//! and an atomic pending counter. Whoever moves the counter from 0 to 1 asks
//! the host for one drain pass; that pass runs continuations one after the
//! other until the counter falls back to 0. On top of it:
//!
//! - [`SuspensionPoint`]: an awaitable that always suspends and resumes
//!   from inside the serializer's drain loop;
//! - [`Mailbox`]: an unbounded FIFO whose buffer is only touched from
//!   inside the drain loop;
//! - [`Probable`]: the "value or nothing" result of a dequeue.
//!
//! Drain passes run on a [`HostContext`]. The crate bundles a small worker
//! pool [`Runtime`] whose [`Handle`] is such a host, together with
//! `#[strand::main]` and `#[strand::test]`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strand::{Mailbox, Probable, task};
//!
//! #[strand::main]
//! async fn main() {
//!     let mailbox = Mailbox::new();
//!
//!     let producer = {
//!         let mailbox = mailbox.clone();
//!         task::spawn(async move {
//!             for i in 0..3 {
//!                 mailbox.enqueue(i).await;
//!             }
//!         })
//!     };
//!     producer.await;
//!
//!     assert_eq!(mailbox.try_dequeue().await, Probable::Present(0));
//! }
//! ```
//!
//! ## Modules
//!
//! - [`serializer`]: the serializer, suspension points and the mailbox
//! - [`config`]: environment-driven configuration

mod error;
mod host;
mod probable;
mod runtime;
mod utils;

pub mod config;
pub mod serializer;

pub use error::{Error, Result};
pub use host::{Callback, HostContext, HostError, ThreadPerPass};
pub use probable::{NoValue, Probable};
pub use runtime::builder::RuntimeBuilder;
pub use runtime::task;
pub use runtime::yield_now::yield_now;
pub use runtime::{Handle, Runtime};
pub use serializer::{
    ExecutionSerializer, FaultPolicy, Mailbox, SerializerBuilder, SuspensionPoint,
};

pub use strand_macros::{main, test};
