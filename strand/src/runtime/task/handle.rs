use crate::runtime::task::Task;

use std::future::Future;
use std::panic;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// An owned permission to await a spawned task.
///
/// Resolves to the task's output. If the task panicked, awaiting the
/// handle resumes that panic in the awaiting task. Dropping the handle
/// detaches the task; it keeps running.
pub struct JoinHandle<T> {
    pub(crate) task: Arc<Task<T>>,
}

impl<T: Send + 'static> Future for JoinHandle<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if let Some(output) = self.task.take_output() {
            return Poll::Ready(unwrap_output(output));
        }

        // Register before re-checking so a completion in between is not missed.
        self.task.register_joiner(cx.waker());

        match self.task.take_output() {
            Some(output) => Poll::Ready(unwrap_output(output)),
            None => Poll::Pending,
        }
    }
}

fn unwrap_output<T>(output: std::thread::Result<T>) -> T {
    match output {
        Ok(value) => value,
        Err(payload) => panic::resume_unwind(payload),
    }
}
