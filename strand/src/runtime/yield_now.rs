use std::future::poll_fn;
use std::task::Poll;

/// Yields once to the runtime, letting other tasks run first.
///
/// The current task is woken immediately and queued behind whatever is
/// already waiting.
pub async fn yield_now() {
    let mut yielded = false;

    poll_fn(|cx| {
        if yielded {
            return Poll::Ready(());
        }

        yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    })
    .await
}
