use crate::runtime::Handle;

use std::cell::RefCell;

thread_local! {
    /// Handle of the runtime whose worker is running on this thread.
    ///
    /// Installed by [`enter_context`]; read by [`spawn`](crate::task::spawn)
    /// and [`Handle::current`].
    static CURRENT_HANDLE: RefCell<Option<Handle>> = const { RefCell::new(None) };
}

/// Restores the previously installed handle when dropped, including
/// during unwinding.
struct Restore(Option<Handle>);

impl Drop for Restore {
    fn drop(&mut self) {
        let previous = self.0.take();
        CURRENT_HANDLE.with(|current| *current.borrow_mut() = previous);
    }
}

/// Runs `f` with `handle` installed as the current runtime handle.
pub(crate) fn enter_context<R>(handle: Handle, f: impl FnOnce() -> R) -> R {
    let previous = CURRENT_HANDLE.with(|current| current.replace(Some(handle)));
    let _restore = Restore(previous);

    f()
}

/// Returns the handle of the runtime the calling thread belongs to.
pub(crate) fn current_handle() -> Option<Handle> {
    CURRENT_HANDLE.with(|current| current.borrow().clone())
}
