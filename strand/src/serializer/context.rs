use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-unique identity of an [`ExecutionSerializer`](super::ExecutionSerializer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SerializerId(usize);

impl SerializerId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(1);

        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SerializerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "serializer-{}", self.0)
    }
}

thread_local! {
    /// Serializer whose drain pass is running on this thread, if any.
    static CURRENT_SERIALIZER: Cell<Option<SerializerId>> = const { Cell::new(None) };
}

/// Returns the serializer whose drain pass is running on the calling
/// thread, if any.
pub fn current_id() -> Option<SerializerId> {
    CURRENT_SERIALIZER.with(Cell::get)
}

/// Marks the calling thread as draining a serializer until dropped.
///
/// The previous value is put back on drop, so nested passes (a drain pass
/// of one serializer running a continuation that synchronously drives
/// another) unwind correctly, panics included.
pub(crate) struct DrainScope {
    previous: Option<SerializerId>,
}

impl DrainScope {
    pub(crate) fn enter(id: SerializerId) -> Self {
        let previous = CURRENT_SERIALIZER.with(|current| current.replace(Some(id)));

        Self { previous }
    }
}

impl Drop for DrainScope {
    fn drop(&mut self) {
        CURRENT_SERIALIZER.with(|current| current.set(self.previous));
    }
}
