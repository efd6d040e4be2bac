use super::core::ExecutionSerializer;
use super::suspend::SuspensionPoint;
use crate::host::HostContext;
use crate::probable::Probable;
use crate::runtime::Handle;

use std::cell::UnsafeCell;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// An unbounded FIFO queue that needs no lock.
///
/// Every access to the underlying buffer is performed by a continuation of
/// the mailbox's [`ExecutionSerializer`], so accesses never overlap and
/// happen in the order they were issued. Producers and consumers on any
/// thread simply `.await`.
///
/// # Examples
///
/// ```rust,ignore
/// let mailbox = Mailbox::new();
///
/// mailbox.enqueue(1).await;
/// mailbox.enqueue(2).await;
///
/// assert_eq!(mailbox.try_dequeue().await, Probable::Present(1));
/// ```
pub struct Mailbox<T> {
    point: SuspensionPoint,
    items: Arc<Items<T>>,
}

/// The buffer owned by the serializer.
struct Items<T>(UnsafeCell<VecDeque<T>>);

// Safety: the buffer is only touched from continuations of a single
// serializer, which never run concurrently and hand over with
// acquire/release ordering through the pending counter.
unsafe impl<T: Send> Send for Items<T> {}
unsafe impl<T: Send> Sync for Items<T> {}

impl<T> Items<T> {
    /// # Safety
    ///
    /// Must only be called from a continuation of the owning serializer.
    #[allow(clippy::mut_from_ref)]
    unsafe fn get(&self) -> &mut VecDeque<T> {
        unsafe { &mut *self.0.get() }
    }
}

impl<T: Send + 'static> Mailbox<T> {
    /// Creates a mailbox driven by the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a runtime context.
    pub fn new() -> Self {
        Self::with_host(Handle::current())
    }

    /// Creates a mailbox whose serializer posts drain passes to `host`.
    pub fn with_host<H: HostContext + 'static>(host: H) -> Self {
        Self::with_serializer(ExecutionSerializer::new(host))
    }

    /// Creates a mailbox on an existing serializer.
    ///
    /// The serializer may be shared with other state; all of it is then
    /// accessed in one stream.
    pub fn with_serializer(serializer: ExecutionSerializer) -> Self {
        Self {
            point: serializer.suspension_point(),
            items: Arc::new(Items(UnsafeCell::new(VecDeque::new()))),
        }
    }

    /// The serializer guarding this mailbox.
    pub fn serializer(&self) -> &ExecutionSerializer {
        self.point.serializer()
    }

    /// Appends `item` at the tail.
    ///
    /// Completes once the item is in the buffer: an enqueue that returned is
    /// visible to every dequeue issued afterwards.
    pub async fn enqueue(&self, item: T) {
        let items = self.items.clone();

        self.point
            .run(move || {
                // Safety: runs inside the serializer's drain pass.
                unsafe { items.get() }.push_back(item);
            })
            .await
    }

    /// Removes and returns the head item, or [`Probable::Absent`] when the
    /// mailbox is empty at the moment the operation runs.
    pub async fn try_dequeue(&self) -> Probable<T> {
        let items = self.items.clone();

        self.point
            .run(move || {
                // Safety: runs inside the serializer's drain pass.
                unsafe { items.get() }.pop_front().into()
            })
            .await
    }

    /// Number of buffered items when the operation runs.
    pub async fn len(&self) -> usize {
        let items = self.items.clone();

        // Safety: runs inside the serializer's drain pass.
        self.point.run(move || unsafe { items.get() }.len()).await
    }

    /// Returns `true` if nothing is buffered when the operation runs.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<T: Send + 'static> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self {
            point: self.point.clone(),
            items: self.items.clone(),
        }
    }
}

impl<T> fmt::Debug for Mailbox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("serializer", &self.point.serializer().id())
            .finish_non_exhaustive()
    }
}
