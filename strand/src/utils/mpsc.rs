use std::cell::UnsafeCell;
use std::hint;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

/// A queue node.
///
/// The node currently pointed to by the consumer side is a stub whose
/// value has already been taken (or never existed).
struct Node<T> {
    next: AtomicPtr<Node<T>>,
    value: Option<T>,
}

impl<T> Node<T> {
    fn alloc(value: Option<T>) -> *mut Node<T> {
        Box::into_raw(Box::new(Node {
            next: AtomicPtr::new(ptr::null_mut()),
            value,
        }))
    }
}

/// An unbounded lock-free multi-producer, single-consumer queue.
///
/// Producers publish a node with one atomic `swap` on `head` and then
/// link it behind the node they displaced. The single consumer walks
/// the `next` chain from `tail`, freeing each stub it steps past.
///
/// Between a producer's `swap` and its link store the chain is briefly
/// broken; [`pop`](Self::pop) reports that window as "nothing yet".
pub(crate) struct MpscQueue<T> {
    /// Most recently pushed node. Shared by all producers.
    head: AtomicPtr<Node<T>>,

    /// Current stub node. Only touched by the consumer.
    tail: UnsafeCell<*mut Node<T>>,
}

// Safety: values move between threads through the queue, and the consumer
// side is only accessed through the `unsafe` pop methods whose contract
// forbids concurrent consumers.
unsafe impl<T: Send> Send for MpscQueue<T> {}
unsafe impl<T: Send> Sync for MpscQueue<T> {}

impl<T> MpscQueue<T> {
    /// Creates an empty queue holding only its stub node.
    pub(crate) fn new() -> Self {
        let stub = Node::alloc(None);

        Self {
            head: AtomicPtr::new(stub),
            tail: UnsafeCell::new(stub),
        }
    }

    /// Appends a value. Safe to call from any number of threads.
    pub(crate) fn push(&self, value: T) {
        let node = Node::alloc(Some(value));
        let prev = self.head.swap(node, Ordering::AcqRel);

        // Safety: `prev` cannot be freed before its `next` is set, because
        // the consumer only releases a node after stepping past it.
        unsafe { (*prev).next.store(node, Ordering::Release) };
    }

    /// Removes the oldest linked value, if any.
    ///
    /// Returns `None` both when the queue is empty and when a producer is
    /// between its `swap` and its link store.
    ///
    /// # Safety
    ///
    /// At most one thread may be consuming at any time.
    pub(crate) unsafe fn pop(&self) -> Option<T> {
        unsafe {
            let tail = *self.tail.get();
            let next = (*tail).next.load(Ordering::Acquire);

            if next.is_null() {
                return None;
            }

            *self.tail.get() = next;
            let value = (*next).value.take();
            drop(Box::from_raw(tail));

            value
        }
    }

    /// Removes the oldest value, spinning across a half-finished push.
    ///
    /// The caller must know that at least one push has fully completed and
    /// has not been consumed yet; otherwise this spins forever.
    ///
    /// # Safety
    ///
    /// Same as [`pop`](Self::pop).
    pub(crate) unsafe fn pop_published(&self) -> T {
        loop {
            if let Some(value) = unsafe { self.pop() } {
                return value;
            }

            hint::spin_loop();
        }
    }
}

impl<T> Drop for MpscQueue<T> {
    fn drop(&mut self) {
        let mut node = *self.tail.get_mut();

        while !node.is_null() {
            // Safety: `&mut self` rules out producers and consumers; every
            // node in the chain was allocated by `Node::alloc`.
            let boxed = unsafe { Box::from_raw(node) };
            node = boxed.next.load(Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MpscQueue;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn pops_in_push_order() {
        let queue = MpscQueue::new();

        queue.push(1);
        queue.push(2);
        queue.push(3);

        unsafe {
            assert_eq!(queue.pop(), Some(1));
            assert_eq!(queue.pop(), Some(2));
            assert_eq!(queue.pop_published(), 3);
            assert_eq!(queue.pop(), None);
        }
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let queue = Arc::new(MpscQueue::new());

        let producers: Vec<_> = (0..8)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..1_000 {
                        queue.push(p * 1_000 + i);
                    }
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }

        let mut seen = HashSet::new();
        while let Some(value) = unsafe { queue.pop() } {
            assert!(seen.insert(value), "value {value} popped twice");
        }

        assert_eq!(seen.len(), 8_000);
    }

    #[test]
    fn per_producer_order_is_preserved() {
        let queue = Arc::new(MpscQueue::new());

        let producers: Vec<_> = (0..4usize)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..500usize {
                        queue.push((p, i));
                    }
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }

        let mut last = [None::<usize>; 4];
        while let Some((p, i)) = unsafe { queue.pop() } {
            if let Some(prev) = last[p] {
                assert!(i > prev, "producer {p} reordered: {prev} then {i}");
            }
            last[p] = Some(i);
        }
    }

    #[test]
    fn drop_releases_unconsumed_values() {
        let marker = Arc::new(());
        let queue = MpscQueue::new();

        queue.push(marker.clone());
        queue.push(marker.clone());
        assert_eq!(Arc::strong_count(&marker), 3);

        drop(queue);
        assert_eq!(Arc::strong_count(&marker), 1);
    }
}
