//! SPSC ring buffer shared between main and interrupt context.
//!
//! One context produces, the other consumes. The producer writes only
//! `head`, the consumer writes only `tail`; reads of the foreign index
//! go through the atomics with acquire/release ordering. That
//! partition is the whole correctness argument — there is no lock.
//!
//! Capacity must be a power of two so indices wrap with a bit mask.
//! One slot is sacrificed to tell full from empty, so at most `N - 1`
//! elements are ever live.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-capacity single-producer single-consumer ring buffer.
///
/// # Type Parameters
/// * `T` - Element type (`Copy`, elements are moved by value)
/// * `N` - Capacity, must be a power of two
///
/// # Invariants
/// - Empty iff `head == tail`
/// - Full iff `(head + 1) & (N - 1) == tail`
/// - `head` is advanced only through [`Producer`], `tail` only through
///   [`Consumer`]; at most one context may drive each side.
pub struct SpscRing<T: Copy, const N: usize> {
    buffer: UnsafeCell<[T; N]>,
    /// Next write position (producer-owned).
    head: AtomicUsize,
    /// Next read position (consumer-owned).
    tail: AtomicUsize,
}

// The single-writer-per-index protocol makes cross-context sharing
// sound; the UnsafeCell is only ever written at `head` by the producer
// and read at `tail` by the consumer, and the atomics order those
// accesses.
unsafe impl<T: Copy + Send, const N: usize> Sync for SpscRing<T, N> {}

impl<T: Copy, const N: usize> SpscRing<T, N> {
    const MASK: usize = N - 1;

    /// Create an empty ring with every slot initialized to `fill`.
    ///
    /// # Panics
    /// Panics if `N` is not a power of two (compile-time when
    /// const-evaluated).
    pub const fn new(fill: T) -> Self {
        assert!(N.is_power_of_two(), "ring capacity must be a power of two");

        Self {
            buffer: UnsafeCell::new([fill; N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Number of live elements, `(head - tail) mod N`.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail) & Self::MASK
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    pub fn is_full(&self) -> bool {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head + 1) & Self::MASK == tail
    }

    /// Producer-side handle. Only this handle advances `head`.
    pub fn producer(&self) -> Producer<'_, T, N> {
        Producer { ring: self }
    }

    /// Consumer-side handle. Only this handle advances `tail`.
    pub fn consumer(&self) -> Consumer<'_, T, N> {
        Consumer { ring: self }
    }

    /// Zero both indices, discarding all content.
    ///
    /// Writes both sides' indices, so it is only safe to call while no
    /// interrupt handler is running against this ring — in practice,
    /// during channel initialization before interrupts are enabled.
    pub fn reset(&self) {
        self.head.store(0, Ordering::Release);
        self.tail.store(0, Ordering::Release);
    }
}

/// Producer handle: push elements, advance `head`.
pub struct Producer<'a, T: Copy, const N: usize> {
    ring: &'a SpscRing<T, N>,
}

impl<'a, T: Copy, const N: usize> Producer<'a, T, N> {
    /// Push an element.
    ///
    /// Returns the element back if the ring is full; `head` is not
    /// advanced in that case.
    pub fn push(&self, item: T) -> Result<(), T> {
        let head = self.ring.head.load(Ordering::Acquire);
        let tail = self.ring.tail.load(Ordering::Acquire);

        if (head + 1) & SpscRing::<T, N>::MASK == tail {
            return Err(item);
        }

        // Sole writer of this slot until head is published below.
        unsafe {
            (*self.ring.buffer.get())[head] = item;
        }
        self.ring
            .head
            .store((head + 1) & SpscRing::<T, N>::MASK, Ordering::Release);
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }
}

/// Consumer handle: pop elements, advance `tail`.
pub struct Consumer<'a, T: Copy, const N: usize> {
    ring: &'a SpscRing<T, N>,
}

impl<'a, T: Copy, const N: usize> Consumer<'a, T, N> {
    /// Pop the oldest element, or `None` if the ring is empty.
    pub fn pop(&self) -> Option<T> {
        let tail = self.ring.tail.load(Ordering::Acquire);
        let head = self.ring.head.load(Ordering::Acquire);

        if head == tail {
            return None;
        }

        let item = unsafe { (*self.ring.buffer.get())[tail] };
        self.ring
            .tail
            .store((tail + 1) & SpscRing::<T, N>::MASK, Ordering::Release);
        Some(item)
    }

    /// Discard everything currently buffered without reading it.
    ///
    /// Sets `tail = head`; a consumer-owned write, so this is safe to
    /// call concurrently with the producer.
    pub fn flush(&self) {
        let head = self.ring.head.load(Ordering::Acquire);
        self.ring.tail.store(head, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}
