//! Triple Buffer Implementation
//!
//! Three slots, three owners: the producer's back slot, the consumer's front
//! slot, and the middle slot parked in `middle`. The producer and consumer
//! indices live in their own halves and are never shared; only `middle` is
//! touched by both threads, always through a single atomic `swap`.
//!
//! `middle` packs the parked slot index (bits 0..2) with a fresh flag
//! (bit 2) that is set by `publish` and cleared by `acquire`.

use std::cell::UnsafeCell;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const INDEX_MASK: usize = 0b011;
const FRESH: usize = 0b100;

/// One slot on its own cache line so the two sides never false-share
#[repr(align(128))]
struct Slot<T>(UnsafeCell<T>);

/// Shared state of a triple buffer
///
/// Only reachable through its [`Producer`] and [`Consumer`] halves, which are
/// created together by [`SwapBuffer::split`].
pub struct SwapBuffer<T> {
    slots: [Slot<T>; 3],
    /// Index of the in-flight slot, plus the fresh flag
    middle: AtomicUsize,
}

// SAFETY: the slots are only ever dereferenced through a `Producer` or a
// `Consumer`, each of which holds an index no other party holds. Ownership of
// a slot only moves through the atomic `middle` swap, which orders the
// previous owner's accesses before the next owner's.
unsafe impl<T: Send> Sync for SwapBuffer<T> {}

impl<T> SwapBuffer<T> {
    /// Create a triple buffer from three initial values and split it into
    /// its two halves.
    ///
    /// The producer starts on `slots[0]`, the middle holds `slots[1]` (not
    /// fresh), and the consumer starts on `slots[2]`.
    pub fn split(slots: [T; 3]) -> (Producer<T>, Consumer<T>) {
        let [back, middle, front] = slots;
        let shared = Arc::new(SwapBuffer {
            slots: [
                Slot(UnsafeCell::new(back)),
                Slot(UnsafeCell::new(middle)),
                Slot(UnsafeCell::new(front)),
            ],
            middle: AtomicUsize::new(1),
        });

        let producer = Producer {
            shared: Arc::clone(&shared),
            back: 0,
        };
        let consumer = Consumer { shared, front: 2 };
        (producer, consumer)
    }

    /// Create a triple buffer of default values
    pub fn with_default() -> (Producer<T>, Consumer<T>)
    where
        T: Default,
    {
        Self::split([T::default(), T::default(), T::default()])
    }

    fn slot_ptr(&self, idx: usize) -> *mut T {
        self.slots[idx].0.get()
    }
}

/// Producer half: writes into its back slot, then publishes it
pub struct Producer<T> {
    shared: Arc<SwapBuffer<T>>,
    back: usize,
}

impl<T> Producer<T> {
    /// Slot currently owned by the producer.
    ///
    /// Valid until the next [`publish`](Self::publish). Its contents are
    /// whatever the slot last held: either a value the consumer has finished
    /// with, or an older publication that was never acquired.
    pub fn producer_slot(&mut self) -> &mut T {
        // SAFETY: `back` is held by this half only; `&mut self` prevents
        // aliasing through this half.
        unsafe { &mut *self.shared.slot_ptr(self.back) }
    }

    /// Hand the back slot to the consumer and take the middle slot in its
    /// place.
    ///
    /// Ordering: `AcqRel`. The release half makes every write to the
    /// published slot visible to whichever `acquire` next takes it; the
    /// acquire half orders the consumer's last use of the returned slot
    /// before our next writes to it.
    pub fn publish(&mut self) {
        let previous = self
            .shared
            .middle
            .swap(self.back | FRESH, Ordering::AcqRel);
        self.back = previous & INDEX_MASK;
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer").field("back", &self.back).finish()
    }
}

/// Consumer half: acquires the latest publication into its front slot
pub struct Consumer<T> {
    shared: Arc<SwapBuffer<T>>,
    front: usize,
}

impl<T> Consumer<T> {
    /// Slot currently owned by the consumer
    pub fn consumer_slot(&mut self) -> &mut T {
        // SAFETY: `front` is held by this half only; `&mut self` prevents
        // aliasing through this half.
        unsafe { &mut *self.shared.slot_ptr(self.front) }
    }

    /// Whether a publication is waiting to be acquired
    pub fn has_update(&self) -> bool {
        self.shared.middle.load(Ordering::Relaxed) & FRESH != 0
    }

    /// Take the most recent publication, if there is one we have not seen.
    ///
    /// Returns `false` and keeps the current slot when nothing new was
    /// published, so the consumer never steps back to an older value.
    ///
    /// Ordering: the flag check is `Relaxed` (a stale read only delays the
    /// pickup to the next call); the exchange is `AcqRel`. The acquire half
    /// pairs with the producer's release in [`Producer::publish`], so every
    /// write made before that publish is visible in the acquired slot. The
    /// release half hands our finished slot back in order.
    pub fn acquire(&mut self) -> bool {
        if !self.has_update() {
            return false;
        }
        // Only the producer sets FRESH, so it cannot be cleared between the
        // check above and this swap.
        let previous = self.shared.middle.swap(self.front, Ordering::AcqRel);
        self.front = previous & INDEX_MASK;
        true
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("front", &self.front)
            .field("has_update", &self.has_update())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_initial_slots_are_distinct() {
        let (mut producer, mut consumer) = SwapBuffer::split([1, 2, 3]);
        assert_eq!(*producer.producer_slot(), 1);
        assert_eq!(*consumer.consumer_slot(), 3);
        assert!(!consumer.has_update());
    }

    #[test]
    fn test_publish_then_acquire() {
        let (mut producer, mut consumer) = SwapBuffer::<u32>::with_default();

        *producer.producer_slot() = 42;
        producer.publish();
        assert!(consumer.has_update());

        assert!(consumer.acquire());
        assert_eq!(*consumer.consumer_slot(), 42);
        assert!(!consumer.has_update());
    }

    #[test]
    fn test_acquire_without_publish_keeps_slot() {
        let (mut producer, mut consumer) = SwapBuffer::split([0u32, 0, 0]);

        *producer.producer_slot() = 7;
        producer.publish();
        assert!(consumer.acquire());

        // Nothing new: the consumer must not be handed the stale middle slot
        assert!(!consumer.acquire());
        assert_eq!(*consumer.consumer_slot(), 7);
    }

    #[test]
    fn test_latest_publication_wins() {
        let (mut producer, mut consumer) = SwapBuffer::<u32>::with_default();

        for value in 1..=5 {
            *producer.producer_slot() = value;
            producer.publish();
        }

        assert!(consumer.acquire());
        assert_eq!(*consumer.consumer_slot(), 5);
    }

    #[test]
    fn test_producer_never_gets_consumer_slot() {
        let (mut producer, mut consumer) = SwapBuffer::<u32>::with_default();

        for round in 0..50u32 {
            *producer.producer_slot() = round;
            producer.publish();
            if round % 3 == 0 {
                assert!(consumer.acquire());
                *consumer.consumer_slot() = u32::MAX;
            }
            // Whatever the producer now holds is not the consumer's slot
            *producer.producer_slot() = 0;
            if round % 3 == 0 {
                assert_eq!(*consumer.consumer_slot(), u32::MAX);
            }
        }
    }

    #[test]
    fn test_stress_no_torn_or_older_reads() {
        const ROUNDS: u64 = 200_000;
        const WIDTH: usize = 64;

        let (mut producer, mut consumer) = SwapBuffer::split([[0u64; WIDTH]; 3]);

        let writer = thread::spawn(move || {
            for value in 1..=ROUNDS {
                producer.producer_slot().fill(value);
                producer.publish();
            }
        });

        let mut last_seen = 0u64;
        while last_seen < ROUNDS {
            if consumer.acquire() {
                let slot = consumer.consumer_slot();
                let value = slot[0];
                assert!(
                    slot.iter().all(|&v| v == value),
                    "torn read: slot mixes values"
                );
                assert!(value > last_seen, "went backwards: {} after {}", value, last_seen);
                last_seen = value;
            } else {
                assert!(consumer.consumer_slot().iter().all(|&v| v == last_seen));
                std::hint::spin_loop();
            }
        }

        writer.join().expect("producer thread panicked");
        assert_eq!(last_seen, ROUNDS);
    }
}
