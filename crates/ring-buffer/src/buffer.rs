//! Ring Buffer Implementation

/// Fixed-capacity ring buffer that overwrites its oldest entry once full
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Pre-allocated storage
    storage: Box<[T]>,
    /// Next write position
    head: usize,
    /// Number of valid entries (never exceeds capacity)
    len: usize,
    /// Total values pushed since creation (for statistics)
    total_written: u64,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Create a new ring buffer with given capacity
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        Self {
            storage: vec![T::default(); capacity].into_boxed_slice(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }
}

impl<T: Copy> RingBuffer<T> {
    /// Push a value (overwrites oldest if full)
    pub fn push(&mut self, value: T) {
        self.storage[self.head] = value;
        self.head = (self.head + 1) % self.storage.len();
        if self.len < self.storage.len() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    /// Most recently pushed value
    pub fn latest(&self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let idx = (self.head + self.storage.len() - 1) % self.storage.len();
        Some(self.storage[idx])
    }

    /// Valid contents as two slices, oldest first.
    ///
    /// The first slice runs from the oldest entry to the end of storage, the
    /// second wraps around from the start of storage to the newest entry.
    pub fn as_slices(&self) -> (&[T], &[T]) {
        if self.len < self.storage.len() {
            // Not yet wrapped: everything lives in [0, head)
            (&self.storage[..self.len], &[])
        } else {
            (&self.storage[self.head..], &self.storage[..self.head])
        }
    }

    /// Copy the contents out, oldest to newest
    pub fn to_vec(&self) -> Vec<T> {
        let (first, second) = self.as_slices();
        let mut out = Vec::with_capacity(self.len);
        out.extend_from_slice(first);
        out.extend_from_slice(second);
        out
    }

    /// Number of values currently held
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Get total values pushed (including overwritten ones)
    pub fn total_written(&self) -> u64 {
        self.total_written
    }
}
