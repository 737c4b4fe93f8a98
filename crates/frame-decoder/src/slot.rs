//! Compressed image slots exchanged through the triple buffer

/// Pre-allocated buffer holding one compressed frame.
///
/// `len == 0` means the slot holds nothing new: either it was never written
/// or its contents were already decoded.
#[derive(Debug, Clone)]
pub struct CompressedImageSlot {
    data: Box<[u8]>,
    len: usize,
    frame_index: i32,
}

impl CompressedImageSlot {
    /// Create an empty slot with fixed capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
            frame_index: 0,
        }
    }

    /// Whole backing storage, for the transport to write into
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Record a completed write of `len` bytes (clamped to capacity)
    pub fn mark_filled(&mut self, len: usize, frame_index: i32) {
        self.len = len.min(self.data.len());
        self.frame_index = frame_index;
    }

    /// Mark the contents as consumed
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Compressed bytes of the frame held
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Sender's frame index for the bytes held
    pub fn frame_index(&self) -> i32 {
        self.frame_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_and_clear() {
        let mut slot = CompressedImageSlot::new(8);
        assert!(slot.is_empty());

        slot.buffer_mut()[..3].copy_from_slice(&[1, 2, 3]);
        slot.mark_filled(3, 17);
        assert_eq!(slot.bytes(), &[1, 2, 3]);
        assert_eq!(slot.frame_index(), 17);

        slot.clear();
        assert!(slot.is_empty());
        assert_eq!(slot.capacity(), 8);
    }

    #[test]
    fn test_fill_clamped_to_capacity() {
        let mut slot = CompressedImageSlot::new(4);
        slot.mark_filled(100, 0);
        assert_eq!(slot.len(), 4);
    }
}
