//! Fixed-capacity circular byte buffer with overwrite-on-overflow.
//!
//! The buffer is owned by a single execution context (the audio callback).
//! Writes never fail: once full, each new byte evicts the oldest one.

/// Circular byte store holding the most recent `capacity` bytes pushed.
///
/// The logical content is the `len` bytes starting at physical offset
/// `start`, wrapping modulo `capacity`. Bytes outside that window are stale
/// and never observable through [`ByteRingBuffer::at`].
#[derive(Debug, Clone)]
pub struct ByteRingBuffer {
    /// The underlying buffer storage.
    storage: Box<[u8]>,
    /// Physical offset of the first logical byte.
    start: usize,
    /// Number of valid bytes.
    len: usize,
}

impl ByteRingBuffer {
    /// Create a new ring buffer holding at most `capacity` bytes.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");

        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            start: 0,
            len: 0,
        }
    }

    /// Get the buffer capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Physical offset of the logical front.
    pub const fn start(&self) -> usize {
        self.start
    }

    /// Number of valid bytes.
    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Raw backing storage, including stale bytes outside the logical window.
    pub fn storage(&self) -> &[u8] {
        &self.storage
    }

    /// Append `data` at the logical tail.
    ///
    /// When the buffer is full the oldest bytes are overwritten. If `data` is
    /// longer than the capacity only its last `capacity` bytes survive.
    /// Returns how many bytes were lost, counting both evicted buffered bytes
    /// and leading bytes of `data` overwritten within this call.
    pub fn push_back(&mut self, data: &[u8]) -> usize {
        let capacity = self.capacity();
        let mut copied = 0;
        let mut evicted = 0;

        while copied < data.len() {
            let end = (self.start + self.len) % capacity;
            let copy_len = (data.len() - copied).min(capacity - end);

            self.storage[end..end + copy_len].copy_from_slice(&data[copied..copied + copy_len]);
            copied += copy_len;

            // The front only moves once the new bytes no longer fit.
            let overflow = (copy_len + self.len).saturating_sub(capacity);
            self.start = (self.start + overflow) % capacity;
            self.len = (self.len + copy_len).min(capacity);
            evicted += overflow;
        }

        evicted
    }

    /// Drop up to `count` bytes from the logical front.
    ///
    /// Returns the number of bytes actually removed. The storage is left
    /// untouched.
    pub fn remove_front(&mut self, count: usize) -> usize {
        let removed = count.min(self.len);
        self.len -= removed;
        self.start = (self.start + removed) % self.capacity();
        removed
    }

    /// Byte at logical index `index`.
    ///
    /// The caller must keep `index < len()`.
    pub fn at(&self, index: usize) -> u8 {
        debug_assert!(
            index < self.len,
            "index {index} outside logical window of {} bytes",
            self.len
        );
        self.storage[(self.start + index) % self.capacity()]
    }

    /// Iterate the logical window front to back.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.len).map(move |i| self.at(i))
    }
}
