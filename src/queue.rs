use heapless::{Deque, Vec};

/// Returned when pushing into a full [`ByteQueue`]. Carries the rejected byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("Tried to push ({0:?}) into a full queue")]
pub struct QueueFull(pub u8);

/// A fixed capacity FIFO of bytes.
///
/// One instance per direction, with a single producer and a single consumer.
/// Pushing into a full queue is rejected rather than overwriting old data.
#[derive(Debug, Clone, Default)]
pub struct ByteQueue<const N: usize> {
    bytes: Deque<u8, N>,
}

impl<const N: usize> ByteQueue<N> {
    pub const fn new() -> Self {
        Self {
            bytes: Deque::new(),
        }
    }

    /// Empties the queue.
    pub fn init(&mut self) {
        self.bytes.clear();
    }

    /// Appends a byte, leaving the queue untouched if it is full.
    pub fn push(&mut self, byte: u8) -> Result<(), QueueFull> {
        self.bytes.push_back(byte).map_err(QueueFull)
    }

    /// Removes the oldest byte, or returns `None` if the queue is empty.
    pub fn pop(&mut self) -> Option<u8> {
        self.bytes.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.bytes.is_full()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Copies the queued bytes, oldest first, without consuming them.
    pub fn snapshot(&self) -> Vec<u8, N> {
        self.bytes.iter().copied().collect()
    }
}

/// Hands the queued bytes to `callback`.
///
/// The callback returns `true` once it has consumed the data, which empties
/// the queue. Otherwise the bytes stay queued for the next call, unless the
/// queue is already full: no further bytes could arrive to complete the
/// message, so it is discarded.
pub fn process_queue<const N: usize>(
    queue: &mut ByteQueue<N>,
    mut callback: impl FnMut(&[u8]) -> bool,
) -> bool {
    let snapshot = queue.snapshot();

    if callback(&snapshot) {
        queue.init();
        return true;
    }

    if queue.is_full() {
        warn!("Incoming write is too long, dropping {} bytes", queue.len());
        queue.init();
    } else {
        debug!("Keeping {} unprocessed bytes", queue.len());
    }

    false
}
