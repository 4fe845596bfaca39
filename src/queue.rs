//! Accumulation and flush policy.
//!
//! The queue buffers `(message, callback)` pairs and decides when a flush is
//! due: either the count threshold is reached (bounds latency under low
//! arrival rate) or the serialized size threshold is exceeded (bounds batch
//! size under bursts of large payloads, protecting the transport's hard
//! limit). A flush always drains the entire buffer, never a prefix.

use crate::delivery::Completion;
use crate::message::Message;

pub struct Queue {
    pending: Vec<(Message, Option<Completion>)>,
    bytes: usize,
    flush_at: usize,
    max_batch_bytes: usize,
}

impl Queue {
    pub fn new(flush_at: usize, max_batch_bytes: usize) -> Self {
        Self {
            pending: Vec::new(),
            bytes: 0,
            flush_at: flush_at.max(1),
            max_batch_bytes,
        }
    }

    /// Append a pair in arrival order. Call [`Queue::is_due`] afterwards to
    /// see whether a flush condition is met.
    pub fn enqueue(&mut self, message: Message, callback: Option<Completion>) {
        self.bytes += message.encoded_size();
        self.pending.push((message, callback));
    }

    /// Flush predicate: due when the count threshold is reached or the
    /// serialized size of pending messages exceeds the byte threshold.
    pub fn is_due(&self) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        self.pending.len() >= self.flush_at || self.bytes > self.max_batch_bytes
    }

    /// Snapshot the full pending sequence into a batch and clear the buffer
    /// in the same step. The batch is consumed by exactly one delivery
    /// lifecycle and never re-enters the queue.
    pub fn take_batch(&mut self) -> Batch {
        self.bytes = 0;
        Batch {
            pairs: std::mem::take(&mut self.pending),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// An ordered snapshot of buffered pairs, submitted as one delivery unit.
pub struct Batch {
    pairs: Vec<(Message, Option<Completion>)>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Split into the ordered message sequence and the matching callbacks.
    pub(crate) fn into_parts(self) -> (Vec<Message>, Vec<Option<Completion>>) {
        self.pairs.into_iter().unzip()
    }
}
