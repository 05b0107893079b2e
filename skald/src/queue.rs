//! A single-producer single-consumer bip buffer of bytes.
//!
//! A bip buffer is a ring buffer with a twist: reservations are always
//! contiguous. If a reservation does not fit between the write cursor and the
//! end of the storage but does fit at the front, the remnant at the end is
//! abandoned (the `last` watermark records where the lap ends) and the
//! reservation starts over at offset zero. Readers therefore see at most two
//! contiguous segments per drain.
//!
//! The producer owns the `write` and `last` cursors, the consumer owns
//! `read`; each observes the other side with acquire loads and publishes with
//! release stores. Nothing blocks: a reservation that does not fit fails.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Cursors written by the producer. Cache-line aligned so producer stores do
/// not contend with the consumer's line.
#[repr(align(64))]
struct ProducerCursors {
    write: AtomicUsize,
    /// End of the current lap; bytes in `[last, capacity)` are padding.
    last: AtomicUsize,
}

/// Cursor written by the consumer, on its own cache line.
#[repr(align(64))]
struct ConsumerCursors {
    read: AtomicUsize,
}

struct Shared {
    producer: ProducerCursors,
    consumer: ConsumerCursors,
    storage: Box<[UnsafeCell<u8>]>,
}

// SAFETY: the storage is only written through a reservation held by the
// single QueueWriter, and only read by the single QueueReader after the
// release store of `write` publishes those bytes. The cursor protocol keeps
// the two regions disjoint.
unsafe impl Send for Shared {}
unsafe impl Sync for Shared {}

impl Shared {
    fn capacity(&self) -> usize {
        self.storage.len()
    }
}

/// Create a queue of `capacity` bytes, returning the two capability handles.
pub fn byte_queue(capacity: usize) -> (QueueWriter, QueueReader) {
    assert!(capacity > 0, "queue capacity must be nonzero");
    let storage = (0..capacity)
        .map(|_| UnsafeCell::new(0))
        .collect::<Vec<_>>()
        .into_boxed_slice();
    let shared = Arc::new(Shared {
        producer: ProducerCursors {
            write: AtomicUsize::new(0),
            last: AtomicUsize::new(capacity),
        },
        consumer: ConsumerCursors {
            read: AtomicUsize::new(0),
        },
        storage,
    });
    (
        QueueWriter {
            shared: shared.clone(),
            write: 0,
            last: capacity,
            cached_read: 0,
            reserved: None,
        },
        QueueReader {
            shared,
            read: 0,
            observed_write: 0,
        },
    )
}

struct Reservation {
    start: usize,
    len: usize,
    wraparound: bool,
}

/// The producer half. Never blocks; a reservation that does not fit fails.
pub struct QueueWriter {
    shared: Arc<Shared>,
    write: usize,
    last: usize,
    /// Stale view of the consumer cursor, refreshed only when the cached view
    /// has no room. Keeps the hot path off the consumer's cache line.
    cached_read: usize,
    reserved: Option<Reservation>,
}

impl QueueWriter {
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Reserve `n` contiguous bytes, or fail if free space does not allow.
    /// An uncommitted earlier reservation is abandoned.
    pub fn reserve(&mut self, n: usize) -> Option<&mut [u8]> {
        let r = match self.find_range(n) {
            Some(r) => r,
            None => {
                self.cached_read = self.shared.consumer.read.load(Ordering::Acquire);
                self.find_range(n)?
            }
        };
        // SAFETY: [start, start+len) is not published to the consumer until
        // commit, and no other reservation aliases it.
        let slice = unsafe {
            std::slice::from_raw_parts_mut(
                self.shared.storage.as_ptr().add(r.start) as *mut u8,
                r.len,
            )
        };
        self.reserved = Some(r);
        Some(slice)
    }

    fn find_range(&self, n: usize) -> Option<Reservation> {
        let read = self.cached_read;
        if self.write >= read {
            if self.shared.capacity() - self.write >= n {
                Some(Reservation {
                    start: self.write,
                    len: n,
                    wraparound: false,
                })
            } else if read.saturating_sub(1) >= n {
                // Abandon the remnant at the end, start over at the front.
                Some(Reservation {
                    start: 0,
                    len: n,
                    wraparound: true,
                })
            } else {
                None
            }
        } else if (read - self.write).saturating_sub(1) >= n {
            // The write cursor must never catch the read cursor: equality
            // means empty, so one byte always stays free.
            Some(Reservation {
                start: self.write,
                len: n,
                wraparound: false,
            })
        } else {
            None
        }
    }

    /// Publish the bytes written since the last `reserve` in one release step.
    pub fn commit(&mut self) {
        let r = match self.reserved.take() {
            Some(r) => r,
            None => return,
        };
        if r.wraparound {
            // The watermark store is ordered before the release of `write`.
            self.last = self.write;
            self.shared.producer.last.store(self.last, Ordering::Relaxed);
            self.write = 0;
        }
        self.write += r.len;
        if self.write > self.last {
            self.last = self.write;
            self.shared.producer.last.store(self.last, Ordering::Relaxed);
        }
        self.shared.producer.write.store(self.write, Ordering::Release);
    }
}

/// The consumer half.
pub struct QueueReader {
    shared: Arc<Shared>,
    read: usize,
    observed_write: usize,
}

impl QueueReader {
    /// Observe everything published so far. Returns the segment up to the lap
    /// watermark and the wrapped segment at the front; either may be empty.
    /// Data is not removed until [`end_read`](QueueReader::end_read).
    pub fn begin_read(&mut self) -> (&[u8], &[u8]) {
        let write = self.shared.producer.write.load(Ordering::Acquire);
        self.observed_write = write;
        if write >= self.read {
            (self.segment(self.read, write), &[])
        } else {
            // The acquire load of `write` ordered this `last` store too.
            let last = self.shared.producer.last.load(Ordering::Relaxed);
            if self.read == last {
                self.read = 0;
                (self.segment(0, write), &[])
            } else {
                (self.segment(self.read, last), self.segment(0, write))
            }
        }
    }

    /// Advance past everything returned by the previous `begin_read`, freeing
    /// the space for the producer.
    pub fn end_read(&mut self) {
        self.read = self.observed_write;
        self.shared.consumer.read.store(self.read, Ordering::Release);
    }

    fn segment(&self, start: usize, end: usize) -> &[u8] {
        debug_assert!(start <= end && end <= self.shared.capacity());
        // SAFETY: [start, end) was published by a release store of `write`
        // observed by the acquire load in begin_read, and the producer will
        // not reuse it until `read` moves past it.
        unsafe {
            std::slice::from_raw_parts(
                self.shared.storage.as_ptr().add(start) as *const u8,
                end - start,
            )
        }
    }
}
