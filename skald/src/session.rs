//! A concurrently writable and readable log stream.
//!
//! A [`Session`] owns data channels, assigns ids to event sources, and moves
//! queued bytes plus pending metadata to an output sink on [`consume`]
//! (Session::consume). Event sources are added directly under the session
//! mutex; events are added in parallel through per-producer channels, which
//! wrap a single-producer lock-free queue.
//!
//! The session guarantees that readers of the produced stream observe every
//! event source before any event referencing it, and that the sink only ever
//! receives whole entries.

use crate::clock::system_clock_sync;
use crate::entries::{write_size_prefixed_tagged, EventSource, SpecialEntry, WriterProp};
use crate::queue::{byte_queue, QueueReader, QueueWriter};
use crate::severity::Severity;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;

/// One producer's byte queue plus its descriptive metadata.
///
/// Channels are owned by the session (dropped by the next `consume` after
/// they are closed and empty); producers hold an `Arc` and must stop writing
/// once they close.
pub struct Channel {
    reader: Mutex<QueueReader>,
    closed: AtomicBool,
    writer_prop: Mutex<WriterProp>,
}

impl Channel {
    /// Mark this channel as no longer written. The next drain that finds it
    /// empty removes it from the session.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn writer_prop(&self) -> WriterProp {
        self.writer_prop.lock().clone()
    }
}

/// Describes the work done by one consume call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeResult {
    /// Bytes written to the sink by this call.
    pub bytes_consumed: usize,
    /// Bytes written to sinks over the lifetime of the session.
    pub total_bytes_consumed: usize,
    pub channels_polled: usize,
    /// Channels removed because they were closed and empty.
    pub channels_removed: usize,
}

struct SessionState {
    channels: Vec<Arc<Channel>>,
    sources: Vec<EventSource>,
    num_consumed_sources: usize,
    next_source_id: u64,
    total_consumed_bytes: usize,
    scratch: Vec<u8>,
}

pub struct Session {
    state: Mutex<SessionState>,
    min_severity: AtomicU16,
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            state: Mutex::new(SessionState {
                channels: Vec::new(),
                sources: Vec::new(),
                num_consumed_sources: 0,
                next_source_id: 1,
                total_consumed_bytes: 0,
                scratch: Vec::new(),
            }),
            min_severity: AtomicU16::new(Severity::Trace as u16),
        }
    }

    /// Create a channel with a queue of `capacity` bytes.
    ///
    /// The session retains ownership of the channel; the returned
    /// [`QueueWriter`] is the only producer handle for it.
    pub fn create_channel(
        &self,
        capacity: usize,
        writer_prop: WriterProp,
    ) -> (Arc<Channel>, QueueWriter) {
        let (queue_writer, queue_reader) = byte_queue(capacity);
        let channel = Arc::new(Channel {
            reader: Mutex::new(queue_reader),
            closed: AtomicBool::new(false),
            writer_prop: Mutex::new(writer_prop),
        });
        self.state.lock().channels.push(channel.clone());
        (channel, queue_writer)
    }

    /// Set the writer id of `channel`, serialized against drains.
    pub fn set_channel_writer_id(&self, channel: &Channel, id: u64) {
        let _state = self.state.lock();
        channel.writer_prop.lock().id = id;
    }

    /// Set the writer name of `channel`, serialized against drains.
    pub fn set_channel_writer_name(&self, channel: &Channel, name: String) {
        let _state = self.state.lock();
        channel.writer_prop.lock().name = name;
    }

    /// Register `source`, assigning it the next id. Events created after this
    /// call returns are guaranteed to be consumed after the source itself:
    /// the mutex blocks `consume` for the whole registration, so no event
    /// referencing the new id can be drained first.
    pub fn add_event_source(&self, mut source: EventSource) -> u64 {
        let mut state = self.state.lock();
        source.id = state.next_source_id;
        state.next_source_id += 1;
        let id = source.id;
        state.sources.push(source);
        id
    }

    /// Severity below which producers should not add events. Advisory only:
    /// producers are encouraged to check it before building an event, not
    /// required to, and a stale observation is acceptable.
    pub fn min_severity(&self) -> Severity {
        let raw = self.min_severity.load(Ordering::Acquire);
        Severity::try_from(raw).expect("min_severity only ever stores Severity values")
    }

    pub fn set_min_severity(&self, severity: Severity) {
        self.min_severity.store(severity as u16, Ordering::Release);
    }

    /// Move metadata and queued data to `out`.
    ///
    /// The first consume of a session starts with a clock sync. Pending event
    /// sources are emitted next, then each channel is polled in creation
    /// order; a non-empty batch is preceded by the channel's writer-prop
    /// entry carrying the batch size. Closed channels found empty are
    /// removed. Events from one channel stay in commit order; batches from
    /// different channels may interleave arbitrarily across calls.
    ///
    /// Sink errors propagate unchanged. A batch whose sink write fails is not
    /// marked consumed, so the next call reads it again.
    pub fn consume<W: Write>(&self, out: &mut W) -> io::Result<ConsumeResult> {
        let mut state = self.state.lock();
        let state = &mut *state;
        let mut result = ConsumeResult::default();

        if state.total_consumed_bytes == 0 {
            result.bytes_consumed +=
                consume_special(&mut state.scratch, &system_clock_sync(), out)?;
        }

        // Sources go out before any channel data. The mutex makes this
        // sufficient: an event referencing source id N can only have been
        // committed after add_event_source(N) returned, and every drain
        // flushes all registered sources before touching the queues.
        while state.num_consumed_sources < state.sources.len() {
            result.bytes_consumed += consume_special(
                &mut state.scratch,
                &state.sources[state.num_consumed_sources],
                out,
            )?;
            state.num_consumed_sources += 1;
        }

        let mut index = 0;
        while index < state.channels.len() {
            let channel = state.channels[index].clone();

            // closed must be sampled before the queue is read. Sampling it
            // after would lose data: the consumer could find the queue empty,
            // the producer commit and close, and the consumer then observe
            // closed and remove the channel with bytes still inside.
            let is_closed = channel.closed.load(Ordering::Acquire);

            let mut reader = channel.reader.lock();
            let (first, second) = reader.begin_read();
            let batch = first.len() + second.len();
            if batch > 0 {
                {
                    let mut prop = channel.writer_prop.lock();
                    prop.batch_size = batch as u64;
                    result.bytes_consumed += consume_special(&mut state.scratch, &*prop, out)?;
                }
                out.write_all(first)?;
                if !second.is_empty() {
                    out.write_all(second)?;
                }
                reader.end_read();
                result.bytes_consumed += batch;
            }
            drop(reader);

            if is_closed {
                // The queue is guaranteed empty here: closed was sampled
                // before the read, and the producer wrote nothing since.
                state.channels.remove(index);
                result.channels_removed += 1;
            } else {
                index += 1;
            }
            result.channels_polled += 1;
        }

        state.total_consumed_bytes += result.bytes_consumed;
        result.total_bytes_consumed = state.total_consumed_bytes;
        Ok(result)
    }

    /// Move already consumed metadata to `out` again: a fresh clock sync
    /// followed by every source the session has consumed so far. Sources
    /// registered but not yet consumed are left for the next `consume`.
    ///
    /// Useful when the sink changes at runtime (log rotation): re-emitting
    /// the metadata prefix makes the new destination self-contained.
    pub fn reconsume_metadata<W: Write>(&self, out: &mut W) -> io::Result<ConsumeResult> {
        let mut state = self.state.lock();
        let state = &mut *state;
        let mut result = ConsumeResult::default();

        result.bytes_consumed += consume_special(&mut state.scratch, &system_clock_sync(), out)?;
        for index in 0..state.num_consumed_sources {
            result.bytes_consumed +=
                consume_special(&mut state.scratch, &state.sources[index], out)?;
        }

        state.total_consumed_bytes += result.bytes_consumed;
        result.total_bytes_consumed = state.total_consumed_bytes;
        Ok(result)
    }
}

/// Serialize one special entry into `scratch`, then hand it to the sink in a
/// single write. Sinks that parse the stream never see partial entries, and
/// unbuffered sinks get one call per entry.
fn consume_special<E: SpecialEntry, W: Write>(
    scratch: &mut Vec<u8>,
    entry: &E,
    out: &mut W,
) -> io::Result<usize> {
    scratch.clear();
    let size = write_size_prefixed_tagged(entry, scratch);
    out.write_all(scratch)?;
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_ids_are_assigned_in_order() {
        let session = Session::new();
        for expected in 1..=5 {
            let id = session.add_event_source(EventSource::default());
            assert_eq!(id, expected);
        }
    }

    #[test]
    fn min_severity_is_advisory_state() {
        let session = Session::new();
        assert_eq!(session.min_severity(), Severity::Trace);
        session.set_min_severity(Severity::Error);
        assert_eq!(session.min_severity(), Severity::Error);
    }

    #[test]
    fn consume_on_empty_session_emits_only_the_clock_sync() {
        let session = Session::new();
        let mut out = Vec::new();
        let result = session.consume(&mut out).unwrap();
        assert_eq!(result.bytes_consumed, out.len());
        assert_eq!(result.channels_polled, 0);
        assert!(!out.is_empty());

        // Only the first consume re-emits it.
        let mut out2 = Vec::new();
        let result2 = session.consume(&mut out2).unwrap();
        assert_eq!(result2.bytes_consumed, 0);
        assert!(out2.is_empty());
        assert_eq!(result2.total_bytes_consumed, result.total_bytes_consumed);
    }
}
