//! The producer-side handle for one channel.

use crate::entries::{WriterProp, SPECIAL_BIT};
use crate::queue::QueueWriter;
use crate::session::{Channel, Session};
use skald_codec::Encode;
use std::sync::Arc;

/// Writes framed events into one session channel.
///
/// Each writer owns the producer half of its channel's queue, so it must not
/// be shared between threads; create one writer per producer. Dropping the
/// writer closes the channel, and the session disposes it on the next drain
/// once it is empty.
pub struct ChannelWriter {
    session: Arc<Session>,
    channel: Arc<Channel>,
    queue: QueueWriter,
}

impl ChannelWriter {
    /// Create a channel of `capacity` bytes on `session` and wrap its
    /// producer half.
    pub fn new(session: Arc<Session>, capacity: usize, writer_prop: WriterProp) -> Self {
        let (channel, queue) = session.create_channel(capacity, writer_prop);
        ChannelWriter {
            session,
            channel,
            queue,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn channel(&self) -> &Arc<Channel> {
        &self.channel
    }

    pub fn set_id(&self, id: u64) {
        self.session.set_channel_writer_id(&self.channel, id);
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.session
            .set_channel_writer_name(&self.channel, name.into());
    }

    /// Append one event frame referencing `source_id`.
    ///
    /// The whole frame goes into a single queue reservation, so drains only
    /// ever see complete frames. Returns `false` when the queue had no room;
    /// the event is dropped and the caller decides whether to retry.
    pub fn add_event<A: Encode + ?Sized>(
        &mut self,
        source_id: u64,
        clock_value: u64,
        arguments: &A,
    ) -> bool {
        debug_assert_eq!(source_id & SPECIAL_BIT, 0, "source ids never set the high bit");
        let payload_size = 8 + 8 + arguments.encoded_size();
        let buf = match self.queue.reserve(4 + payload_size) {
            Some(buf) => buf,
            None => return false,
        };
        buf[0..4].copy_from_slice(&(payload_size as u32).to_le_bytes());
        buf[4..12].copy_from_slice(&source_id.to_le_bytes());
        buf[12..20].copy_from_slice(&clock_value.to_le_bytes());
        arguments.encode(&mut buf[20..]);
        self.queue.commit();
        true
    }
}

impl Drop for ChannelWriter {
    fn drop(&mut self) {
        self.channel.close();
    }
}
