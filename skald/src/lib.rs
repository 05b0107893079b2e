//! skald is a high-throughput structured binary logging library.
//!
//! Producer threads append typed events into per-producer lock-free byte
//! queues at very low latency; a single consumer periodically drains every
//! queue into a byte sink as a self-describing, forward-compatible binary
//! stream; [`EventStream`] parses that stream back into typed events.
//!
//! # Writing
//!
//! ```
//! use std::sync::Arc;
//!
//! let session = Arc::new(skald::Session::new());
//! let mut writer = skald::ChannelWriter::new(session.clone(), 1 << 16, Default::default());
//!
//! let path = "/etc/motd";
//! skald::info!(&mut writer, "opening file", path, 3u32);
//!
//! // Elsewhere, usually on a timer: drain everything to a sink.
//! let mut sink = Vec::new();
//! session.consume(&mut sink).unwrap();
//! ```
//!
//! # Reading
//!
//! ```
//! # use std::sync::Arc;
//! # let session = Arc::new(skald::Session::new());
//! # let mut writer = skald::ChannelWriter::new(session.clone(), 1 << 16, Default::default());
//! # skald::info!(&mut writer, "opening file", "/etc/motd", 3u32);
//! # let mut sink = Vec::new();
//! # session.consume(&mut sink).unwrap();
//! let mut stream = skald::EventStream::new();
//! let mut input = std::io::Cursor::new(sink);
//! while let Some(event) = stream.next_event(&mut input).unwrap() {
//!     println!("{} ({:?})", event.source.format_string, event.source.severity);
//! }
//! ```
//!
//! Event arguments stay opaque bytes until a consumer walks them with
//! [`codec::visit`] (or [`codec::read_value`]) using the source's
//! `argument_tags`.
//!
//! The stream format is self-describing (metadata entries precede the events
//! that reference them) and forward-compatible (readers skip special entries
//! they do not recognize).

#![deny(unused_must_use)]

pub use skald_codec as codec;

mod clock;
mod entries;
mod macros;
mod queue;
mod session;
mod severity;
mod stream;
mod writer;

pub use clock::{clock_now, system_clock_sync};
pub use entries::{
    write_size_prefixed_tagged, ClockSync, Event, EventSource, SpecialEntry, WriterProp,
    SPECIAL_BIT,
};
pub use queue::{byte_queue, QueueReader, QueueWriter};
pub use session::{Channel, ConsumeResult, Session};
pub use severity::Severity;
pub use stream::{EventStream, ReadError, DEFAULT_MAX_FRAME_SIZE};
pub use writer::ChannelWriter;
