//! Pull events back out of a binary stream.
//!
//! [`EventStream`] reads size-prefixed frames from any `Read + Seek` input,
//! accumulates metadata entries (sources, writer props, clock syncs), and
//! yields data events. Unknown special entries are skipped so old readers
//! keep working against newer writers.
//!
//! Frame-level failures leave the reader usable: short reads rewind the input
//! to the frame boundary so the next call retries, and payloads that fail to
//! parse are already consumed, so the next call moves on to the next frame.

use crate::entries::{ClockSync, Event, EventSource, SpecialEntry, WriterProp, SPECIAL_BIT};
use skald_codec::{Decode, DecodeError};
use snafu::{ResultExt, Snafu};
use std::collections::HashMap;
use std::io::{ErrorKind, Read, Seek, SeekFrom};

/// Frames above this size are skipped unless overridden with
/// [`EventStream::with_max_frame_size`]. Bounds the read buffer against
/// corrupt or hostile size prefixes.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

// Pattern positions reject associated consts, so name the entry tags locally.
const EVENT_SOURCE_TAG: u64 = EventSource::ENTRY_TAG;
const WRITER_PROP_TAG: u64 = WriterProp::ENTRY_TAG;
const CLOCK_SYNC_TAG: u64 = ClockSync::ENTRY_TAG;

#[derive(Debug, Snafu)]
pub enum ReadError {
    #[snafu(display("failed to read frame size: got {} of 4 bytes", got))]
    ShortSize { got: usize },
    #[snafu(display("failed to read frame payload: got {} of {} bytes", got, expected))]
    ShortPayload { expected: usize, got: usize },
    #[snafu(display("frame of {} bytes is too small for an entry", size))]
    FrameTooSmall { size: usize },
    #[snafu(display("frame of {} bytes exceeds the {} byte limit", size, limit))]
    FrameTooLarge { size: usize, limit: usize },
    #[snafu(display("event has invalid source id {}", id))]
    UnknownSourceId { id: u64 },
    #[snafu(display("bad event source entry: {}", source))]
    BadEventSource { source: DecodeError },
    #[snafu(display("bad writer prop entry: {}", source))]
    BadWriterProp { source: DecodeError },
    #[snafu(display("bad clock sync entry: {}", source))]
    BadClockSync { source: DecodeError },
    #[snafu(display("{}", source))]
    Io { source: std::io::Error },
}

/// Parses a skald stream back into events.
pub struct EventStream {
    sources: HashMap<u64, EventSource>,
    writer_prop: WriterProp,
    clock_sync: ClockSync,
    buffer: Vec<u8>,
    max_frame_size: usize,
}

impl Default for EventStream {
    fn default() -> Self {
        EventStream::new()
    }
}

impl EventStream {
    pub fn new() -> Self {
        EventStream {
            sources: HashMap::new(),
            writer_prop: WriterProp::default(),
            clock_sync: ClockSync::default(),
            buffer: Vec::new(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_frame_size(mut self, limit: usize) -> Self {
        self.max_frame_size = limit;
        self
    }

    /// The most recently parsed writer-prop entry; zero-valued before any.
    pub fn writer_prop(&self) -> &WriterProp {
        &self.writer_prop
    }

    /// The most recently parsed clock-sync entry; zero-valued before any.
    pub fn clock_sync(&self) -> &ClockSync {
        &self.clock_sync
    }

    /// The current definition of source `id`, if any has been seen.
    pub fn source(&self, id: u64) -> Option<&EventSource> {
        self.sources.get(&id)
    }

    /// Read frames until a data event turns up; `Ok(None)` on clean EOF.
    ///
    /// Metadata frames update the reader's state on the way: a later
    /// event-source definition with an already-known id overrides the earlier
    /// one, and a metadata frame that fails to parse is reported without
    /// touching the previous value.
    pub fn next_event<'a, R: Read + Seek>(
        &'a mut self,
        input: &mut R,
    ) -> Result<Option<Event<'a>>, ReadError> {
        let (source_id, clock_value) = loop {
            if !self.next_frame(input)? {
                return Ok(None);
            }

            let mut payload: &[u8] = &self.buffer;
            if payload.len() < 8 {
                return FrameTooSmallSnafu { size: payload.len() }.fail();
            }
            let tag = u64::from_le_bytes(payload[0..8].try_into().expect("8 bytes checked"));
            payload = &payload[8..];

            if tag & SPECIAL_BIT != 0 {
                match tag {
                    // Decode into a local first: a frame that fails to parse
                    // must leave the previous value intact.
                    EVENT_SOURCE_TAG => {
                        let source =
                            EventSource::decode(&mut payload).context(BadEventSourceSnafu)?;
                        self.sources.insert(source.id, source);
                    }
                    WRITER_PROP_TAG => {
                        let prop = WriterProp::decode(&mut payload).context(BadWriterPropSnafu)?;
                        self.writer_prop = prop;
                    }
                    CLOCK_SYNC_TAG => {
                        let sync = ClockSync::decode(&mut payload).context(BadClockSyncSnafu)?;
                        self.clock_sync = sync;
                    }
                    other => {
                        // Reserved for extension; skipping keeps old readers
                        // working against newer writers.
                        log::debug!("skipping unknown special entry {:#018x}", other);
                    }
                }
            } else {
                if payload.len() < 8 {
                    return FrameTooSmallSnafu {
                        size: self.buffer.len(),
                    }
                    .fail();
                }
                let clock_value =
                    u64::from_le_bytes(payload[0..8].try_into().expect("8 bytes checked"));
                break (tag, clock_value);
            }
        };

        let source = match self.sources.get(&source_id) {
            Some(source) => source,
            // The frame is already consumed, so the next call can progress.
            None => return UnknownSourceIdSnafu { id: source_id }.fail(),
        };
        Ok(Some(Event {
            source,
            clock_value,
            arguments: &self.buffer[16..],
        }))
    }

    /// Read one size-prefixed frame into the internal buffer. `Ok(false)` on
    /// clean EOF. On a short read the input is rewound to the frame boundary.
    fn next_frame<R: Read + Seek>(&mut self, input: &mut R) -> Result<bool, ReadError> {
        let mut size_bytes = [0u8; 4];
        let got = read_full(input, &mut size_bytes)?;
        if got == 0 {
            return Ok(false);
        }
        if got < 4 {
            input
                .seek(SeekFrom::Current(-(got as i64)))
                .context(IoSnafu)?;
            return ShortSizeSnafu { got }.fail();
        }

        let size = u32::from_le_bytes(size_bytes) as usize;
        if size > self.max_frame_size {
            // Skip the payload so the next call resumes on a frame boundary.
            log::warn!(
                "skipping oversized frame: {} bytes, limit {}",
                size,
                self.max_frame_size
            );
            input
                .seek(SeekFrom::Current(size as i64))
                .context(IoSnafu)?;
            return FrameTooLargeSnafu {
                size,
                limit: self.max_frame_size,
            }
            .fail();
        }

        self.buffer.resize(size, 0);
        let got = read_full(input, &mut self.buffer)?;
        if got < size {
            input
                .seek(SeekFrom::Current(-((4 + got) as i64)))
                .context(IoSnafu)?;
            return ShortPayloadSnafu {
                expected: size,
                got,
            }
            .fail();
        }
        Ok(true)
    }
}

/// Read until `buf` is full or EOF; returns the number of bytes read.
fn read_full<R: Read>(input: &mut R, mut buf: &mut [u8]) -> Result<usize, ReadError> {
    let mut total = 0;
    while !buf.is_empty() {
        match input.read(buf) {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                buf = &mut buf[n..];
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context(IoSnafu),
        }
    }
    Ok(total)
}
