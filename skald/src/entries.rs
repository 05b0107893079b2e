//! Stream entries: the records that travel in size-prefixed frames.
//!
//! Every frame payload starts with a u64 entry tag. Tags with the high bit
//! set mark special (metadata) entries; the remaining tag space is event
//! source ids. Readers must skip special tags they do not recognize, so new
//! entry kinds can be added without breaking old readers.

use crate::severity::Severity;
use skald_codec::{record_codec, Encode};

/// High bit of the entry tag; set on special entries.
pub const SPECIAL_BIT: u64 = 1 << 63;

record_codec! {
    /// The schema of one event call site.
    ///
    /// Registered with a session, which assigns the id. A later definition
    /// with the same id overrides the earlier one on the reader side.
    #[derive(Debug, Clone, PartialEq, Eq, Default)]
    pub struct EventSource {
        pub id: u64,
        pub severity: Severity,
        pub category: String,
        pub function: String,
        pub file: String,
        pub line: u64,
        pub format_string: String,
        /// Tag of the argument tuple, in the textual tag language.
        pub argument_tags: String,
    }
}

record_codec! {
    /// Describes the producer of a channel; emitted before each drained batch.
    #[derive(Debug, Clone, PartialEq, Eq, Default)]
    pub struct WriterProp {
        pub id: u64,
        pub name: String,
        pub batch_size: u64,
    }
}

record_codec! {
    /// Maps a monotonic counter to a wall clock, so readers can translate
    /// event clock values to timestamps.
    #[derive(Debug, Clone, PartialEq, Eq, Default)]
    pub struct ClockSync {
        pub clock_value: u64,
        pub clock_frequency: u64,
        pub ns_since_epoch: i64,
        pub tz_offset: i32,
        pub tz_name: String,
    }
}

/// A special entry with a reserved tag value.
pub trait SpecialEntry: Encode {
    const ENTRY_TAG: u64;
}

impl SpecialEntry for EventSource {
    const ENTRY_TAG: u64 = u64::MAX; // -1
}

impl SpecialEntry for WriterProp {
    const ENTRY_TAG: u64 = u64::MAX - 1; // -2
}

impl SpecialEntry for ClockSync {
    const ENTRY_TAG: u64 = u64::MAX - 2; // -3
}

/// One decoded data event, borrowing the reader that produced it.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    pub source: &'a EventSource,
    pub clock_value: u64,
    /// Arguments, serialized per `source.argument_tags`.
    pub arguments: &'a [u8],
}

/// Append one framed special entry (`size` + entry tag + fields) to `out`.
/// Returns the number of bytes written.
pub fn write_size_prefixed_tagged<E: SpecialEntry>(entry: &E, out: &mut Vec<u8>) -> usize {
    let payload_size = 8 + entry.encoded_size();
    let total = 4 + payload_size;
    out.reserve(total);
    out.extend_from_slice(&(payload_size as u32).to_le_bytes());
    out.extend_from_slice(&E::ENTRY_TAG.to_le_bytes());
    let start = out.len();
    out.resize(start + entry.encoded_size(), 0);
    entry.encode(&mut out[start..]);
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use skald_codec::decode_exact;

    #[test]
    fn special_tags_have_the_high_bit() {
        assert_ne!(EventSource::ENTRY_TAG & SPECIAL_BIT, 0);
        assert_ne!(WriterProp::ENTRY_TAG & SPECIAL_BIT, 0);
        assert_ne!(ClockSync::ENTRY_TAG & SPECIAL_BIT, 0);
        assert_ne!(EventSource::ENTRY_TAG, WriterProp::ENTRY_TAG);
        assert_ne!(WriterProp::ENTRY_TAG, ClockSync::ENTRY_TAG);
    }

    #[test]
    fn framing_layout() {
        let prop = WriterProp {
            id: 7,
            name: "w".to_string(),
            batch_size: 0,
        };
        let mut out = Vec::new();
        let written = write_size_prefixed_tagged(&prop, &mut out);
        assert_eq!(written, out.len());

        let size = u32::from_le_bytes(out[0..4].try_into().unwrap()) as usize;
        assert_eq!(size, out.len() - 4);
        let tag = u64::from_le_bytes(out[4..12].try_into().unwrap());
        assert_eq!(tag, WriterProp::ENTRY_TAG);
        assert_eq!(decode_exact::<WriterProp>(&out[12..]).unwrap(), prop);
    }

    #[test]
    fn entry_round_trip() {
        let source = EventSource {
            id: 3,
            severity: Severity::Warning,
            category: "net".to_string(),
            function: "connect".to_string(),
            file: "net.rs".to_string(),
            line: 41,
            format_string: "connecting".to_string(),
            argument_tags: "([cI)".to_string(),
        };
        let bytes = skald_codec::encode_to_vec(&source);
        assert_eq!(decode_exact::<EventSource>(&bytes).unwrap(), source);
    }
}
