//! Log severities.

use skald_codec::enum_codec;

enum_codec! {
    /// The severity of an event, totally ordered.
    ///
    /// `NoLogs` is a sentinel above every real level, used to disable logging
    /// through the session's advisory minimum; events themselves never carry
    /// it. Numeric values are spaced to leave room for intermediate levels.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum Severity: u16 {
        Trace = 32,
        Debug = 64,
        Info = 96,
        Warning = 128,
        Error = 160,
        Critical = 192,
        NoLogs = 0xFFFF,
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Trace
    }
}
