//! Call-site macros for producing events.
//!
//! [`event!`](crate::event) registers the call site's
//! [`EventSource`](crate::EventSource) with the session once, on first use,
//! and appends one event frame per invocation. The severity gate runs before
//! anything else: argument expressions of sub-threshold events are never
//! evaluated.

/// Append one event through `writer`, registering the call site on first use.
///
/// ```
/// # use std::sync::Arc;
/// # let session = Arc::new(skald::Session::new());
/// # let mut writer = skald::ChannelWriter::new(session, 4096, Default::default());
/// let peer = "10.0.0.7";
/// skald::event!(&mut writer, skald::Severity::Info, "peer connected", peer, 443u16);
/// ```
///
/// Arguments are encoded in order as a tuple; the source's `argument_tags`
/// describes that tuple. Expands to `false` (without evaluating the
/// arguments) when the event is below the session's advisory minimum
/// severity, and to the queue's accept/drop result otherwise.
#[macro_export]
macro_rules! event {
    ($writer:expr, $severity:expr, $format:expr $(, $value:expr)* $(,)?) => {{
        let writer: &mut $crate::ChannelWriter = $writer;
        let severity: $crate::Severity = $severity;
        if severity >= writer.session().min_severity() {
            let arguments = ($(&$value,)*);
            static SOURCE_ID: ::std::sync::OnceLock<u64> = ::std::sync::OnceLock::new();
            let source_id = *SOURCE_ID.get_or_init(|| {
                writer.session().add_event_source($crate::EventSource {
                    id: 0,
                    severity,
                    category: module_path!().to_string(),
                    function: ::std::string::String::new(),
                    file: file!().to_string(),
                    line: line!() as u64,
                    format_string: $format.to_string(),
                    argument_tags: $crate::codec::tag_of(&arguments).to_tag_string(),
                })
            });
            writer.add_event(source_id, $crate::clock_now(), &arguments)
        } else {
            false
        }
    }};
}

/// [`event!`](crate::event) at `Trace` severity.
#[macro_export]
macro_rules! trace {
    ($writer:expr, $($arg:tt)+) => {
        $crate::event!($writer, $crate::Severity::Trace, $($arg)+)
    };
}

/// [`event!`](crate::event) at `Debug` severity.
#[macro_export]
macro_rules! debug {
    ($writer:expr, $($arg:tt)+) => {
        $crate::event!($writer, $crate::Severity::Debug, $($arg)+)
    };
}

/// [`event!`](crate::event) at `Info` severity.
#[macro_export]
macro_rules! info {
    ($writer:expr, $($arg:tt)+) => {
        $crate::event!($writer, $crate::Severity::Info, $($arg)+)
    };
}

/// [`event!`](crate::event) at `Warning` severity.
#[macro_export]
macro_rules! warning {
    ($writer:expr, $($arg:tt)+) => {
        $crate::event!($writer, $crate::Severity::Warning, $($arg)+)
    };
}

/// [`event!`](crate::event) at `Error` severity.
#[macro_export]
macro_rules! error {
    ($writer:expr, $($arg:tt)+) => {
        $crate::event!($writer, $crate::Severity::Error, $($arg)+)
    };
}

/// [`event!`](crate::event) at `Critical` severity.
#[macro_export]
macro_rules! critical {
    ($writer:expr, $($arg:tt)+) => {
        $crate::event!($writer, $crate::Severity::Critical, $($arg)+)
    };
}
