//! Structural serialization for skald log streams.
//!
//! Three cooperating pieces:
//!
//! * [`Encode`] / [`Decode`]: a compact little-endian wire format for
//!   primitives, sequences, tuples, variants, enums, and user records, with
//!   exact size accounting (`encoded_size` always matches the bytes written).
//! * [`TypeTag`] and its textual rendering: a self-delimiting description of
//!   a value's structure that travels with stream metadata.
//! * [`visit`]: tag-directed traversal of an opaque byte range, firing
//!   structural callbacks without compile-time type knowledge. [`read_value`]
//!   builds an arena-backed [`Value`] tree on top of it.
//!
//! The writer and reader side of one stream agree only on tags and bytes, so
//! a reader built against this crate can walk values produced by any writer,
//! including ones with record types it has never seen.

#![deny(unused_must_use)]

mod decode;
mod encode;
mod macros;
pub mod tag;
mod value;
mod visit;

pub use decode::{decode_exact, Decode, DecodeError};
pub use encode::{encode_to_vec, tag_of, Encode};
pub use tag::{split_tag, Enumerator, Field, TagError, TypeTag};
pub use value::{read_value, Value};
pub use visit::{visit, EnumView, Visit, VisitError};
