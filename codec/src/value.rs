//! An owned-enough view of a visited value.
//!
//! [`read_value`] materializes one serialized value into a [`Value`] tree
//! backed by a caller-provided arena, driven entirely by the visitor, so it
//! works on any well-formed tag without compile-time type knowledge. The tree
//! implements [`serde::Serialize`] for downstream renderers (JSON exporters
//! and the like); skald itself never depends on the rendered form.

use crate::visit::{visit, EnumView, Visit, VisitError};
use bumpalo::Bump;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    String(&'a str),
    /// A `[c` sequence that did not decode as UTF-8.
    Bytes(&'a [u8]),
    Seq(&'a [Value<'a>]),
    Tuple(&'a [Value<'a>]),
    Null,
    Variant {
        discriminator: u8,
        value: &'a Value<'a>,
    },
    Enum {
        name: &'a str,
        /// Empty when the wire value is not a declared enumerator.
        enumerator: &'a str,
        value_hex: &'a str,
    },
    Struct {
        name: &'a str,
        fields: &'a [(&'a str, Value<'a>)],
    },
}

/// Materialize one value of type `tag` from `input` into `arena`, advancing
/// `input` past exactly the bytes the value occupies.
pub fn read_value<'a>(
    tag: &str,
    input: &mut &[u8],
    arena: &'a Bump,
) -> Result<Value<'a>, VisitError> {
    let mut builder = Builder {
        arena,
        stack: Vec::new(),
        result: None,
    };
    visit(tag, &mut builder, input)?;
    builder.result.ok_or(VisitError::UnexpectedEof)
}

enum Frame<'a> {
    Seq(Vec<Value<'a>>),
    Tuple(Vec<Value<'a>>),
    Variant {
        discriminator: u8,
        value: Option<Value<'a>>,
    },
    Struct {
        name: &'a str,
        fields: Vec<(&'a str, Value<'a>)>,
        pending_field: Option<&'a str>,
    },
}

struct Builder<'a> {
    arena: &'a Bump,
    stack: Vec<Frame<'a>>,
    result: Option<Value<'a>>,
}

impl<'a> Builder<'a> {
    fn push(&mut self, value: Value<'a>) {
        match self.stack.last_mut() {
            None => self.result = Some(value),
            Some(Frame::Seq(items)) | Some(Frame::Tuple(items)) => items.push(value),
            Some(Frame::Variant { value: slot, .. }) => *slot = Some(value),
            Some(Frame::Struct {
                fields,
                pending_field,
                ..
            }) => {
                if let Some(name) = pending_field.take() {
                    fields.push((name, value));
                }
            }
        }
    }
}

impl<'a> Visit for Builder<'a> {
    fn on_bool(&mut self, value: bool) {
        self.push(Value::Bool(value));
    }
    fn on_i8(&mut self, value: i8) {
        self.push(Value::I8(value));
    }
    fn on_u8(&mut self, value: u8) {
        self.push(Value::U8(value));
    }
    fn on_i16(&mut self, value: i16) {
        self.push(Value::I16(value));
    }
    fn on_u16(&mut self, value: u16) {
        self.push(Value::U16(value));
    }
    fn on_i32(&mut self, value: i32) {
        self.push(Value::I32(value));
    }
    fn on_u32(&mut self, value: u32) {
        self.push(Value::U32(value));
    }
    fn on_i64(&mut self, value: i64) {
        self.push(Value::I64(value));
    }
    fn on_u64(&mut self, value: u64) {
        self.push(Value::U64(value));
    }
    fn on_f32(&mut self, value: f32) {
        self.push(Value::F32(value));
    }
    fn on_f64(&mut self, value: f64) {
        self.push(Value::F64(value));
    }
    fn on_char(&mut self, value: char) {
        self.push(Value::Char(value));
    }

    fn on_string(&mut self, bytes: &[u8]) {
        let value = match std::str::from_utf8(bytes) {
            Ok(s) => Value::String(self.arena.alloc_str(s)),
            Err(_) => Value::Bytes(self.arena.alloc_slice_copy(bytes)),
        };
        self.push(value);
    }

    fn on_sequence_begin(&mut self, size: u32, _elem_tag: &str) {
        // The declared count is untrusted; cap the pre-allocation.
        self.stack
            .push(Frame::Seq(Vec::with_capacity(size.min(4096) as usize)));
    }
    fn on_sequence_end(&mut self) {
        if let Some(Frame::Seq(items)) = self.stack.pop() {
            let slice = self.arena.alloc_slice_fill_iter(items);
            self.push(Value::Seq(slice));
        }
    }

    fn on_tuple_begin(&mut self, _elem_tags: &str) {
        self.stack.push(Frame::Tuple(Vec::new()));
    }
    fn on_tuple_end(&mut self) {
        if let Some(Frame::Tuple(items)) = self.stack.pop() {
            let slice = self.arena.alloc_slice_fill_iter(items);
            self.push(Value::Tuple(slice));
        }
    }

    fn on_variant_begin(&mut self, discriminator: u8, _branch_tag: &str) {
        self.stack.push(Frame::Variant {
            discriminator,
            value: None,
        });
    }
    fn on_variant_end(&mut self) {
        if let Some(Frame::Variant {
            discriminator,
            value,
        }) = self.stack.pop()
        {
            match value {
                None | Some(Value::Null) => self.push(Value::Null),
                Some(inner) => self.push(Value::Variant {
                    discriminator,
                    value: self.arena.alloc(inner),
                }),
            }
        }
    }
    fn on_null(&mut self) {
        self.push(Value::Null);
    }

    fn on_enum(&mut self, value: EnumView<'_>) {
        self.push(Value::Enum {
            name: self.arena.alloc_str(value.name),
            enumerator: self.arena.alloc_str(value.enumerator),
            value_hex: self.arena.alloc_str(value.value_hex),
        });
    }

    fn on_struct_begin(&mut self, name: &str, _field_tags: &str) {
        self.stack.push(Frame::Struct {
            name: self.arena.alloc_str(name),
            fields: Vec::new(),
            pending_field: None,
        });
    }
    fn on_struct_end(&mut self) {
        if let Some(Frame::Struct { name, fields, .. }) = self.stack.pop() {
            let slice = self.arena.alloc_slice_fill_iter(fields);
            self.push(Value::Struct {
                name,
                fields: slice,
            });
        }
    }
    fn on_field_begin(&mut self, name: &str, _tag: &str) {
        if let Some(Frame::Struct { pending_field, .. }) = self.stack.last_mut() {
            *pending_field = Some(self.arena.alloc_str(name));
        }
    }
}

impl<'a> Serialize for Value<'a> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match *self {
            Value::Bool(v) => s.serialize_bool(v),
            Value::I8(v) => s.serialize_i8(v),
            Value::U8(v) => s.serialize_u8(v),
            Value::I16(v) => s.serialize_i16(v),
            Value::U16(v) => s.serialize_u16(v),
            Value::I32(v) => s.serialize_i32(v),
            Value::U32(v) => s.serialize_u32(v),
            Value::I64(v) => s.serialize_i64(v),
            Value::U64(v) => s.serialize_u64(v),
            Value::F32(v) => s.serialize_f32(v),
            Value::F64(v) => s.serialize_f64(v),
            Value::Char(v) => s.serialize_char(v),
            Value::String(v) => s.serialize_str(v),
            Value::Bytes(v) => s.serialize_bytes(v),
            Value::Seq(items) | Value::Tuple(items) => {
                let mut seq = s.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Null => s.serialize_unit(),
            Value::Variant { value, .. } => value.serialize(s),
            Value::Enum {
                enumerator,
                value_hex,
                ..
            } => {
                if enumerator.is_empty() {
                    s.serialize_str(value_hex)
                } else {
                    s.serialize_str(enumerator)
                }
            }
            Value::Struct { fields, .. } => {
                let mut map = s.serialize_map(Some(fields.len()))?;
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
    }
}
