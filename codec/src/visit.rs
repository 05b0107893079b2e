//! Tag-directed traversal of serialized values.
//!
//! [`visit`] walks one encoded value given its textual tag, firing structural
//! callbacks on a user [`Visit`] impl. The traversal consumes exactly the
//! bytes a typed decode of the same value would, so callers can use it to
//! split concatenated values (e.g. event argument blobs).

use crate::decode::ReadBytes;
use crate::tag::{
    enum_parts, next_enumerator, next_field, parse_hex, render_hex, split_tag, struct_parts,
    TagError,
};
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
pub enum VisitError {
    #[snafu(display("malformed tag: {}", source))]
    MalformedTag { source: TagError },
    #[snafu(display("unexpected end of input"))]
    UnexpectedEof,
    #[snafu(display("bad variant discriminator {} (have {} branches)", got, branches))]
    BadDiscriminator { got: u8, branches: usize },
    #[snafu(display("enum underlying type {:?} is not an integer", letter))]
    BadEnumUnderlying { letter: char },
}

/// A decoded enum value, as seen by a visitor.
#[derive(Debug, Clone, Copy)]
pub struct EnumView<'a> {
    pub name: &'a str,
    /// Matching enumerator label, or empty when the value is not declared.
    pub enumerator: &'a str,
    /// The underlying primitive letter.
    pub underlying: char,
    /// The value, big-endian hex, sign-prefixed for signed underlyings.
    pub value_hex: &'a str,
}

/// Structural callbacks fired by [`visit`]. All have empty defaults, so a
/// visitor implements only what it cares about.
pub trait Visit {
    fn on_bool(&mut self, _value: bool) {}
    fn on_i8(&mut self, _value: i8) {}
    fn on_u8(&mut self, _value: u8) {}
    fn on_i16(&mut self, _value: i16) {}
    fn on_u16(&mut self, _value: u16) {}
    fn on_i32(&mut self, _value: i32) {}
    fn on_u32(&mut self, _value: u32) {}
    fn on_i64(&mut self, _value: i64) {}
    fn on_u64(&mut self, _value: u64) {}
    fn on_f32(&mut self, _value: f32) {}
    fn on_f64(&mut self, _value: f64) {}
    fn on_char(&mut self, _value: char) {}

    /// A `[c` sequence, handed over as one zero-copy byte view.
    fn on_string(&mut self, _bytes: &[u8]) {}

    fn on_sequence_begin(&mut self, _size: u32, _elem_tag: &str) {}
    fn on_sequence_end(&mut self) {}

    fn on_tuple_begin(&mut self, _elem_tags: &str) {}
    fn on_tuple_end(&mut self) {}

    /// Fired before the selected branch is visited; `branch_tag` is the tag
    /// of that branch (`"0"` for the null branch).
    fn on_variant_begin(&mut self, _discriminator: u8, _branch_tag: &str) {}
    fn on_variant_end(&mut self) {}
    fn on_null(&mut self) {}

    fn on_enum(&mut self, _value: EnumView<'_>) {}

    fn on_struct_begin(&mut self, _name: &str, _field_tags: &str) {}
    fn on_struct_end(&mut self) {}
    fn on_field_begin(&mut self, _name: &str, _tag: &str) {}
    fn on_field_end(&mut self) {}
}

/// Visit one value of type `tag`, advancing `input` past exactly its bytes.
pub fn visit<V: Visit>(tag: &str, visitor: &mut V, input: &mut &[u8]) -> Result<(), VisitError> {
    // Validate the delimiter structure up front; the recursion below slices
    // on the strength of it.
    let (head, rest) = split_tag(tag).context(MalformedTagSnafu)?;
    if let Some(character) = rest.chars().next() {
        return Err(VisitError::MalformedTag {
            source: TagError::UnexpectedCharacter { character },
        });
    }
    let mut scopes = Vec::new();
    visit_one(head, visitor, input, &mut scopes)
}

fn read<'a>(input: &mut &'a [u8], n: usize) -> Result<&'a [u8], VisitError> {
    input.take_bytes(n).map_err(|_| VisitError::UnexpectedEof)
}

fn visit_one<'t, V: Visit>(
    tag: &'t str,
    visitor: &mut V,
    input: &mut &[u8],
    scopes: &mut Vec<(&'t str, &'t str)>,
) -> Result<(), VisitError> {
    let first = *tag.as_bytes().first().ok_or(VisitError::UnexpectedEof)?;
    match first {
        b'y' => visitor.on_bool(read(input, 1)?[0] != 0),
        b'b' => visitor.on_i8(read(input, 1)?[0] as i8),
        b'B' => visitor.on_u8(read(input, 1)?[0]),
        b's' => visitor.on_i16(i16::from_le_bytes(read_array(input)?)),
        b'S' => visitor.on_u16(u16::from_le_bytes(read_array(input)?)),
        b'i' => visitor.on_i32(i32::from_le_bytes(read_array(input)?)),
        b'I' => visitor.on_u32(u32::from_le_bytes(read_array(input)?)),
        b'l' => visitor.on_i64(i64::from_le_bytes(read_array(input)?)),
        b'L' => visitor.on_u64(u64::from_le_bytes(read_array(input)?)),
        b'f' => visitor.on_f32(f32::from_le_bytes(read_array(input)?)),
        b'd' => visitor.on_f64(f64::from_le_bytes(read_array(input)?)),
        b'c' => visitor.on_char(read(input, 1)?[0] as char),
        b'0'..=b'9' => {
            // Either the null branch of a variant, or a fixed-length sequence.
            if tag == "0" {
                visitor.on_null();
            } else {
                let bracket = tag.find('[').ok_or(VisitError::MalformedTag {
                    source: TagError::UnexpectedEnd,
                })?;
                let len: u32 = tag[..bracket].parse().map_err(|_| VisitError::MalformedTag {
                    source: TagError::UnexpectedEnd,
                })?;
                let elem = &tag[bracket + 1..];
                visitor.on_sequence_begin(len, elem);
                for _ in 0..len {
                    visit_one(elem, visitor, input, scopes)?;
                }
                visitor.on_sequence_end();
            }
        }
        b'[' => {
            let elem = &tag[1..];
            let size = u32::from_le_bytes(read_array(input)?);
            if elem == "c" {
                visitor.on_string(read(input, size as usize)?);
            } else {
                visitor.on_sequence_begin(size, elem);
                for _ in 0..size {
                    visit_one(elem, visitor, input, scopes)?;
                }
                visitor.on_sequence_end();
            }
        }
        b'(' => {
            let elems = &tag[1..tag.len() - 1];
            visitor.on_tuple_begin(elems);
            let mut rest = elems;
            while !rest.is_empty() {
                let (elem, tail) = split_tag(rest).context(MalformedTagSnafu)?;
                visit_one(elem, visitor, input, scopes)?;
                rest = tail;
            }
            visitor.on_tuple_end();
        }
        b'<' => {
            let branches = &tag[1..tag.len() - 1];
            let discriminator = read(input, 1)?[0];
            let mut rest = branches;
            let mut index = 0u8;
            let branch = loop {
                if rest.is_empty() {
                    return Err(VisitError::BadDiscriminator {
                        got: discriminator,
                        branches: index as usize,
                    });
                }
                let (branch, tail) = split_tag(rest).context(MalformedTagSnafu)?;
                if index == discriminator {
                    break branch;
                }
                index += 1;
                rest = tail;
            };
            visitor.on_variant_begin(discriminator, branch);
            visit_one(branch, visitor, input, scopes)?;
            visitor.on_variant_end();
        }
        b'/' => {
            let (underlying, name, list) = enum_parts(tag).context(MalformedTagSnafu)?;
            let value: i128 = match underlying {
                'b' => i8::from_le_bytes(read_array(input)?) as i128,
                'B' => read(input, 1)?[0] as i128,
                's' => i16::from_le_bytes(read_array(input)?) as i128,
                'S' => u16::from_le_bytes(read_array(input)?) as i128,
                'i' => i32::from_le_bytes(read_array(input)?) as i128,
                'I' => u32::from_le_bytes(read_array(input)?) as i128,
                'l' => i64::from_le_bytes(read_array(input)?) as i128,
                'L' => u64::from_le_bytes(read_array(input)?) as i128,
                letter => return Err(VisitError::BadEnumUnderlying { letter }),
            };
            let mut value_hex = String::new();
            render_hex(value, &mut value_hex);
            let mut enumerator = "";
            let mut rest = list;
            while let Some((hex, label, tail)) = next_enumerator(rest).context(MalformedTagSnafu)? {
                if parse_hex(hex) == Some(value) {
                    enumerator = label;
                    break;
                }
                rest = tail;
            }
            visitor.on_enum(EnumView {
                name,
                enumerator,
                underlying,
                value_hex: value_hex.as_str(),
            });
        }
        b'{' => {
            let (name, fields) = struct_parts(tag).context(MalformedTagSnafu)?;
            if fields.is_empty() {
                // `{Name}` inside the definition of Name is a back-reference;
                // anywhere else it is an empty struct.
                if let Some(&(_, definition)) =
                    scopes.iter().rev().find(|(scope_name, _)| *scope_name == name)
                {
                    visit_one(definition, visitor, input, scopes)?;
                } else {
                    visitor.on_struct_begin(name, "");
                    visitor.on_struct_end();
                }
            } else {
                scopes.push((name, tag));
                visitor.on_struct_begin(name, fields);
                let mut rest = fields;
                while let Some((field_name, field_tag, tail)) =
                    next_field(rest).context(MalformedTagSnafu)?
                {
                    visitor.on_field_begin(field_name, field_tag);
                    visit_one(field_tag, visitor, input, scopes)?;
                    visitor.on_field_end();
                    rest = tail;
                }
                visitor.on_struct_end();
                scopes.pop();
            }
        }
        other => {
            return Err(VisitError::MalformedTag {
                source: TagError::UnexpectedCharacter {
                    character: other as char,
                },
            })
        }
    }
    Ok(())
}

fn read_array<const N: usize>(input: &mut &[u8]) -> Result<[u8; N], VisitError> {
    let bytes = read(input, N)?;
    let mut out = [0; N];
    out.copy_from_slice(bytes);
    Ok(out)
}
