//! Structural type tags.
//!
//! Every encodable type carries a [`TypeTag`] tree describing its wire
//! structure. The tree renders to a compact textual tag that travels with the
//! stream metadata, so a reader can walk a serialized value without knowing
//! its compile-time type. The grammar is self-delimiting: a correct parser
//! consumes exactly one type, which is what lets the visitor split nested
//! tuple and sequence tags.

use snafu::Snafu;

/// A compile-time description of a value's wire structure.
///
/// Composite tags reference their children through `&'static` promotion, so
/// the whole tree can live in an associated `const` (recursive types cannot be
/// described this way; hand-write their textual tag instead, using a
/// `<0{Name}>` back-reference).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    /// A single one-byte character. Strings are sequences of these.
    Char,
    /// UTF-8 byte sequence; renders as `[c`.
    String,
    /// Variable-length sequence, u32 element count on the wire.
    Sequence { elem: &'static TypeTag },
    /// Fixed-length sequence, no count on the wire.
    Array { len: usize, elem: &'static TypeTag },
    Tuple { elems: &'static [TypeTag] },
    /// One-byte discriminator indexing `branches`.
    Variant { branches: &'static [TypeTag] },
    /// The payload-free branch of a variant; renders as `0`.
    Null,
    Enum {
        name: &'static str,
        underlying: &'static TypeTag,
        enumerators: &'static [Enumerator],
    },
    Record {
        name: &'static str,
        fields: &'static [Field],
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enumerator {
    /// The enumerator's integer value, sign-extended from the underlying type.
    pub value: i128,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub tag: &'static TypeTag,
}

impl TypeTag {
    /// Append the textual form of this tag to `out`.
    pub fn render(&self, out: &mut String) {
        match self {
            TypeTag::Bool => out.push('y'),
            TypeTag::I8 => out.push('b'),
            TypeTag::U8 => out.push('B'),
            TypeTag::I16 => out.push('s'),
            TypeTag::U16 => out.push('S'),
            TypeTag::I32 => out.push('i'),
            TypeTag::U32 => out.push('I'),
            TypeTag::I64 => out.push('l'),
            TypeTag::U64 => out.push('L'),
            TypeTag::F32 => out.push('f'),
            TypeTag::F64 => out.push('d'),
            TypeTag::Char => out.push('c'),
            TypeTag::String => out.push_str("[c"),
            TypeTag::Sequence { elem } => {
                out.push('[');
                elem.render(out);
            }
            TypeTag::Array { len, elem } => {
                out.push_str(&len.to_string());
                out.push('[');
                elem.render(out);
            }
            TypeTag::Tuple { elems } => {
                out.push('(');
                for elem in *elems {
                    elem.render(out);
                }
                out.push(')');
            }
            TypeTag::Variant { branches } => {
                out.push('<');
                for branch in *branches {
                    branch.render(out);
                }
                out.push('>');
            }
            TypeTag::Null => out.push('0'),
            TypeTag::Enum {
                name,
                underlying,
                enumerators,
            } => {
                out.push('/');
                underlying.render(out);
                out.push('`');
                out.push_str(name);
                out.push('\'');
                for e in *enumerators {
                    render_hex(e.value, out);
                    out.push('`');
                    out.push_str(e.label);
                    out.push('\'');
                }
                out.push('\\');
            }
            TypeTag::Record { name, fields } => {
                out.push('{');
                out.push_str(name);
                for f in *fields {
                    out.push('`');
                    out.push_str(f.name);
                    out.push('\'');
                    f.tag.render(out);
                }
                out.push('}');
            }
        }
    }

    pub fn to_tag_string(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }
}

/// Big-endian hex, uppercase, no leading zeros, sign-prefixed when negative.
pub(crate) fn render_hex(value: i128, out: &mut String) {
    if value < 0 {
        out.push('-');
    }
    out.push_str(&format!("{:X}", value.unsigned_abs()));
}

#[derive(Debug, Snafu, Clone, Copy, PartialEq, Eq)]
pub enum TagError {
    #[snafu(display("tag ended unexpectedly"))]
    UnexpectedEnd,
    #[snafu(display("unexpected character {:?} in tag", character))]
    UnexpectedCharacter { character: char },
}

/// Split one self-delimiting tag off the front of `input`.
///
/// Returns the tag and the remainder. Fails on malformed input, including an
/// empty string.
pub fn split_tag(input: &str) -> Result<(&str, &str), TagError> {
    let len = tag_len(input.as_bytes())?;
    Ok(input.split_at(len))
}

fn tag_len(s: &[u8]) -> Result<usize, TagError> {
    let &first = s.first().ok_or(TagError::UnexpectedEnd)?;
    match first {
        b'y' | b'b' | b'B' | b's' | b'S' | b'i' | b'I' | b'l' | b'L' | b'f' | b'd' | b'c' => Ok(1),
        b'[' => Ok(1 + tag_len(&s[1..])?),
        b'0'..=b'9' => {
            let digits = s.iter().take_while(|b| b.is_ascii_digit()).count();
            match s.get(digits) {
                // A digit group prefixing `[` is a fixed-length sequence.
                Some(&b'[') => Ok(digits + 1 + tag_len(&s[digits + 1..])?),
                // A bare `0` is the null branch of a variant.
                _ if s[..digits] == *b"0" => Ok(1),
                Some(&c) => Err(TagError::UnexpectedCharacter { character: c as char }),
                None => Err(TagError::UnexpectedEnd),
            }
        }
        b'(' => {
            let mut at = 1;
            while *s.get(at).ok_or(TagError::UnexpectedEnd)? != b')' {
                at += tag_len(&s[at..])?;
            }
            Ok(at + 1)
        }
        b'<' => {
            let mut at = 1;
            while *s.get(at).ok_or(TagError::UnexpectedEnd)? != b'>' {
                at += tag_len(&s[at..])?;
            }
            Ok(at + 1)
        }
        b'{' => {
            // {Name`field'TAG`field'TAG}
            let mut at = 1;
            loop {
                match *s.get(at).ok_or(TagError::UnexpectedEnd)? {
                    b'}' => return Ok(at + 1),
                    b'`' => {
                        at += 1;
                        while *s.get(at).ok_or(TagError::UnexpectedEnd)? != b'\'' {
                            at += 1;
                        }
                        at += 1;
                        at += tag_len(&s[at..])?;
                    }
                    _ => at += 1,
                }
            }
        }
        b'/' => {
            // /U`Name'HEX`Label'HEX`Label'\
            let mut at = 1 + tag_len(&s[1..])?;
            if *s.get(at).ok_or(TagError::UnexpectedEnd)? != b'`' {
                return Err(TagError::UnexpectedCharacter {
                    character: s[at] as char,
                });
            }
            loop {
                match *s.get(at).ok_or(TagError::UnexpectedEnd)? {
                    b'\\' => return Ok(at + 1),
                    b'`' => {
                        at += 1;
                        while *s.get(at).ok_or(TagError::UnexpectedEnd)? != b'\'' {
                            at += 1;
                        }
                        at += 1;
                    }
                    _ => at += 1,
                }
            }
        }
        other => Err(TagError::UnexpectedCharacter {
            character: other as char,
        }),
    }
}

/// Decompose a struct tag (`{Name`field'TAG...}`) into its name and the field
/// list that follows it.
pub fn struct_parts(tag: &str) -> Result<(&str, &str), TagError> {
    let body = tag
        .strip_prefix('{')
        .and_then(|t| t.strip_suffix('}'))
        .ok_or(TagError::UnexpectedCharacter {
            character: tag.chars().next().unwrap_or('}'),
        })?;
    let name_end = body.find('`').unwrap_or(body.len());
    Ok((&body[..name_end], &body[name_end..]))
}

/// Pull the next `` `name'TAG `` field off a struct field list.
pub fn next_field(fields: &str) -> Result<Option<(&str, &str, &str)>, TagError> {
    if fields.is_empty() {
        return Ok(None);
    }
    let rest = fields
        .strip_prefix('`')
        .ok_or(TagError::UnexpectedCharacter {
            character: fields.chars().next().unwrap_or('`'),
        })?;
    let quote = rest.find('\'').ok_or(TagError::UnexpectedEnd)?;
    let name = &rest[..quote];
    let (tag, rest) = split_tag(&rest[quote + 1..])?;
    Ok(Some((name, tag, rest)))
}

/// Decompose an enum tag into (underlying letter, name, enumerator list).
pub fn enum_parts(tag: &str) -> Result<(char, &str, &str), TagError> {
    let body = tag
        .strip_prefix('/')
        .and_then(|t| t.strip_suffix('\\'))
        .ok_or(TagError::UnexpectedCharacter {
            character: tag.chars().next().unwrap_or('/'),
        })?;
    let (underlying, rest) = split_tag(body)?;
    let underlying: char = underlying
        .chars()
        .next()
        .filter(|_| underlying.len() == 1)
        .ok_or(TagError::UnexpectedEnd)?;
    let rest = rest.strip_prefix('`').ok_or(TagError::UnexpectedEnd)?;
    let quote = rest.find('\'').ok_or(TagError::UnexpectedEnd)?;
    Ok((underlying, &rest[..quote], &rest[quote + 1..]))
}

/// Pull the next `` HEX`label' `` entry off an enumerator list.
pub fn next_enumerator(list: &str) -> Result<Option<(&str, &str, &str)>, TagError> {
    if list.is_empty() {
        return Ok(None);
    }
    let tick = list.find('`').ok_or(TagError::UnexpectedEnd)?;
    let hex = &list[..tick];
    let rest = &list[tick + 1..];
    let quote = rest.find('\'').ok_or(TagError::UnexpectedEnd)?;
    Ok(Some((hex, &rest[..quote], &rest[quote + 1..])))
}

/// Parse a big-endian hex enumerator value, `-` prefixed when negative.
pub(crate) fn parse_hex(hex: &str) -> Option<i128> {
    let (negative, digits) = match hex.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, hex),
    };
    let magnitude = u128::from_str_radix(digits, 16).ok()?;
    if negative {
        Some(-(magnitude as i128))
    } else {
        i128::try_from(magnitude).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_primitives_and_sequences() {
        assert_eq!(TypeTag::I32.to_tag_string(), "i");
        assert_eq!(TypeTag::String.to_tag_string(), "[c");
        assert_eq!(
            TypeTag::Sequence { elem: &TypeTag::Sequence { elem: &TypeTag::I32 } }.to_tag_string(),
            "[[i"
        );
        assert_eq!(
            TypeTag::Array { len: 16, elem: &TypeTag::U8 }.to_tag_string(),
            "16[B"
        );
    }

    #[test]
    fn render_tuple_and_variant() {
        let tag = TypeTag::Tuple {
            elems: &[TypeTag::I32, TypeTag::Bool, TypeTag::Char, TypeTag::Sequence { elem: &TypeTag::I32 }],
        };
        assert_eq!(tag.to_tag_string(), "(iyc[i)");

        let opt = TypeTag::Variant { branches: &[TypeTag::Null, TypeTag::I32] };
        assert_eq!(opt.to_tag_string(), "<0i>");
    }

    #[test]
    fn render_enum() {
        let tag = TypeTag::Enum {
            name: "LargeEnum",
            underlying: &TypeTag::I64,
            enumerators: &[
                Enumerator { value: i64::MIN as i128, label: "Golf" },
                Enumerator { value: -0x400, label: "Hotel" },
                Enumerator { value: 0, label: "India" },
                Enumerator { value: 0x7FFF_FFFF_FFFF_FFFF, label: "Kilo" },
            ],
        };
        assert_eq!(
            tag.to_tag_string(),
            "/l`LargeEnum'-8000000000000000`Golf'-400`Hotel'0`India'7FFFFFFFFFFFFFFF`Kilo'\\"
        );
    }

    #[test]
    fn render_record() {
        let tag = TypeTag::Record {
            name: "Element",
            fields: &[
                Field { name: "name", tag: &TypeTag::String },
                Field { name: "number", tag: &TypeTag::I32 },
            ],
        };
        assert_eq!(tag.to_tag_string(), "{Element`name'[c`number'i}");
    }

    #[test]
    fn split_consumes_exactly_one() {
        assert_eq!(split_tag("iyc"), Ok(("i", "yc")));
        assert_eq!(split_tag("[ii"), Ok(("[i", "i")));
        assert_eq!(split_tag("3[Bi"), Ok(("3[B", "i")));
        assert_eq!(split_tag("(iy)l"), Ok(("(iy)", "l")));
        assert_eq!(split_tag("<0i>y"), Ok(("<0i>", "y")));
        assert_eq!(split_tag("0i"), Ok(("0", "i")));
        assert_eq!(
            split_tag("{Tree`value'i`left'<0{Tree}>`right'<0{Tree}>}i"),
            Ok(("{Tree`value'i`left'<0{Tree}>`right'<0{Tree}>}", "i"))
        );
        assert_eq!(
            split_tag("/l`E'0`A'\\y"),
            Ok(("/l`E'0`A'\\", "y"))
        );
    }

    #[test]
    fn split_rejects_malformed() {
        assert_eq!(split_tag(""), Err(TagError::UnexpectedEnd));
        assert_eq!(split_tag("(iy"), Err(TagError::UnexpectedEnd));
        assert_eq!(split_tag("q"), Err(TagError::UnexpectedCharacter { character: 'q' }));
        assert_eq!(split_tag("3i"), Err(TagError::UnexpectedCharacter { character: 'i' }));
    }

    #[test]
    fn struct_decomposition() {
        let (name, fields) = struct_parts("{Element`name'[c`number'i}").unwrap();
        assert_eq!(name, "Element");
        let (f1, t1, rest) = next_field(fields).unwrap().unwrap();
        assert_eq!((f1, t1), ("name", "[c"));
        let (f2, t2, rest) = next_field(rest).unwrap().unwrap();
        assert_eq!((f2, t2), ("number", "i"));
        assert!(next_field(rest).unwrap().is_none());

        let (name, fields) = struct_parts("{Empty}").unwrap();
        assert_eq!(name, "Empty");
        assert!(fields.is_empty());
    }

    #[test]
    fn enum_decomposition() {
        let (underlying, name, list) = enum_parts("/l`E'-400`Hotel'0`India'\\").unwrap();
        assert_eq!(underlying, 'l');
        assert_eq!(name, "E");
        let (hex, label, rest) = next_enumerator(list).unwrap().unwrap();
        assert_eq!((hex, label), ("-400", "Hotel"));
        assert_eq!(parse_hex(hex), Some(-0x400));
        let (hex, label, rest) = next_enumerator(rest).unwrap().unwrap();
        assert_eq!((hex, label), ("0", "India"));
        assert_eq!(parse_hex(hex), Some(0));
        assert!(next_enumerator(rest).unwrap().is_none());
    }
}
