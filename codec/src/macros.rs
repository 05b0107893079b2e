//! Declaration macros for user records and enums.

/// Declare a struct and wire up [`Encode`](crate::Encode) and
/// [`Decode`](crate::Decode) over its fields, in declaration order.
///
/// ```
/// skald_codec::record_codec! {
///     #[derive(Debug, Clone, PartialEq, Default)]
///     pub struct Endpoint {
///         pub host: String,
///         pub port: u16,
///     }
/// }
/// ```
#[macro_export]
macro_rules! record_codec {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                pub $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        pub struct $name {
            $( $(#[$fmeta])* pub $field: $ty, )*
        }

        impl $crate::Encode for $name {
            const TAG: $crate::TypeTag = $crate::TypeTag::Record {
                name: stringify!($name),
                fields: &[
                    $(
                        $crate::Field {
                            name: stringify!($field),
                            tag: &<$ty as $crate::Encode>::TAG,
                        },
                    )*
                ],
            };

            #[allow(unused_mut)]
            fn encoded_size(&self) -> usize {
                let mut out = 0;
                $( out += $crate::Encode::encoded_size(&self.$field); )*
                out
            }

            #[allow(unused_mut, unused_variables)]
            fn encode(&self, mut buf: &mut [u8]) {
                $(
                    let n = $crate::Encode::encoded_size(&self.$field);
                    $crate::Encode::encode(&self.$field, &mut buf[..n]);
                    buf = &mut buf[n..];
                )*
                let _ = buf;
            }
        }

        impl $crate::Decode for $name {
            fn decode(input: &mut &[u8]) -> ::std::result::Result<Self, $crate::DecodeError> {
                ::std::result::Result::Ok($name {
                    $( $field: <$ty as $crate::Decode>::decode(input)?, )*
                })
            }
        }
    };
}

/// Implement [`Encode`](crate::Encode) for an existing type from a member
/// list of accessor expressions. Encode-only: pair with a hand-written
/// [`Decode`](crate::Decode) when the type must be read back, possibly over a
/// different member set.
///
/// ```
/// # struct Span { lo: u32, hi: u32 }
/// # impl Span { fn len(&self) -> u32 { self.hi - self.lo } }
/// skald_codec::record_encode!(Span (this) {
///     lo: u32 = this.lo,
///     len: u32 = this.len(),
/// });
/// ```
#[macro_export]
macro_rules! record_encode {
    ($name:ident ($this:ident) {
        $($field:ident : $ty:ty = $getter:expr),* $(,)?
    }) => {
        impl $crate::Encode for $name {
            const TAG: $crate::TypeTag = $crate::TypeTag::Record {
                name: stringify!($name),
                fields: &[
                    $(
                        $crate::Field {
                            name: stringify!($field),
                            tag: &<$ty as $crate::Encode>::TAG,
                        },
                    )*
                ],
            };

            #[allow(unused_mut, unused_variables)]
            fn encoded_size(&self) -> usize {
                let $this = self;
                let mut out = 0;
                $( out += $crate::Encode::encoded_size(&$getter); )*
                out
            }

            #[allow(unused_mut, unused_variables)]
            fn encode(&self, mut buf: &mut [u8]) {
                let $this = self;
                $(
                    let value = $getter;
                    let n = $crate::Encode::encoded_size(&value);
                    $crate::Encode::encode(&value, &mut buf[..n]);
                    buf = &mut buf[n..];
                )*
                let _ = buf;
            }
        }
    };
}

/// Declare a field-less enum over an explicit underlying integer and wire up
/// [`Encode`](crate::Encode), [`Decode`](crate::Decode), and
/// `TryFrom<underlying>`. The wire form is the underlying integer; decoding
/// an undeclared value fails. Requires a `Copy` derive.
///
/// ```
/// skald_codec::enum_codec! {
///     #[derive(Debug, Clone, Copy, PartialEq, Eq)]
///     pub enum Mode: u8 {
///         Off = 0,
///         On = 1,
///     }
/// }
/// ```
#[macro_export]
macro_rules! enum_codec {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $underlying:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:expr ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr($underlying)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $value, )*
        }

        impl $crate::Encode for $name {
            const TAG: $crate::TypeTag = $crate::TypeTag::Enum {
                name: stringify!($name),
                underlying: &<$underlying as $crate::Encode>::TAG,
                enumerators: &[
                    $(
                        $crate::Enumerator {
                            value: ($value) as $underlying as i128,
                            label: stringify!($variant),
                        },
                    )*
                ],
            };

            fn encoded_size(&self) -> usize {
                ::std::mem::size_of::<$underlying>()
            }

            fn encode(&self, buf: &mut [u8]) {
                $crate::Encode::encode(&(*self as $underlying), buf)
            }
        }

        impl $crate::Decode for $name {
            fn decode(input: &mut &[u8]) -> ::std::result::Result<Self, $crate::DecodeError> {
                let raw = <$underlying as $crate::Decode>::decode(input)?;
                <$name as ::std::convert::TryFrom<$underlying>>::try_from(raw)
            }
        }

        impl ::std::convert::TryFrom<$underlying> for $name {
            type Error = $crate::DecodeError;

            fn try_from(value: $underlying) -> ::std::result::Result<Self, $crate::DecodeError> {
                match value {
                    $( v if v == ($value) as $underlying => ::std::result::Result::Ok($name::$variant), )*
                    other => ::std::result::Result::Err($crate::DecodeError::UnknownEnumerator {
                        value: other as i128,
                    }),
                }
            }
        }
    };
}
