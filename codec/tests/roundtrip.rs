//! decode(encode(x)) == x across the type zoo, and encoded_size exactness.

use proptest::prelude::*;
use skald_codec::{
    decode_exact, encode_to_vec, record_encode, Decode, DecodeError, Encode, Field, TypeTag,
};
use std::fmt::Debug;

fn round_trip<T: Encode + Decode + PartialEq + Debug>(value: &T) -> T {
    let bytes = encode_to_vec(value);
    assert_eq!(
        bytes.len(),
        value.encoded_size(),
        "encoded_size must match the bytes produced"
    );
    decode_exact::<T>(&bytes).unwrap()
}

macro_rules! integer_round_trip {
    ($name:ident, $t:ty) => {
        proptest! {
            #[test]
            fn $name(value in any::<$t>()) {
                prop_assert_eq!(round_trip(&value), value);
            }
        }
    };
}

integer_round_trip!(round_trip_u8, u8);
integer_round_trip!(round_trip_u16, u16);
integer_round_trip!(round_trip_u32, u32);
integer_round_trip!(round_trip_u64, u64);
integer_round_trip!(round_trip_i8, i8);
integer_round_trip!(round_trip_i16, i16);
integer_round_trip!(round_trip_i32, i32);
integer_round_trip!(round_trip_i64, i64);

proptest! {
    #[test]
    fn round_trip_bool(value in any::<bool>()) {
        prop_assert_eq!(round_trip(&value), value);
    }

    // Wire chars are one byte, so the whole domain is U+0000..=U+00FF.
    #[test]
    fn round_trip_char(value in proptest::char::range('\u{0}', '\u{FF}')) {
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn round_trip_char_int_tuple(value in (proptest::char::range('\u{0}', '\u{FF}'), any::<i32>())) {
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn round_trip_char_deque(
        value in proptest::collection::vec_deque(proptest::char::range('\u{0}', '\u{FF}'), 0..32),
    ) {
        prop_assert_eq!(round_trip(&value), value);
    }

    // Floats compare by bit pattern, which also covers NaN payloads.
    #[test]
    fn round_trip_f32_bits(bits in any::<u32>()) {
        let value = f32::from_bits(bits);
        prop_assert_eq!(round_trip(&value).to_bits(), bits);
    }

    #[test]
    fn round_trip_f64_bits(bits in any::<u64>()) {
        let value = f64::from_bits(bits);
        prop_assert_eq!(round_trip(&value).to_bits(), bits);
    }

    #[test]
    fn round_trip_string(value in ".*") {
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn round_trip_vec(value in proptest::collection::vec(any::<u32>(), 0..64)) {
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn round_trip_nested_vec(value in proptest::collection::vec(
        proptest::collection::vec(any::<i16>(), 0..8), 0..8))
    {
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn round_trip_option(value in any::<Option<i64>>()) {
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn round_trip_tuple(value in any::<(u8, i32, bool)>()) {
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn round_trip_fixed_array(value in any::<[u8; 16]>()) {
        prop_assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn round_trip_boxed(value in any::<i64>()) {
        prop_assert_eq!(*round_trip(&Box::new(value)), value);
    }
}

#[test]
fn float_specials_keep_their_bits() {
    for value in [0.0f64, -0.0, f64::INFINITY, f64::NEG_INFINITY, f64::MIN_POSITIVE] {
        assert_eq!(round_trip(&value).to_bits(), value.to_bits());
    }
    // Quiet and signaling NaN patterns; at minimum the NaN class survives.
    for bits in [0x7FF8_0000_0000_0001_u64, 0x7FF0_0000_0000_0001] {
        let out = round_trip(&f64::from_bits(bits));
        assert!(out.is_nan());
        assert_eq!(out.to_bits(), bits);
    }
}

#[test]
fn round_trip_small_collections() {
    let small: smallvec::SmallVec<[u16; 4]> = smallvec::smallvec![1, 2, 3, 4, 5];
    assert_eq!(round_trip(&small), small);

    let mut array_vec = arrayvec::ArrayVec::<i32, 8>::new();
    array_vec.push(-1);
    array_vec.push(7);
    assert_eq!(round_trip(&array_vec), array_vec);

    let name = arrayvec::ArrayString::<16>::from("skald").unwrap();
    assert_eq!(round_trip(&name), name);
}

#[test]
fn arrayvec_rejects_oversized_wire_sequences() {
    let bytes = encode_to_vec(&vec![1u8, 2, 3, 4, 5]);
    assert_eq!(
        decode_exact::<arrayvec::ArrayVec<u8, 3>>(&bytes),
        Err(DecodeError::SequenceTooLong { len: 5, capacity: 3 })
    );
}

#[test]
fn deque_and_vec_agree_on_the_wire() {
    let vec = vec![5u32, 6, 7];
    let deque: std::collections::VecDeque<u32> = vec.clone().into();
    assert_eq!(encode_to_vec(&vec), encode_to_vec(&deque));
    assert_eq!(round_trip(&deque), deque);
}

#[test]
fn truncated_input_is_rejected() {
    let bytes = encode_to_vec(&(0xAABBCCDD_u32, "hello"));
    for cut in 0..bytes.len() {
        assert!(decode_exact::<(u32, String)>(&bytes[..cut]).is_err());
    }
}

// A record with a custom wire prelude, after the original's adapted-`Person`:
// encode writes magic bytes before the members, decode rejects a mismatch.
#[derive(Debug, PartialEq, Default)]
struct Person {
    age: u16,
    name: String,
}

const PERSON_MAGIC: &[u8; 4] = b"prsn";

impl Encode for Person {
    const TAG: TypeTag = TypeTag::Record {
        name: "Person",
        fields: &[
            Field { name: "age", tag: &TypeTag::U16 },
            Field { name: "name", tag: &TypeTag::String },
        ],
    };

    fn encoded_size(&self) -> usize {
        PERSON_MAGIC.len() + self.age.encoded_size() + self.name.encoded_size()
    }

    fn encode(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(PERSON_MAGIC);
        self.age.encode(&mut buf[4..6]);
        self.name.encode(&mut buf[6..]);
    }
}

impl Decode for Person {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let magic = <[u8; 4]>::decode(input)?;
        if &magic != PERSON_MAGIC {
            return Err(DecodeError::PreludeMismatch { type_name: "Person" });
        }
        Ok(Person {
            age: u16::decode(input)?,
            name: String::decode(input)?,
        })
    }
}

#[test]
fn custom_prelude_round_trips() {
    let person = Person { age: 44, name: "Ada".to_string() };
    assert_eq!(round_trip(&person), person);
}

#[test]
fn custom_prelude_mismatch_is_a_hard_error() {
    let mut bytes = encode_to_vec(&Person::default());
    bytes[0] ^= 0xFF;
    assert_eq!(
        decode_exact::<Person>(&bytes),
        Err(DecodeError::PreludeMismatch { type_name: "Person" })
    );
}

// Encode-only member lists may differ from the decode side: `Instant`-style
// types expose accessors on write and rebuild from a different shape on read.
struct Window {
    lo: u64,
    hi: u64,
}

record_encode!(Window (this) {
    lo: u64 = this.lo,
    len: u64 = this.hi - this.lo,
});

#[test]
fn accessor_encode_decodes_as_plain_fields() {
    let window = Window { lo: 10, hi: 25 };
    let bytes = encode_to_vec(&window);
    assert_eq!(bytes.len(), window.encoded_size());
    let (lo, len) = decode_exact::<(u64, u64)>(&bytes).unwrap();
    assert_eq!((lo, len), (10, 15));
}
