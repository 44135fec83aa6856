//! End-to-end tests of the wire format: writing value trees and
//! reading them back, against both the codec itself and hand-written
//! ground-truth byte streams.

use enbt_core::value::Value;
use enbt_core::{alias, Endian, TypeClass};
use enbt_parser::lookup::get_value_path;
use enbt_parser::read::{read_file, read_token};
use enbt_parser::skip::skip_token;
use enbt_core::ValuePath;
use enbt_parser::write::{write_asn_strings, write_token, write_version};
use std::io::Cursor;

fn roundtrip(value: &Value) -> Value {
    let mut bytes = Vec::new();
    write_token(&mut bytes, value).unwrap();
    read_token(&mut Cursor::new(bytes)).unwrap()
}

fn sample_values() -> Vec<Value> {
    let mut compound = Value::compound();
    compound.insert("name", Value::from("alice")).unwrap();
    compound.insert("hp", Value::from(20u8)).unwrap();
    compound
        .insert(
            "pos",
            Value::array(vec![
                Value::from(1.5f64),
                Value::from(-2.5f64),
                Value::from(0.0f64),
            ])
            .unwrap(),
        )
        .unwrap();

    vec![
        Value::none(),
        Value::bit(false),
        Value::bit(true),
        Value::from(-128i8),
        Value::from(255u8),
        Value::from(-30_000i16),
        Value::from(0xBEEFu16),
        Value::from(i32::MIN),
        Value::from(u32::MAX),
        Value::from(i64::MIN),
        Value::from(u64::MAX),
        Value::from(1.25f32),
        Value::from(-1e300f64),
        Value::var_i32(-1),
        Value::var_u32(300),
        Value::var_i64(-1),
        Value::var_u64(1 << 60),
        Value::from(uuid::Uuid::from_u128(0xD55F0C3556DA165E6F512203C78B57FF)),
        Value::from("съешь ещё этих мягких французских булок"),
        Value::from(vec![1u8, 2, 3]),
        Value::from(&[-1i16, 0, 1][..]),
        Value::from(&[1u32, 2, 3][..]),
        Value::from(&[-1i64, i64::MAX][..]),
        Value::array(vec![]).unwrap(),
        Value::array(vec![Value::from(1u16), Value::from(2u16)]).unwrap(),
        Value::array((0..17).map(|i| Value::bit(i % 2 == 0)).collect()).unwrap(),
        Value::darray(vec![Value::from("x"), Value::from(1u8), Value::none()]),
        compound,
        Value::optional(None),
        Value::optional(Some(Value::from("inner"))),
        Value::structure(vec![Value::from(1u8), Value::from("field"), Value::bit(true)])
            .unwrap(),
        Value::log_item(Value::from("journal line")),
    ]
}

#[test]
fn every_value_roundtrips_structurally() {
    for value in &sample_values() {
        let back = roundtrip(value);
        assert_eq!(&back, value);
        assert_eq!(back.descriptor(), value.descriptor());
    }
}

#[test]
fn non_native_byte_orders_roundtrip() {
    let values = [
        Value::from(0x0102_0304i32).with_endian(Endian::Big),
        Value::from(0x0102u16).with_endian(Endian::Big),
        Value::from(1.5f64).with_endian(Endian::Big),
        Value::from(&[0x0102u16, 0x0304][..]).with_endian(Endian::Big),
        Value::from(uuid::Uuid::from_u128(7)).with_endian(Endian::Big),
    ];
    for value in &values {
        let back = roundtrip(value);
        assert_eq!(&back, value);
        assert_eq!(back.descriptor().endian, Endian::Big);
    }
}

#[test]
fn big_endian_sarray_payload_is_byte_swapped() {
    let value = Value::from(&[0x0102u16, 0x0304][..]).with_endian(Endian::Big);
    let mut bytes = Vec::new();
    write_token(&mut bytes, &value).unwrap();
    // descriptor, compressed count, then the swapped payload
    assert_eq!(&bytes[2..], [0x01, 0x02, 0x03, 0x04]);

    let little = Value::from(&[0x0102u16, 0x0304][..]).with_endian(Endian::Little);
    let mut bytes = Vec::new();
    write_token(&mut bytes, &little).unwrap();
    assert_eq!(&bytes[2..], [0x02, 0x01, 0x04, 0x03]);
}

#[test]
fn skip_token_advances_exactly_one_encoding() {
    for value in &sample_values() {
        let mut bytes = Vec::new();
        write_token(&mut bytes, value).unwrap();
        let encoded = bytes.len() as u64;
        let mut stream = Cursor::new(bytes);
        skip_token(&mut stream).unwrap();
        assert_eq!(stream.position(), encoded, "skipping {:?}", value);
    }
}

#[test]
fn inline_compound_ground_truth_stream() {
    // { "greet": "hi", "n": i32(7) } with inline string keys
    let bytes = vec![
        0x10, // version
        0x60, // compound, tiny, little, inline keys
        0x02, // entry count
        0x05, b'g', b'r', b'e', b'e', b't', // first key
        0x50, // sarray, tiny, unsigned
        0x02, b'h', b'i', // two element bytes
        0x01, b'n', // second key
        0x19, // integer, default, little, signed
        0x07, 0x00, 0x00, 0x00,
    ];

    let value = read_file(&mut Cursor::new(bytes)).unwrap();
    let mut expected = Value::compound();
    expected
        .insert("greet", Value::from("hi").with_endian(Endian::Little))
        .unwrap();
    expected
        .insert("n", Value::from(7i32).with_endian(Endian::Little))
        .unwrap();
    assert_eq!(value, expected);
}

#[test]
fn bit_array_ground_truth_stream() {
    // [T,F,T,T,F,F,F,F,T] packs into two bytes, least significant first
    let bytes = vec![
        0x80, // array, tiny
        0x09, // count
        0xB0, // bit element descriptor, sign clear
        0b0000_1101,
        0b0000_0001,
    ];
    let value = read_token(&mut Cursor::new(bytes)).unwrap();
    let expected = Value::array(
        [true, false, true, true, false, false, false, false, true]
            .iter()
            .map(|&b| Value::bit(b))
            .collect(),
    )
    .unwrap();
    assert_eq!(value, expected);
}

#[test]
fn path_lookup_reads_leaves_in_place() {
    let mut root = Value::compound();
    root.insert("greet", Value::from("hi")).unwrap();
    root.insert("n", Value::from(7i32)).unwrap();
    root.insert(
        "xs",
        Value::array((0..5).map(|i| Value::from(i as u32 * 10)).collect()).unwrap(),
    )
    .unwrap();

    let mut bytes = Vec::new();
    write_token(&mut bytes, &root).unwrap();
    let mut stream = Cursor::new(bytes);

    let n = get_value_path(&mut stream, &ValuePath::parse("n")).unwrap();
    assert_eq!(n.to_int::<i32>().unwrap(), 7);
    assert_eq!(stream.position(), 0);

    // position-invariant indexing into the fixed-width array
    for i in 0..5u64 {
        let path = ValuePath::new().push_name("xs").push_index(i);
        let element = get_value_path(&mut stream, &path).unwrap();
        assert_eq!(element.to_int::<u32>().unwrap(), i as u32 * 10);
        assert_eq!(stream.position(), 0);
    }
}

// the alias table is process-global, so every aliased-compound and ASN
// assertion lives in this one test
#[test]
fn aliased_compounds_and_asn_streams() {
    alias::set_alias_strings(vec!["a".into(), "b".into()]).unwrap();

    // ground truth: { alias 0 -> u8(1), alias 1 -> u8(2) }
    let bytes = vec![
        0x61, // compound, tiny, aliased keys
        0x02, // entry count
        0x00, 0x00, // alias 0
        0x10, 0x01, // u8 token
        0x01, 0x00, // alias 1
        0x10, 0x02, // u8 token
    ];
    let value = read_token(&mut Cursor::new(bytes)).unwrap();
    assert_eq!(value.type_class(), TypeClass::Compound);
    assert!(value.descriptor().signed);
    assert_eq!(value["a"].to_int::<u8>().unwrap(), 1);
    assert_eq!(value["b"].to_int::<u8>().unwrap(), 2);

    // aliased values roundtrip through the writer as well
    let back = roundtrip(&value);
    assert_eq!(back, value);

    // aliased keys resolve during path lookup
    let mut bytes = Vec::new();
    write_token(&mut bytes, &value).unwrap();
    let mut stream = Cursor::new(bytes);
    let found = get_value_path(&mut stream, &ValuePath::parse("b")).unwrap();
    assert_eq!(found.to_int::<u8>().unwrap(), 2);

    // the ASN stream carries the table itself
    let mut asn = Vec::new();
    write_asn_strings(&mut asn).unwrap();
    assert_eq!(asn, [0x10, 0x02, 0x00, b'a', 0x00, b'b', 0x00]);

    alias::set_alias_strings(vec!["other".into()]).unwrap();
    enbt_parser::read::read_asn_strings(&mut Cursor::new(asn)).unwrap();
    assert_eq!(alias::snapshot(), vec!["a".to_owned(), "b".to_owned()]);
}

#[test]
fn version_header_goes_first() {
    let mut bytes = Vec::new();
    write_version(&mut bytes).unwrap();
    write_token(&mut bytes, &Value::from(5u8)).unwrap();
    assert_eq!(bytes[0], 0x10);
    assert_eq!(
        read_file(&mut Cursor::new(bytes)).unwrap(),
        Value::from(5u8)
    );
}
