//! Tests of the pull-style cursor: typed openers, iteration, peeking
//! and its position-isolation guarantee.

use enbt_core::value::Value;
use enbt_core::TypeClass;
use enbt_parser::cursor::ValueReadStream;
use enbt_parser::read::Error;
use enbt_parser::write::write_token;
use std::io::Cursor;

fn stream_of(value: &Value) -> Cursor<Vec<u8>> {
    let mut bytes = Vec::new();
    write_token(&mut bytes, value).unwrap();
    Cursor::new(bytes)
}

fn sample_tree() -> Value {
    let mut root = Value::compound();
    root.insert("greet", Value::from("hi")).unwrap();
    root.insert("n", Value::from(7i32)).unwrap();
    root.insert(
        "xs",
        Value::array((0..6).map(|i| Value::from(i as u32)).collect()).unwrap(),
    )
    .unwrap();
    root.insert("samples", Value::from(&[-5i16, 0, 5, 500][..]))
        .unwrap();
    root.insert(
        "flags",
        Value::array(
            [true, false, true, true, false, false, false, false, true]
                .iter()
                .map(|&b| Value::bit(b))
                .collect(),
        )
        .unwrap(),
    )
    .unwrap();
    root
}

#[test]
fn cursor_reads_and_descriptor_matches() {
    let value = Value::from(42u16);
    let mut source = stream_of(&value);
    let mut cursor = ValueReadStream::new(&mut source).unwrap();
    assert_eq!(cursor.descriptor(), value.descriptor());
    assert_eq!(cursor.read().unwrap(), value);

    // the value is final once consumed
    assert!(matches!(
        cursor.read(),
        Err(Error::AlreadyConsumed { .. })
    ));
}

#[test]
fn compound_cursor_reads_every_entry() {
    let mut source = stream_of(&sample_tree());
    let mut cursor = ValueReadStream::new(&mut source).unwrap();
    let mut compound = cursor.read_compound().unwrap();
    assert_eq!(compound.size(), 5);

    let mut seen = Vec::new();
    while compound.current_index() < compound.size() {
        let (name, value) = compound.read_one().unwrap();
        seen.push((name, value.type_class()));
    }
    seen.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        seen,
        [
            ("flags".to_owned(), TypeClass::Array),
            ("greet".to_owned(), TypeClass::SArray),
            ("n".to_owned(), TypeClass::Integer),
            ("samples".to_owned(), TypeClass::SArray),
            ("xs".to_owned(), TypeClass::Array),
        ]
    );
}

#[test]
fn compound_peek_does_not_disturb_sequential_reads() {
    let mut source = stream_of(&sample_tree());
    let mut cursor = ValueReadStream::new(&mut source).unwrap();
    let mut compound = cursor.read_compound().unwrap();

    let n = compound.peek_at("n").unwrap();
    assert_eq!(n.to_int::<i32>().unwrap(), 7);
    // a failing peek also restores the position
    assert!(matches!(
        compound.peek_at("absent"),
        Err(Error::KeyNotFound { .. })
    ));

    // sequential reading still sees every entry
    let mut count = 0;
    while compound.current_index() < compound.size() {
        compound.read_one().unwrap();
        count += 1;
    }
    assert_eq!(count, 5);
}

#[test]
fn array_cursor_reads_elements_and_peeks() {
    let array = Value::array((0..6).map(|i| Value::from(i as u32 * 3)).collect()).unwrap();
    let mut source = stream_of(&array);
    let mut cursor = ValueReadStream::new(&mut source).unwrap();
    let mut elements = cursor.read_array().unwrap();
    assert_eq!(elements.size(), 6);

    assert_eq!(elements.peek_at(4).unwrap(), Value::from(12u32));
    assert_eq!(elements.read_one().unwrap(), Value::from(0u32));
    assert_eq!(elements.read_one().unwrap(), Value::from(3u32));
    // peeking between sequential reads keeps the position
    assert_eq!(elements.peek_at(0).unwrap(), Value::from(0u32));
    assert_eq!(elements.read_one().unwrap(), Value::from(6u32));
    assert!(matches!(
        elements.peek_at(6),
        Err(Error::OutOfRange { index: 6, len: 6, .. })
    ));
}

#[test]
fn bit_array_cursor_recovers_every_bit() {
    let bits = [true, false, true, true, false, false, false, false, true];
    let array = Value::array(bits.iter().map(|&b| Value::bit(b)).collect()).unwrap();
    let mut source = stream_of(&array);
    let mut cursor = ValueReadStream::new(&mut source).unwrap();
    let mut elements = cursor.read_array().unwrap();

    for (i, &expected) in bits.iter().enumerate() {
        assert_eq!(elements.peek_at(i as u64).unwrap(), Value::bit(expected));
    }
    for &expected in &bits {
        assert_eq!(elements.read_one().unwrap(), Value::bit(expected));
    }
}

#[test]
fn sarray_cursor_is_typed() {
    let value = Value::from(&[-5i16, 0, 5, 500][..]);
    let mut source = stream_of(&value);
    let mut cursor = ValueReadStream::new(&mut source).unwrap();
    let mut elements = cursor.read_sarray::<i16>().unwrap();
    assert_eq!(elements.size(), 4);
    assert_eq!(elements.peek_at(3).unwrap(), 500);
    assert_eq!(elements.read_all().unwrap(), vec![-5, 0, 5, 500]);

    // a mismatching element type is rejected upfront
    let mut source = stream_of(&value);
    let mut cursor = ValueReadStream::new(&mut source).unwrap();
    assert!(matches!(
        cursor.read_sarray::<u32>(),
        Err(Error::UnexpectedClass { .. })
    ));
}

#[test]
fn darray_cursor_handles_self_describing_elements() {
    let value = Value::darray(vec![
        Value::from("x"),
        Value::from(1u8),
        Value::optional(None),
    ]);
    let mut source = stream_of(&value);
    let mut cursor = ValueReadStream::new(&mut source).unwrap();
    let mut elements = cursor.read_darray().unwrap();
    assert_eq!(elements.size(), 3);
    assert_eq!(elements.peek_at(1).unwrap(), Value::from(1u8));
    assert_eq!(elements.read_all().unwrap().len(), 3);
}

#[test]
fn iterate_fires_size_then_items() {
    let array = Value::array((0..4).map(|i| Value::from(i as u8)).collect()).unwrap();
    let mut source = stream_of(&array);
    let mut cursor = ValueReadStream::new(&mut source).unwrap();

    let mut announced = 0;
    let mut collected = Vec::new();
    cursor
        .iterate(
            |size| announced = size,
            |item| {
                collected.push(item.read()?);
                Ok(())
            },
        )
        .unwrap();
    assert_eq!(announced, 4);
    assert_eq!(collected.len(), 4);
}

#[test]
fn iterate_skips_unconsumed_items() {
    let value = Value::darray(vec![Value::from("a"), Value::from("b"), Value::from("c")]);
    let mut bytes = Vec::new();
    write_token(&mut bytes, &value).unwrap();
    let encoded = bytes.len() as u64;
    let mut source = Cursor::new(bytes);

    let mut cursor = ValueReadStream::new(&mut source).unwrap();
    // only look at descriptors, never read the payloads
    cursor
        .iterate(|_| {}, |item| {
            assert_eq!(item.descriptor().class, TypeClass::SArray);
            Ok(())
        })
        .unwrap();
    assert_eq!(source.position(), encoded);
}

#[test]
fn blind_iterate_dispatches_by_class() {
    let mut compound_names = Vec::new();
    let mut source = stream_of(&sample_tree());
    let mut cursor = ValueReadStream::new(&mut source).unwrap();
    cursor
        .blind_iterate(
            |_| {},
            |name, value| {
                compound_names.push(name.to_owned());
                value.skip()
            },
            |_item| panic!("compound entries must go to the entry callback"),
        )
        .unwrap();
    compound_names.sort();
    assert_eq!(compound_names, ["flags", "greet", "n", "samples", "xs"]);

    let mut items = 0;
    let mut source = stream_of(&Value::from(&[1u8, 2, 3][..]));
    let mut cursor = ValueReadStream::new(&mut source).unwrap();
    cursor
        .blind_iterate(
            |_| {},
            |_, _| panic!("sarray elements must go to the item callback"),
            |item| {
                items += 1;
                item.skip()
            },
        )
        .unwrap();
    assert_eq!(items, 3);
}

#[test]
fn log_items_wrap_inner_tokens() {
    let value = Value::log_item(Value::from("journal line"));
    let mut source = stream_of(&value);
    let mut cursor = ValueReadStream::new(&mut source).unwrap();
    let mut inner = cursor.read_log_item().unwrap();
    assert_eq!(inner.read().unwrap(), Value::from("journal line"));

    // skipping a log item does not decode the wrapped token
    let mut source = stream_of(&value);
    let mut cursor = ValueReadStream::new(&mut source).unwrap();
    cursor.skip().unwrap();
}

#[test]
fn peek_at_restores_position_on_success_and_failure() {
    let mut source = stream_of(&sample_tree());
    let mut cursor = ValueReadStream::new(&mut source).unwrap();

    let n = cursor.peek_at("n", |inner| inner.read()).unwrap();
    assert_eq!(n.to_int::<i32>().unwrap(), 7);

    assert!(matches!(
        cursor.peek_at("absent", |inner| inner.read()),
        Err(Error::KeyNotFound { .. })
    ));

    // the cursor value is still unconsumed and fully readable
    let tree = cursor.read().unwrap();
    assert_eq!(tree, sample_tree());
}

#[test]
fn peek_at_index_into_bit_arrays() {
    let bits = [true, false, true, true, false, false, false, false, true];
    let array = Value::array(bits.iter().map(|&b| Value::bit(b)).collect()).unwrap();
    let mut source = stream_of(&array);
    let mut cursor = ValueReadStream::new(&mut source).unwrap();
    for (i, &expected) in bits.iter().enumerate() {
        let bit = cursor
            .peek_at(i as u64, |inner| inner.read())
            .unwrap();
        assert_eq!(bit, Value::bit(expected), "bit {}", i);
    }
    assert_eq!(cursor.read().unwrap(), array);
}

#[test]
fn peek_size_reports_counts_without_consuming() {
    let mut source = stream_of(&sample_tree());
    let mut cursor = ValueReadStream::new(&mut source).unwrap();
    assert_eq!(cursor.peek_size().unwrap(), 5);
    assert_eq!(cursor.read().unwrap(), sample_tree());
}
