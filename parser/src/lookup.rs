//! Sequential search inside containers and path lookup over a stream.
//!
//! These functions walk a token stream without materializing it,
//! skipping over entries that do not match. Only [`get_value_path`]
//! restores the starting position; the other functions deliberately
//! leave the cursor where the search ended.

use crate::read::{
    read_string, read_token, read_value, AliasSnafu, DecodeDataSnafu, KeyNotFoundSnafu,
    OutOfRangeSnafu, PathMismatchSnafu, ReadValueDataSnafu, Result, SeekReaderSnafu,
    UnexpectedClassSnafu,
};
use crate::skip::{fast_index_width, skip_token, skip_value};
use enbt_core::{alias, PathSegment, TypeClass, TypeDescriptor, Value, ValuePath};
use enbt_encoding::{read_define_len, read_descriptor, BasicDecoder};
use snafu::ResultExt;
use std::io::{Read, Seek, SeekFrom};

/// Walk the entries of a compound whose descriptor has already been
/// consumed, looking for `key`.
///
/// On a match the cursor is left just before the matching value's
/// descriptor and `true` is returned. Otherwise every entry is skipped
/// and `false` is returned. For aliased compounds the key is converted
/// through the global alias table; for inline compounds the comparison
/// is byte-exact on the UTF-8 form.
pub fn find_value_compound<S>(
    from: &mut S,
    descriptor: TypeDescriptor,
    key: &str,
) -> Result<bool>
where
    S: Read + Seek,
{
    let count = read_define_len(&mut *from, descriptor).context(DecodeDataSnafu)?;
    if descriptor.signed {
        let wanted = alias::to_alias(key).context(AliasSnafu)?;
        let le = BasicDecoder::le();
        for _ in 0..count {
            let entry = le.decode_u16(&mut *from).context(ReadValueDataSnafu)?;
            if entry == wanted {
                return Ok(true);
            }
            skip_token(from)?;
        }
    } else {
        for _ in 0..count {
            if read_string(from)? == key {
                return Ok(true);
            }
            skip_token(from)?;
        }
    }
    Ok(false)
}

/// Position the cursor at element `index` of an array whose descriptor
/// has already been consumed.
///
/// For homogeneous arrays the element descriptor is returned; the
/// element at the cursor carries no descriptor of its own, and for
/// `Bit` elements the cursor points at the byte containing bit
/// `index % 8`. For darrays the cursor points at a full token and
/// `None` is returned.
pub fn index_array<S>(
    from: &mut S,
    index: u64,
    descriptor: TypeDescriptor,
) -> Result<Option<TypeDescriptor>>
where
    S: Read + Seek,
{
    match descriptor.class {
        TypeClass::Array => {
            let count = read_define_len(&mut *from, descriptor).context(DecodeDataSnafu)?;
            if index >= count {
                return OutOfRangeSnafu { index, len: count }.fail();
            }
            let element = read_descriptor(&mut *from).context(DecodeDataSnafu)?;
            index_static_array(from, index, element)?;
            Ok(Some(element))
        }
        TypeClass::DArray => {
            let count = read_define_len(&mut *from, descriptor).context(DecodeDataSnafu)?;
            if index >= count {
                return OutOfRangeSnafu { index, len: count }.fail();
            }
            for _ in 0..index {
                skip_token(from)?;
            }
            Ok(None)
        }
        class => UnexpectedClassSnafu {
            expected: "array",
            class,
        }
        .fail(),
    }
}

/// Advance past `index` elements of a homogeneous array, assuming the
/// cursor sits right after the element descriptor.
pub(crate) fn index_static_array<S>(from: &mut S, index: u64, element: TypeDescriptor) -> Result<()>
where
    S: Read + Seek,
{
    if element.class == TypeClass::Bit {
        from.seek(SeekFrom::Current((index / 8) as i64))
            .context(SeekReaderSnafu)?;
        return Ok(());
    }
    let width = fast_index_width(element);
    if width != 0 {
        from.seek(SeekFrom::Current((index * width as u64) as i64))
            .context(SeekReaderSnafu)?;
    } else {
        for _ in 0..index {
            skip_value(from, element)?;
        }
    }
    Ok(())
}

/// The string form of a segment, used as a compound key.
fn segment_key(segment: &PathSegment) -> String {
    match segment {
        PathSegment::Name(name) => name.clone(),
        PathSegment::Index(index) => index.to_string(),
    }
}

/// Move the cursor to the value addressed by `path`.
///
/// Returns `false` when a compound along the way has no matching entry
/// or a segment does not fit the container it addresses; the cursor is
/// then left wherever the search stopped. Indexing past the end of an
/// array is an error.
pub fn move_to_value_path<S>(from: &mut S, path: &ValuePath) -> Result<bool>
where
    S: Read + Seek,
{
    let mut pending: Option<TypeDescriptor> = None;
    for segment in path.segments() {
        let descriptor = match pending.take() {
            Some(descriptor) => descriptor,
            None => read_descriptor(&mut *from).context(DecodeDataSnafu)?,
        };
        match (descriptor.class, segment) {
            (TypeClass::Array | TypeClass::DArray, PathSegment::Index(index)) => {
                pending = index_array(from, *index, descriptor)?;
            }
            (TypeClass::Compound, segment) => {
                if !find_value_compound(from, descriptor, &segment_key(segment))? {
                    return Ok(false);
                }
            }
            _ => return Ok(false),
        }
    }
    Ok(true)
}

/// Read the value addressed by `path` without disturbing the stream:
/// the starting position is restored on both success and failure.
///
/// A path landing on an element of a packed bit array yields a `Bit`
/// value holding the selected bit.
pub fn get_value_path<S>(from: &mut S, path: &ValuePath) -> Result<Value>
where
    S: Read + Seek,
{
    let start = from.stream_position().context(SeekReaderSnafu)?;
    let outcome = get_value_path_impl(from, path);
    let restored = from.seek(SeekFrom::Start(start)).context(SeekReaderSnafu);
    match (outcome, restored) {
        (Ok(value), Ok(_)) => Ok(value),
        (Err(e), _) => Err(e),
        (_, Err(e)) => Err(e),
    }
}

fn get_value_path_impl<S>(from: &mut S, path: &ValuePath) -> Result<Value>
where
    S: Read + Seek,
{
    let mut pending: Option<TypeDescriptor> = None;
    let mut pending_bit: Option<u64> = None;
    for segment in path.segments() {
        if pending_bit.is_some() {
            return PathMismatchSnafu {
                segment: segment_key(segment),
                class: TypeClass::Bit,
            }
            .fail();
        }
        let descriptor = match pending.take() {
            Some(descriptor) => descriptor,
            None => read_descriptor(&mut *from).context(DecodeDataSnafu)?,
        };
        match (descriptor.class, segment) {
            (TypeClass::Array | TypeClass::DArray, PathSegment::Index(index)) => {
                match index_array(from, *index, descriptor)? {
                    Some(element) if element.class == TypeClass::Bit => {
                        pending_bit = Some(*index);
                    }
                    element => pending = element,
                }
            }
            (TypeClass::Compound, segment) => {
                let key = segment_key(segment);
                if !find_value_compound(from, descriptor, &key)? {
                    return KeyNotFoundSnafu { key }.fail();
                }
            }
            (class, segment) => {
                return PathMismatchSnafu {
                    segment: segment_key(segment),
                    class,
                }
                .fail();
            }
        }
    }
    if let Some(index) = pending_bit {
        let byte = BasicDecoder::le()
            .decode_u8(&mut *from)
            .context(ReadValueDataSnafu)?;
        return Ok(Value::bit(byte >> (index % 8) & 1 == 1));
    }
    match pending {
        Some(descriptor) => read_value(from, descriptor),
        None => read_token(from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::Error;
    use crate::write::write_token;
    use enbt_core::Value;
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
        let mut inner = Value::compound();
        inner.insert("score", Value::from(1200u32)).unwrap();
        root.insert(
            "players",
            Value::darray(vec![inner, Value::from("spectator")]),
        )
        .unwrap();
        root.insert(
            "flags",
            Value::array((0..9).map(|i| Value::bit(i == 0 || i == 2 || i == 3)).collect())
                .unwrap(),
        )
        .unwrap();
        root
    }

    #[test]
    fn path_lookup_returns_leaf_and_restores_position() {
        let mut stream = stream_of(&sample_tree());
        let value = get_value_path(&mut stream, &ValuePath::parse("n")).unwrap();
        assert_eq!(value, Value::from(7i32));
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn path_lookup_descends_containers() {
        let mut stream = stream_of(&sample_tree());
        let value =
            get_value_path(&mut stream, &ValuePath::parse("players/0/score")).unwrap();
        assert_eq!(value, Value::from(1200u32));
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn path_lookup_selects_single_bits() {
        let mut stream = stream_of(&sample_tree());
        for (i, expected) in [true, false, true, true, false, false, false, false, false]
            .iter()
            .enumerate()
        {
            let path = ValuePath::new().push_name("flags").push_index(i as u64);
            let value = get_value_path(&mut stream, &path).unwrap();
            assert_eq!(value, Value::bit(*expected), "bit {}", i);
            assert_eq!(stream.position(), 0);
        }
    }

    #[test]
    fn missing_keys_fail_and_restore_position() {
        let mut stream = stream_of(&sample_tree());
        assert!(matches!(
            get_value_path(&mut stream, &ValuePath::parse("absent")),
            Err(Error::KeyNotFound { .. })
        ));
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn array_overruns_are_out_of_range() {
        let mut stream = stream_of(&sample_tree());
        assert!(matches!(
            get_value_path(&mut stream, &ValuePath::parse("players/7")),
            Err(Error::OutOfRange { index: 7, len: 2, .. })
        ));
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn move_to_positions_cursor_before_the_value() {
        let mut stream = stream_of(&sample_tree());
        assert!(move_to_value_path(&mut stream, &ValuePath::parse("n")).unwrap());
        let leaf = read_token(&mut stream).unwrap();
        assert_eq!(leaf, Value::from(7i32));

        let mut stream = stream_of(&sample_tree());
        assert!(!move_to_value_path(&mut stream, &ValuePath::parse("absent")).unwrap());
    }

    #[test]
    fn find_value_compound_walks_entries() {
        let mut root = Value::compound();
        root.insert("a", Value::from(1u8)).unwrap();
        root.insert("b", Value::from("two")).unwrap();
        let mut stream = stream_of(&root);
        let descriptor = read_descriptor(&mut stream).unwrap();

        assert!(find_value_compound(&mut stream, descriptor, "b").unwrap());
        assert_eq!(read_token(&mut stream).unwrap(), Value::from("two"));

        let mut stream = stream_of(&root);
        let descriptor = read_descriptor(&mut stream).unwrap();
        assert!(!find_value_compound(&mut stream, descriptor, "zz").unwrap());
    }
}
