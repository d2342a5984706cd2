use std::collections::BTreeMap;

use crate::element::{Element, Parser};
use crate::error::{Error, Result};
use crate::value::{Key, Value};
use crate::{Integer, MAX_SIZE};

// Ceiling and offset checks shared by every decode entry point.
fn check_entry(buf: &[u8], offset: usize) -> Result<()> {
    if buf.len() > MAX_SIZE {
        return Err(Error::LengthTooLong {
            max: MAX_SIZE,
            actual: buf.len(),
        });
    }
    if offset >= buf.len() {
        return Err(Error::LengthTooShort {
            step: "get first item",
            actual: 0,
            expected: 1,
        });
    }
    Ok(())
}

fn next_elem<'a>(parser: &mut Parser<'a>) -> Result<Element<'a>> {
    parser.next().ok_or(Error::LengthTooShort {
        step: "get next item",
        actual: 0,
        expected: 1,
    })?
}

// Pull one whole item off the parser, descending into containers. Recursion
// is bounded by the parser's depth tracking.
fn read_item(parser: &mut Parser) -> Result<Value> {
    let elem = next_elem(parser)?;
    Ok(match elem {
        Element::Null => Value::Null,
        Element::Undefined => Value::Undefined,
        Element::Bool(v) => Value::Boolean(v),
        Element::Int(v) => Value::Integer(v),
        Element::F64(v) => Value::F64(v),
        Element::Str(v) => Value::String(v.to_string()),
        Element::Bin(v) => Value::Binary(v.to_vec()),
        Element::Array(len) => {
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(read_item(parser)?);
            }
            Value::Array(v)
        }
        Element::Map(len) => Value::Map(read_pairs(parser, len)?),
        Element::Tag(tag) => Value::Tagged(tag, Box::new(read_item(parser)?)),
    })
}

fn read_pairs(parser: &mut Parser, len: usize) -> Result<BTreeMap<Key, Value>> {
    let mut map = BTreeMap::new();
    for _ in 0..len {
        let key = match next_elem(parser)? {
            Element::Int(v) => Key::Int(v),
            Element::Str(v) => Key::Str(v.to_string()),
            other => {
                return Err(Error::BadKey(format!(
                    "Expected an integer or text key, got {}",
                    other.name()
                )))
            }
        };
        let value = read_item(parser)?;
        // A later duplicate overwrites the earlier entry
        map.insert(key, value);
    }
    Ok(map)
}

/// Decode the first item at `offset`, returning the item and the offset just
/// past it. Anything after that offset is left for the caller.
///
/// # Errors
///
/// Fails if the buffer is over the maximum allowed size, the offset is out of
/// range, or the item is truncated, malformed, or over a codec limit.
pub fn read_value(buf: &[u8], offset: usize) -> Result<(Value, usize)> {
    check_entry(buf, offset)?;
    let mut parser = Parser::new(&buf[offset..]);
    let value = read_item(&mut parser)?;
    Ok((value, buf.len() - parser.remaining()))
}

/// Decode the first item at `offset`, returning the item and how many bytes
/// it consumed. This is [`read_value`] with the offset delta instead of the
/// absolute position, for callers walking concatenated items.
pub fn read_value_offset(buf: &[u8], offset: usize) -> Result<(Value, usize)> {
    let (value, next) = read_value(buf, offset)?;
    Ok((value, next - offset))
}

/// Decode exactly one map at `offset` into a keyed mapping, returning it and
/// the bytes consumed.
///
/// Text keys whose form is a canonical decimal integer in the safe range are
/// coerced to integer keys. Each coerced key is passed to `key_allowed` and
/// each value to `value_allowed`; the first rejection fails the decode.
///
/// # Errors
///
/// Fails if the item isn't a map, on the first predicate rejection, or on any
/// of the [`read_value`] failure modes.
pub fn read_typed_map<K, V>(
    buf: &[u8],
    offset: usize,
    key_allowed: K,
    value_allowed: V,
) -> Result<(BTreeMap<Key, Value>, usize)>
where
    K: Fn(&Key) -> bool,
    V: Fn(&Value) -> bool,
{
    check_entry(buf, offset)?;
    let mut parser = Parser::new(&buf[offset..]);
    let len = match next_elem(&mut parser)? {
        Element::Map(len) => len,
        other => {
            return Err(Error::FailValidate(format!(
                "Expected a map, got {}",
                other.name()
            )))
        }
    };
    let mut map = BTreeMap::new();
    for _ in 0..len {
        let key = match next_elem(&mut parser)? {
            Element::Int(v) => Key::Int(v),
            Element::Str(v) => coerce_key(v),
            other => {
                return Err(Error::BadKey(format!(
                    "Expected an integer or text key, got {}",
                    other.name()
                )))
            }
        };
        if !key_allowed(&key) {
            return Err(Error::BadKey(format!("Key {} isn't permitted here", key)));
        }
        let value = read_item(&mut parser)?;
        if !value_allowed(&value) {
            return Err(Error::FailValidate(format!(
                "Value for key {} isn't permitted here",
                key
            )));
        }
        map.insert(key, value);
    }
    Ok((map, buf.len() - parser.remaining() - offset))
}

// Turn a text key into an integer key when its text form is exactly the
// decimal rendering of a safe-range integer. "007" and "+5" stay text.
fn coerce_key(text: &str) -> Key {
    if let Ok(v) = text.parse::<i64>() {
        let int = Integer::from(v);
        if int.is_safe() && int.to_string() == text {
            return Key::Int(int);
        }
    }
    Key::Str(text.to_string())
}
