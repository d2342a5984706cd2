use crate::depth_tracking::DepthTracker;
use crate::element::{serialize_elem, Element};
use crate::error::{Error, Result};
use crate::value::{Key, Value};
use crate::MAX_SIZE;

/// Encode an item to a fresh byte vector.
///
/// Map entries are emitted in the deterministic key order ([`Key`]'s
/// ordering), so two structurally equal items always produce identical bytes
/// no matter how their maps were built.
///
/// # Errors
///
/// Fails on integers outside the safe interchange range, containers over the
/// element ceiling, nesting past the depth ceiling, or output over the
/// maximum allowed size.
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut depth = DepthTracker::new();
    write_value(&mut buf, &mut depth, value)?;
    if buf.len() > MAX_SIZE {
        return Err(Error::LengthTooLong {
            max: MAX_SIZE,
            actual: buf.len(),
        });
    }
    Ok(buf)
}

fn write_elem(buf: &mut Vec<u8>, depth: &mut DepthTracker, elem: Element) -> Result<()> {
    depth.track(&elem)?;
    serialize_elem(buf, elem)
}

fn write_value(buf: &mut Vec<u8>, depth: &mut DepthTracker, value: &Value) -> Result<()> {
    match value {
        Value::Null => write_elem(buf, depth, Element::Null)?,
        Value::Undefined => write_elem(buf, depth, Element::Undefined)?,
        Value::Boolean(v) => write_elem(buf, depth, Element::Bool(*v))?,
        Value::Integer(v) => write_elem(buf, depth, Element::Int(*v))?,
        Value::F64(v) => write_elem(buf, depth, Element::F64(*v))?,
        Value::String(v) => write_elem(buf, depth, Element::Str(v))?,
        Value::Binary(v) => write_elem(buf, depth, Element::Bin(v))?,
        Value::Array(v) => {
            write_elem(buf, depth, Element::Array(v.len()))?;
            for item in v {
                write_value(buf, depth, item)?;
            }
        }
        Value::Map(v) => {
            write_elem(buf, depth, Element::Map(v.len()))?;
            // BTreeMap iteration is already in the deterministic key order
            for (key, item) in v {
                match key {
                    Key::Int(i) => write_elem(buf, depth, Element::Int(*i))?,
                    Key::Str(s) => write_elem(buf, depth, Element::Str(s))?,
                }
                write_value(buf, depth, item)?;
            }
        }
        Value::Tagged(tag, inner) => {
            write_elem(buf, depth, Element::Tag(*tag))?;
            write_value(buf, depth, inner)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn scalar_bytes() {
        assert_eq!(encode_value(&Value::from(0u8)).unwrap(), &[0x00]);
        assert_eq!(encode_value(&Value::from(-1)).unwrap(), &[0x20]);
        assert_eq!(encode_value(&Value::from("")).unwrap(), &[0x60]);
        assert_eq!(encode_value(&Value::from("a")).unwrap(), &[0x61, 0x61]);
        assert_eq!(encode_value(&Value::Null).unwrap(), &[0xf6]);
    }

    #[test]
    fn floats_always_binary64() {
        let enc = encode_value(&Value::from(1.0)).unwrap();
        assert_eq!(
            enc,
            &[0xfb, 0x3f, 0xf0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn map_key_order() {
        // Keys emit sorted by their decimal-string form: -1, 1, 10, 9, "alg"
        let mut map = BTreeMap::new();
        map.insert(Key::from("alg"), Value::from(4u8));
        map.insert(Key::from(9), Value::from(3u8));
        map.insert(Key::from(1), Value::from(1u8));
        map.insert(Key::from(10), Value::from(2u8));
        map.insert(Key::from(-1), Value::from(0u8));
        let enc = encode_value(&Value::Map(map)).unwrap();
        assert_eq!(
            enc,
            &[
                0xa5, // map of 5
                0x20, 0x00, // -1: 0
                0x01, 0x01, // 1: 1
                0x0a, 0x02, // 10: 2
                0x09, 0x03, // 9: 3
                0x63, 0x61, 0x6c, 0x67, 0x04, // "alg": 4
            ]
        );
    }

    #[test]
    fn deterministic_across_insert_order() {
        let mut a = BTreeMap::new();
        a.insert(Key::from(3), Value::from("x"));
        a.insert(Key::from("b"), Value::from("y"));
        a.insert(Key::from(-2), Value::from("z"));
        let mut b = BTreeMap::new();
        b.insert(Key::from("b"), Value::from("y"));
        b.insert(Key::from(-2), Value::from("z"));
        b.insert(Key::from(3), Value::from("x"));
        assert_eq!(
            encode_value(&Value::Map(a)).unwrap(),
            encode_value(&Value::Map(b)).unwrap(),
            "insertion order must not leak into the encoding"
        );
    }

    #[test]
    fn unsafe_int_refused() {
        let result = encode_value(&Value::from(crate::MAX_SAFE_INT + 1));
        assert!(result.is_err(), "2^53 should be an encoder refusal");
    }

    #[test]
    fn oversized_array_refused() {
        let v = Value::Array(vec![Value::Null; crate::MAX_CONTAINER_LEN + 1]);
        assert!(matches!(
            encode_value(&v),
            Err(Error::ParseLimit(_))
        ));
    }

    #[test]
    fn oversized_output_refused() {
        let v = Value::Binary(vec![0u8; MAX_SIZE + 1]);
        assert!(matches!(
            encode_value(&v),
            Err(Error::LengthTooLong { .. })
        ));
    }

    #[test]
    fn deep_nesting_refused() {
        let mut v = Value::Null;
        for _ in 0..crate::MAX_DEPTH + 1 {
            v = Value::Array(vec![v]);
        }
        assert!(matches!(encode_value(&v), Err(Error::ParseLimit(_))));
    }

    #[test]
    fn tagged() {
        let v = Value::tag(18, Value::from(Vec::<Value>::new()));
        assert_eq!(encode_value(&v).unwrap(), &[0xd2, 0x80]);
    }
}
