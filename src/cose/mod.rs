//! COSE envelope structures layered on the byte codec.
//!
//! Each of the six tagged message structures shares the same skeleton: a
//! protected header carried as the byte-string encoding of its map, an
//! unprotected header carried as a plain map, and a message-specific tail.
//! The helpers here implement that shared skeleton once; the per-message
//! modules only describe their tail fields.
//!
//! No cryptography happens here. Signatures, tags, and ciphertexts are
//! carried as opaque bytes; the caller computes and verifies them.

mod encrypt;
mod header;
mod key;
mod mac;
mod sign;

pub use encrypt::{CoseEncrypt, CoseEncrypt0, CoseRecipient};
pub use header::{check_protected, label, Algorithm, HeaderMap};
pub use key::{param, CoseKey};
pub use mac::{CoseMac, CoseMac0, CoseMacRecipient};
pub use sign::{CoseSign, CoseSign1, CoseSignature};

use crate::decode::{read_typed_map, read_value};
use crate::encode::encode_value;
use crate::error::{Error, Result};
use crate::value::Value;

// Validate a protected header and serialize it into its standalone byte
// string, ready to sit at field 0 of a layer.
pub(crate) fn protected_to_value(header: &HeaderMap) -> Result<Value> {
    check_protected(header)?;
    let bytes = encode_value(&Value::Map(header.clone()))?;
    Ok(Value::Binary(bytes))
}

// Field 0 of a layer: a byte string whose content is the encoded protected
// header map, nothing more. The map is decoded back out and re-validated.
pub(crate) fn protected_from_value(value: &Value) -> Result<HeaderMap> {
    let bytes = value.as_slice().ok_or_else(|| {
        Error::FailValidate("Protected header must be carried as a byte string".to_string())
    })?;
    let (map, consumed) = read_typed_map(bytes, 0, |_| true, |_| true)?;
    if consumed != bytes.len() {
        return Err(Error::FailValidate(
            "Protected header has trailing bytes".to_string(),
        ));
    }
    check_protected(&map)?;
    Ok(map)
}

// Field 1 of a layer: the unprotected header, accepted as-is.
pub(crate) fn unprotected_from_value(value: &Value) -> Result<HeaderMap> {
    value.as_map().cloned().ok_or_else(|| {
        Error::FailValidate("Unprotected header must be a map".to_string())
    })
}

pub(crate) fn payload_to_value(payload: &Option<Vec<u8>>) -> Value {
    match payload {
        None => Value::Null,
        Some(b) => Value::Binary(b.clone()),
    }
}

// A payload slot holds either a byte string or null (detached payload).
pub(crate) fn payload_from_value(value: &Value) -> Result<Option<Vec<u8>>> {
    match value {
        Value::Null => Ok(None),
        Value::Binary(b) => Ok(Some(b.clone())),
        other => Err(Error::FailValidate(format!(
            "Payload must be a byte string or null, got {:?}",
            other
        ))),
    }
}

// A required byte-string field, like a signature or ciphertext.
pub(crate) fn bytes_from_value(value: &Value, what: &'static str) -> Result<Vec<u8>> {
    value.as_slice().map(|b| b.to_vec()).ok_or_else(|| {
        Error::FailValidate(format!("{} must be a byte string", what))
    })
}

// Wrap a field array in the envelope's tag and emit it.
pub(crate) fn encode_envelope(tag: u64, fields: Vec<Value>) -> Result<Vec<u8>> {
    encode_value(&Value::Tagged(tag, Box::new(Value::Array(fields))))
}

// Decode the first item, require the expected tag, and require an array of
// the envelope's arity.
pub(crate) fn decode_envelope(buf: &[u8], tag: u64, arity: usize) -> Result<Vec<Value>> {
    let (value, _) = read_value(buf, 0)?;
    let (actual, inner) = match value {
        Value::Tagged(actual, inner) => (actual, *inner),
        _ => {
            return Err(Error::TagMismatch {
                expected: tag,
                actual: None,
            })
        }
    };
    if actual != tag {
        return Err(Error::TagMismatch {
            expected: tag,
            actual: Some(actual),
        });
    }
    let fields = match inner {
        Value::Array(fields) => fields,
        _ => {
            return Err(Error::FailValidate(
                "Envelope content must be an array".to_string(),
            ))
        }
    };
    if fields.len() != arity {
        return Err(Error::FailValidate(format!(
            "Envelope array must have {} fields, got {}",
            arity,
            fields.len()
        )));
    }
    Ok(fields)
}

// One nested signature or recipient: [protected bstr, unprotected map,
// terminal bstr], with its own protected-header validation.
pub(crate) fn layer_to_value(
    protected: &HeaderMap,
    unprotected: &HeaderMap,
    terminal: &[u8],
) -> Result<Value> {
    Ok(Value::Array(vec![
        protected_to_value(protected)?,
        Value::Map(unprotected.clone()),
        Value::Binary(terminal.to_vec()),
    ]))
}

pub(crate) fn layer_from_value(
    value: &Value,
    what: &'static str,
) -> Result<(HeaderMap, HeaderMap, Vec<u8>)> {
    let fields = value
        .as_array()
        .ok_or_else(|| Error::FailValidate(format!("{} must be an array", what)))?;
    if fields.len() != 3 {
        return Err(Error::FailValidate(format!(
            "{} must have 3 fields, got {}",
            what,
            fields.len()
        )));
    }
    Ok((
        protected_from_value(&fields[0])?,
        unprotected_from_value(&fields[1])?,
        bytes_from_value(&fields[2], what)?,
    ))
}
