use super::{
    bytes_from_value, decode_envelope, encode_envelope, layer_from_value, layer_to_value,
    payload_from_value, payload_to_value, protected_from_value, protected_to_value,
    unprotected_from_value, HeaderMap,
};
use crate::error::{Error, Result};
use crate::value::Value;

/// A single-signer signature message (`COSE_Sign1`, tag 18).
///
/// The signature bytes are opaque to this library; computing and verifying
/// them is the caller's concern.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CoseSign1 {
    pub protected: HeaderMap,
    pub unprotected: HeaderMap,
    /// The signed payload, or `None` when it travels detached.
    pub payload: Option<Vec<u8>>,
    pub signature: Vec<u8>,
}

impl CoseSign1 {
    pub const TAG: u64 = 18;

    /// Encode to bytes, validating the protected header first.
    ///
    /// # Errors
    ///
    /// Fails if the protected header is missing `alg` or names an
    /// unregistered algorithm, or on any byte-codec failure.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let fields = vec![
            protected_to_value(&self.protected)?,
            Value::Map(self.unprotected.clone()),
            payload_to_value(&self.payload),
            Value::Binary(self.signature.clone()),
        ];
        encode_envelope(Self::TAG, fields)
    }

    /// Decode from bytes, requiring tag 18 and re-validating the protected
    /// header.
    ///
    /// # Errors
    ///
    /// Fails on a tag mismatch, a malformed field, a protected header that
    /// doesn't validate, or any byte-codec failure.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let fields = decode_envelope(buf, Self::TAG, 4)?;
        Ok(Self {
            protected: protected_from_value(&fields[0])?,
            unprotected: unprotected_from_value(&fields[1])?,
            payload: payload_from_value(&fields[2])?,
            signature: bytes_from_value(&fields[3], "Signature")?,
        })
    }
}

/// One signer's entry in a [`CoseSign`] message.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CoseSignature {
    pub protected: HeaderMap,
    pub unprotected: HeaderMap,
    pub signature: Vec<u8>,
}

/// A multi-signer signature message (`COSE_Sign`, tag 98).
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CoseSign {
    pub protected: HeaderMap,
    pub unprotected: HeaderMap,
    pub payload: Option<Vec<u8>>,
    pub signatures: Vec<CoseSignature>,
}

impl CoseSign {
    pub const TAG: u64 = 98;

    /// Encode to bytes. The outer protected header and every signer's
    /// protected header must validate.
    ///
    /// # Errors
    ///
    /// Fails if any protected header is missing `alg` or names an
    /// unregistered algorithm, or on any byte-codec failure.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let signatures = self
            .signatures
            .iter()
            .map(|sig| layer_to_value(&sig.protected, &sig.unprotected, &sig.signature))
            .collect::<Result<Vec<Value>>>()?;
        let fields = vec![
            protected_to_value(&self.protected)?,
            Value::Map(self.unprotected.clone()),
            payload_to_value(&self.payload),
            Value::Array(signatures),
        ];
        encode_envelope(Self::TAG, fields)
    }

    /// Decode from bytes, requiring tag 98 and re-validating every protected
    /// header, the outer one and each signer's.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let fields = decode_envelope(buf, Self::TAG, 4)?;
        let signatures = fields[3]
            .as_array()
            .ok_or_else(|| Error::FailValidate("Signature list must be an array".to_string()))?
            .iter()
            .map(|entry| {
                let (protected, unprotected, signature) = layer_from_value(entry, "Signature")?;
                Ok(CoseSignature {
                    protected,
                    unprotected,
                    signature,
                })
            })
            .collect::<Result<Vec<CoseSignature>>>()?;
        Ok(Self {
            protected: protected_from_value(&fields[0])?,
            unprotected: unprotected_from_value(&fields[1])?,
            payload: payload_from_value(&fields[2])?,
            signatures,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cose::{label, Algorithm};
    use crate::decode::read_value;
    use crate::value::Key;

    fn protected(alg: Algorithm) -> HeaderMap {
        let mut header = HeaderMap::new();
        header.insert(Key::from(label::ALG), Value::from(alg));
        header
    }

    #[test]
    fn sign1_wire_shape() {
        let msg = CoseSign1 {
            protected: protected(Algorithm::ES256),
            unprotected: HeaderMap::new(),
            payload: None,
            signature: vec![1, 2, 3, 4],
        };
        let enc = msg.encode().unwrap();
        let (value, _) = read_value(&enc, 0).unwrap();
        let (tag, inner) = value.as_tagged().expect("top level should be tagged");
        assert_eq!(tag, 18);
        let fields = inner.as_array().expect("inner item should be an array");
        assert_eq!(fields.len(), 4);
        // Field 0 is the byte-string encoding of {1: -7}
        assert_eq!(fields[0].as_slice(), Some(&[0xa1, 0x01, 0x26][..]));
        assert_eq!(fields[1].as_map().map(|m| m.len()), Some(0));
        assert!(fields[2].is_null());
        assert_eq!(fields[3].as_slice(), Some(&[1u8, 2, 3, 4][..]));

        let dec = CoseSign1::decode(&enc).expect("decoding should have worked");
        assert!(msg == dec, "Encode->Decode should yield the same message");
    }

    #[test]
    fn sign1_missing_alg() {
        let msg = CoseSign1 {
            protected: HeaderMap::new(),
            ..Default::default()
        };
        let err = msg.encode().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Protected header must contain 'alg' parameter"
        );
    }

    #[test]
    fn sign1_unregistered_alg() {
        let mut header = HeaderMap::new();
        header.insert(Key::from(label::ALG), Value::from(999));
        let msg = CoseSign1 {
            protected: header,
            ..Default::default()
        };
        let err = msg.encode().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid or unsupported algorithm in protected header"
        );
    }

    #[test]
    fn sign1_tag_discrimination() {
        let msg = CoseSign1 {
            protected: protected(Algorithm::ES256),
            payload: Some(b"hello".to_vec()),
            signature: vec![9; 64],
            ..Default::default()
        };
        let enc = msg.encode().unwrap();
        let err = CoseSign::decode(&enc).unwrap_err();
        assert_eq!(
            err,
            Error::TagMismatch {
                expected: 98,
                actual: Some(18)
            },
            "a Sign1 buffer must not decode as Sign"
        );
    }

    #[test]
    fn sign_roundtrip() {
        let mut unprotected = HeaderMap::new();
        unprotected.insert(Key::from(label::KID), Value::from(&b"signer-2"[..]));
        let msg = CoseSign {
            protected: protected(Algorithm::ES256),
            unprotected: HeaderMap::new(),
            payload: Some(b"payload".to_vec()),
            signatures: vec![
                CoseSignature {
                    protected: protected(Algorithm::ES384),
                    unprotected: HeaderMap::new(),
                    signature: vec![0xaa; 96],
                },
                CoseSignature {
                    protected: protected(Algorithm::EdDSA),
                    unprotected,
                    signature: vec![0xbb; 64],
                },
            ],
        };
        let enc = msg.encode().unwrap();
        let dec = CoseSign::decode(&enc).expect("decoding should have worked");
        assert!(msg == dec, "Encode->Decode should yield the same message");
        let enc2 = dec.encode().unwrap();
        assert!(
            enc == enc2,
            "Encode->Decode->Encode didn't yield identical results"
        );
    }

    #[test]
    fn sign_rejects_bad_signer_header() {
        let msg = CoseSign {
            protected: protected(Algorithm::ES256),
            signatures: vec![CoseSignature::default()],
            ..Default::default()
        };
        let err = msg.encode().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Protected header must contain 'alg' parameter",
            "per-signer headers are validated too"
        );
    }

    #[test]
    fn sign1_rejects_wrong_field_type() {
        // Tag 18 around [bstr, {}, null, "text"] - signature must be bytes
        let value = Value::tag(
            18,
            Value::Array(vec![
                Value::Binary(vec![0xa1, 0x01, 0x26]),
                Value::Map(Default::default()),
                Value::Null,
                Value::from("text"),
            ]),
        );
        let enc = crate::encode::encode_value(&value).unwrap();
        assert!(matches!(
            CoseSign1::decode(&enc),
            Err(Error::FailValidate(_))
        ));
    }

    #[test]
    fn sign1_rejects_wrong_arity() {
        let value = Value::tag(
            18,
            Value::Array(vec![
                Value::Binary(vec![0xa1, 0x01, 0x26]),
                Value::Map(Default::default()),
                Value::Null,
            ]),
        );
        let enc = crate::encode::encode_value(&value).unwrap();
        assert!(matches!(
            CoseSign1::decode(&enc),
            Err(Error::FailValidate(_))
        ));
    }
}
