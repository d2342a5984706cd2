use super::{
    bytes_from_value, decode_envelope, encode_envelope, layer_from_value, layer_to_value,
    payload_from_value, payload_to_value, protected_from_value, protected_to_value,
    unprotected_from_value, HeaderMap,
};
use crate::error::{Error, Result};
use crate::value::Value;

/// A MAC message with an implicit key (`COSE_Mac0`, tag 17).
///
/// `tag` holds the authentication tag bytes, carried opaquely.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CoseMac0 {
    pub protected: HeaderMap,
    pub unprotected: HeaderMap,
    /// The authenticated payload, or `None` when it travels detached.
    pub payload: Option<Vec<u8>>,
    pub tag: Vec<u8>,
}

impl CoseMac0 {
    pub const TAG: u64 = 17;

    /// Encode to bytes, validating the protected header first.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let fields = vec![
            protected_to_value(&self.protected)?,
            Value::Map(self.unprotected.clone()),
            payload_to_value(&self.payload),
            Value::Binary(self.tag.clone()),
        ];
        encode_envelope(Self::TAG, fields)
    }

    /// Decode from bytes, requiring tag 17 and re-validating the protected
    /// header.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let fields = decode_envelope(buf, Self::TAG, 4)?;
        Ok(Self {
            protected: protected_from_value(&fields[0])?,
            unprotected: unprotected_from_value(&fields[1])?,
            payload: payload_from_value(&fields[2])?,
            tag: bytes_from_value(&fields[3], "Authentication tag")?,
        })
    }
}

/// One recipient's entry in a [`CoseMac`] message.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CoseMacRecipient {
    pub protected: HeaderMap,
    pub unprotected: HeaderMap,
    pub tag: Vec<u8>,
}

/// A multi-recipient MAC message (`COSE_Mac`, tag 97).
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CoseMac {
    pub protected: HeaderMap,
    pub unprotected: HeaderMap,
    pub payload: Option<Vec<u8>>,
    pub recipients: Vec<CoseMacRecipient>,
}

impl CoseMac {
    pub const TAG: u64 = 97;

    /// Encode to bytes. The outer protected header and every recipient's
    /// protected header must validate.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let recipients = self
            .recipients
            .iter()
            .map(|r| layer_to_value(&r.protected, &r.unprotected, &r.tag))
            .collect::<Result<Vec<Value>>>()?;
        let fields = vec![
            protected_to_value(&self.protected)?,
            Value::Map(self.unprotected.clone()),
            payload_to_value(&self.payload),
            Value::Array(recipients),
        ];
        encode_envelope(Self::TAG, fields)
    }

    /// Decode from bytes, requiring tag 97 and re-validating every protected
    /// header, the outer one and each recipient's.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let fields = decode_envelope(buf, Self::TAG, 4)?;
        let recipients = fields[3]
            .as_array()
            .ok_or_else(|| Error::FailValidate("Recipient list must be an array".to_string()))?
            .iter()
            .map(|entry| {
                let (protected, unprotected, tag) = layer_from_value(entry, "Recipient")?;
                Ok(CoseMacRecipient {
                    protected,
                    unprotected,
                    tag,
                })
            })
            .collect::<Result<Vec<CoseMacRecipient>>>()?;
        Ok(Self {
            protected: protected_from_value(&fields[0])?,
            unprotected: unprotected_from_value(&fields[1])?,
            payload: payload_from_value(&fields[2])?,
            recipients,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cose::{label, Algorithm};
    use crate::value::Key;

    fn protected(alg: Algorithm) -> HeaderMap {
        let mut header = HeaderMap::new();
        header.insert(Key::from(label::ALG), Value::from(alg));
        header
    }

    #[test]
    fn mac0_roundtrip() {
        let msg = CoseMac0 {
            protected: protected(Algorithm::HMAC_256_256),
            unprotected: HeaderMap::new(),
            payload: Some(b"authenticated".to_vec()),
            tag: vec![0x11; 32],
        };
        let enc = msg.encode().unwrap();
        let dec = CoseMac0::decode(&enc).expect("decoding should have worked");
        assert!(msg == dec, "Encode->Decode should yield the same message");
    }

    #[test]
    fn mac_two_recipients_roundtrip() {
        let mut kid1 = HeaderMap::new();
        kid1.insert(Key::from(label::KID), Value::from(&b"recipient-1"[..]));
        let mut kid2 = HeaderMap::new();
        kid2.insert(Key::from(label::KID), Value::from(&b"recipient-2"[..]));
        let msg = CoseMac {
            protected: protected(Algorithm::HMAC_256_256),
            unprotected: HeaderMap::new(),
            payload: Some(b"shared".to_vec()),
            recipients: vec![
                CoseMacRecipient {
                    protected: protected(Algorithm::HMAC_384_384),
                    unprotected: kid1,
                    tag: vec![0x22; 48],
                },
                CoseMacRecipient {
                    protected: protected(Algorithm::HMAC_512_512),
                    unprotected: kid2,
                    tag: vec![0x33; 64],
                },
            ],
        };
        let enc = msg.encode().unwrap();
        let dec = CoseMac::decode(&enc).expect("decoding should have worked");
        assert!(msg == dec, "Encode->Decode should yield the same message");
        assert_eq!(dec.recipients.len(), 2);
        assert_eq!(
            dec.recipients[0]
                .protected
                .get(&Key::from(label::ALG))
                .and_then(|v| v.as_i64()),
            Some(Algorithm::HMAC_384_384.into_i64()),
            "recipient headers should survive the round trip"
        );
    }

    #[test]
    fn mac_recipient_header_revalidated_on_decode() {
        // Hand-build a Mac whose recipient protected header is valid CBOR but
        // fails validation: {1: 999}
        let recipient_protected =
            crate::encode::encode_value(&Value::Map(HeaderMap::from_iter([(
                Key::from(label::ALG),
                Value::from(999),
            )])))
            .unwrap();
        let value = Value::tag(
            97,
            Value::Array(vec![
                Value::Binary(vec![0xa1, 0x01, 0x05]), // {1: 5}
                Value::Map(HeaderMap::new()),
                Value::Null,
                Value::Array(vec![Value::Array(vec![
                    Value::Binary(recipient_protected),
                    Value::Map(HeaderMap::new()),
                    Value::Binary(vec![0x44; 32]),
                ])]),
            ]),
        );
        let enc = crate::encode::encode_value(&value).unwrap();
        let err = CoseMac::decode(&enc).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid or unsupported algorithm in protected header",
            "recipient protected headers are validated on decode"
        );
    }

    #[test]
    fn mac0_tag_discrimination() {
        let msg = CoseMac0 {
            protected: protected(Algorithm::HMAC_256_64),
            tag: vec![0x55; 8],
            ..Default::default()
        };
        let enc = msg.encode().unwrap();
        assert!(matches!(
            CoseMac::decode(&enc),
            Err(Error::TagMismatch {
                expected: 97,
                actual: Some(17)
            })
        ));
    }
}
