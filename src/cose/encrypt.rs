use super::{
    bytes_from_value, decode_envelope, encode_envelope, layer_from_value, layer_to_value,
    protected_from_value, protected_to_value, unprotected_from_value, HeaderMap,
};
use crate::error::{Error, Result};
use crate::value::Value;

/// An encrypted message with an implicit key (`COSE_Encrypt0`, tag 16).
///
/// The ciphertext is carried opaquely; this library never encrypts or
/// decrypts.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CoseEncrypt0 {
    pub protected: HeaderMap,
    pub unprotected: HeaderMap,
    pub ciphertext: Vec<u8>,
}

impl CoseEncrypt0 {
    pub const TAG: u64 = 16;

    /// Encode to bytes, validating the protected header first.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let fields = vec![
            protected_to_value(&self.protected)?,
            Value::Map(self.unprotected.clone()),
            Value::Binary(self.ciphertext.clone()),
        ];
        encode_envelope(Self::TAG, fields)
    }

    /// Decode from bytes, requiring tag 16 and re-validating the protected
    /// header.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let fields = decode_envelope(buf, Self::TAG, 3)?;
        Ok(Self {
            protected: protected_from_value(&fields[0])?,
            unprotected: unprotected_from_value(&fields[1])?,
            ciphertext: bytes_from_value(&fields[2], "Ciphertext")?,
        })
    }
}

/// One recipient's entry in a [`CoseEncrypt`] message, carrying that
/// recipient's wrapped content key.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CoseRecipient {
    pub protected: HeaderMap,
    pub unprotected: HeaderMap,
    pub encrypted_key: Vec<u8>,
}

/// A multi-recipient encrypted message (`COSE_Encrypt`, tag 96).
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CoseEncrypt {
    pub protected: HeaderMap,
    pub unprotected: HeaderMap,
    pub ciphertext: Vec<u8>,
    pub recipients: Vec<CoseRecipient>,
}

impl CoseEncrypt {
    pub const TAG: u64 = 96;

    /// Encode to bytes. The outer protected header and every recipient's
    /// protected header must validate.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let recipients = self
            .recipients
            .iter()
            .map(|r| layer_to_value(&r.protected, &r.unprotected, &r.encrypted_key))
            .collect::<Result<Vec<Value>>>()?;
        let fields = vec![
            protected_to_value(&self.protected)?,
            Value::Map(self.unprotected.clone()),
            Value::Binary(self.ciphertext.clone()),
            Value::Array(recipients),
        ];
        encode_envelope(Self::TAG, fields)
    }

    /// Decode from bytes, requiring tag 96 and re-validating every protected
    /// header, the outer one and each recipient's.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let fields = decode_envelope(buf, Self::TAG, 4)?;
        let recipients = fields[3]
            .as_array()
            .ok_or_else(|| Error::FailValidate("Recipient list must be an array".to_string()))?
            .iter()
            .map(|entry| {
                let (protected, unprotected, encrypted_key) =
                    layer_from_value(entry, "Recipient")?;
                Ok(CoseRecipient {
                    protected,
                    unprotected,
                    encrypted_key,
                })
            })
            .collect::<Result<Vec<CoseRecipient>>>()?;
        Ok(Self {
            protected: protected_from_value(&fields[0])?,
            unprotected: unprotected_from_value(&fields[1])?,
            ciphertext: bytes_from_value(&fields[2], "Ciphertext")?,
            recipients,
        })
    }
}
