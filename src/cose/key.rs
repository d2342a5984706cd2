use std::collections::BTreeMap;

use super::Algorithm;
use crate::decode::read_typed_map;
use crate::encode::encode_value;
use crate::error::{Error, Result};
use crate::value::{Key, Value};

/// Key parameter labels and the values this library accepts for them.
pub mod param {
    /// Key type, required on every key.
    pub const KTY: i64 = 1;
    /// Algorithm, required on every key.
    pub const ALG: i64 = 3;
    /// Elliptic-curve key type.
    pub const KTY_EC2: i64 = 2;
    /// RSA key type.
    pub const KTY_RSA: i64 = 3;
    /// EC2: curve id.
    pub const EC2_CRV: i64 = -1;
    /// EC2: x coordinate.
    pub const EC2_X: i64 = -2;
    /// EC2: y coordinate.
    pub const EC2_Y: i64 = -3;
    /// The only curve id accepted, P-256.
    pub const CRV_P256: i64 = 1;
    /// RSA: modulus.
    pub const RSA_N: i64 = -1;
    /// RSA: public exponent.
    pub const RSA_E: i64 = -2;
}

/// A key descriptor: an integer-keyed parameter map with a shape validator
/// dispatched on the key type.
///
/// EC2 keys (kty 2) require curve/x/y with the curve fixed to P-256; RSA keys
/// (kty 3) require modulus and exponent. Parameters outside the table for the
/// key's type are rejected. No key material is interpreted, only carried.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CoseKey {
    pub params: BTreeMap<i64, Value>,
}

impl CoseKey {
    /// The key's type parameter, if present as an integer.
    pub fn kty(&self) -> Option<i64> {
        self.params.get(&param::KTY).and_then(|v| v.as_i64())
    }

    /// The key's algorithm parameter, if present as an integer.
    pub fn alg(&self) -> Option<i64> {
        self.params.get(&param::ALG).and_then(|v| v.as_i64())
    }

    /// Check the key's shape against the per-type requirement table.
    pub fn validate(&self) -> Result<()> {
        let kty = self
            .kty()
            .ok_or_else(|| Error::FailValidate("Key must have an integer 'kty' parameter".to_string()))?;
        let alg = self
            .alg()
            .ok_or_else(|| Error::FailValidate("Key must have an integer 'alg' parameter".to_string()))?;
        if Algorithm::from_i64(alg).is_none() {
            return Err(Error::FailValidate(format!(
                "Key algorithm {} isn't in the registry",
                alg
            )));
        }
        let allowed: &[i64] = match kty {
            param::KTY_EC2 => {
                let crv = self
                    .params
                    .get(&param::EC2_CRV)
                    .and_then(|v| v.as_i64())
                    .ok_or_else(|| {
                        Error::FailValidate("EC2 key must have an integer curve id".to_string())
                    })?;
                if crv != param::CRV_P256 {
                    return Err(Error::FailValidate(format!(
                        "EC2 curve {} isn't supported",
                        crv
                    )));
                }
                for (label, name) in [(param::EC2_X, "x"), (param::EC2_Y, "y")] {
                    let present = self.params.get(&label).map(|v| v.is_bin());
                    if present != Some(true) {
                        return Err(Error::FailValidate(format!(
                            "EC2 key must have a byte-string '{}' coordinate",
                            name
                        )));
                    }
                }
                &[param::KTY, param::ALG, param::EC2_CRV, param::EC2_X, param::EC2_Y]
            }
            param::KTY_RSA => {
                for (label, name) in [(param::RSA_N, "n"), (param::RSA_E, "e")] {
                    let present = self.params.get(&label).map(|v| v.is_bin());
                    if present != Some(true) {
                        return Err(Error::FailValidate(format!(
                            "RSA key must have a byte-string '{}' parameter",
                            name
                        )));
                    }
                }
                &[param::KTY, param::ALG, param::RSA_N, param::RSA_E]
            }
            other => {
                return Err(Error::FailValidate(format!(
                    "Key type {} isn't supported",
                    other
                )))
            }
        };
        for label in self.params.keys() {
            if !allowed.contains(label) {
                return Err(Error::FailValidate(format!(
                    "Key parameter {} isn't permitted for this key type",
                    label
                )));
            }
        }
        Ok(())
    }

    /// Encode to bytes (untagged), validating the shape first.
    ///
    /// # Errors
    ///
    /// Fails if the key's shape doesn't validate, or on any byte-codec
    /// failure.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let map: BTreeMap<Key, Value> = self
            .params
            .iter()
            .map(|(label, v)| (Key::from(*label), v.clone()))
            .collect();
        encode_value(&Value::Map(map))
    }

    /// Decode from bytes and validate the shape.
    ///
    /// # Errors
    ///
    /// Fails if the item isn't an integer-keyed map, the shape doesn't
    /// validate, or on any byte-codec failure.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let (map, _) = read_typed_map(buf, 0, |k| k.as_int().is_some(), |_| true)?;
        let mut params = BTreeMap::new();
        for (k, v) in map {
            let label = k.as_i64().ok_or_else(|| {
                Error::FailValidate(format!("Key parameter {} is out of range", k))
            })?;
            params.insert(label, v);
        }
        let key = CoseKey { params };
        key.validate()?;
        Ok(key)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cose::Algorithm;

    fn ec2_key() -> CoseKey {
        let mut params = BTreeMap::new();
        params.insert(param::KTY, Value::from(param::KTY_EC2));
        params.insert(param::ALG, Value::from(Algorithm::ES256));
        params.insert(param::EC2_CRV, Value::from(param::CRV_P256));
        params.insert(param::EC2_X, Value::from(vec![0x0a; 32]));
        params.insert(param::EC2_Y, Value::from(vec![0x0b; 32]));
        CoseKey { params }
    }

    fn rsa_key() -> CoseKey {
        let mut params = BTreeMap::new();
        params.insert(param::KTY, Value::from(param::KTY_RSA));
        params.insert(param::ALG, Value::from(Algorithm::RS256));
        params.insert(param::RSA_N, Value::from(vec![0xcc; 256]));
        params.insert(param::RSA_E, Value::from(vec![0x01, 0x00, 0x01]));
        CoseKey { params }
    }

    #[test]
    fn ec2_roundtrip() {
        let key = ec2_key();
        let enc = key.encode().unwrap();
        let dec = CoseKey::decode(&enc).expect("decoding should have worked");
        assert!(key == dec, "Encode->Decode should yield the same key");
    }

    #[test]
    fn rsa_roundtrip() {
        let key = rsa_key();
        let enc = key.encode().unwrap();
        let dec = CoseKey::decode(&enc).expect("decoding should have worked");
        assert!(key == dec, "Encode->Decode should yield the same key");
    }

    #[test]
    fn missing_required_param() {
        let mut key = ec2_key();
        key.params.remove(&param::EC2_Y);
        assert!(
            key.encode().is_err(),
            "an EC2 key without a y coordinate should fail validation"
        );

        let mut key = rsa_key();
        key.params.remove(&param::RSA_E);
        assert!(key.encode().is_err());
    }

    #[test]
    fn unknown_param_rejected() {
        let mut key = ec2_key();
        key.params.insert(-4, Value::from(vec![0u8; 32]));
        assert!(
            key.encode().is_err(),
            "parameters outside the per-type table should be rejected"
        );
    }

    #[test]
    fn wrong_curve_rejected() {
        let mut key = ec2_key();
        key.params.insert(param::EC2_CRV, Value::from(2));
        assert!(key.encode().is_err());
    }

    #[test]
    fn unknown_kty_rejected() {
        let mut key = ec2_key();
        key.params.insert(param::KTY, Value::from(4));
        assert!(key.encode().is_err());
    }

    #[test]
    fn unregistered_alg_rejected() {
        let mut key = ec2_key();
        key.params.insert(param::ALG, Value::from(999));
        assert!(key.encode().is_err());
    }

    #[test]
    fn decode_rejects_text_keyed_map() {
        // {"1": 2}
        let data = [0xa1, 0x61, 0x31, 0x02];
        // The text key "1" coerces to an integer, so this one passes the key
        // predicate but fails shape validation (no alg).
        assert!(CoseKey::decode(&data).is_err());
        // {"kty": 2} has a non-coercible text key
        let data = [0xa1, 0x63, 0x6b, 0x74, 0x79, 0x02];
        assert!(matches!(
            CoseKey::decode(&data),
            Err(Error::BadKey(_))
        ));
    }
}
