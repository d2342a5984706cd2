use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::value::{Key, Value};

/// A COSE header map. Keys come from the common header parameter registry
/// ([`label`]), but apart from the protected header's `alg` entry the codec
/// carries whatever the caller supplies without type-checking it.
pub type HeaderMap = BTreeMap<Key, Value>;

/// Labels from the common header parameter registry.
pub mod label {
    pub const ALG: i64 = 1;
    pub const CRIT: i64 = 2;
    pub const CONTENT_TYPE: i64 = 3;
    pub const KID: i64 = 4;
    pub const IV: i64 = 5;
    pub const PARTIAL_IV: i64 = 6;
    pub const COUNTER_SIGNATURE: i64 = 7;
    pub const SALT: i64 = 8;
    pub const COUNTER_SIGNATURE0: i64 = 9;
    pub const X5CHAIN: i64 = 33;
    pub const X5T: i64 = 34;
}

/// The algorithms accepted for a protected header's `alg` parameter.
///
/// An `alg` value validates iff it is the registered number of one of these.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    // Signatures
    ES256 = -7,
    ES384 = -35,
    ES512 = -36,
    EdDSA = -8,
    RS256 = -257,
    RS384 = -258,
    RS512 = -259,
    PS256 = -37,
    PS384 = -38,
    PS512 = -39,
    // MACs
    HMAC_256_64 = 4,
    HMAC_256_256 = 5,
    HMAC_384_384 = 6,
    HMAC_512_512 = 7,
    // AEAD content encryption
    AES_GCM_128 = 1,
    AES_GCM_192 = 2,
    AES_GCM_256 = 3,
    ChaCha20_Poly1305 = 24,
    AES_CCM_16_64_128 = 10,
    AES_CCM_64_64_128 = 12,
    AES_CCM_64_64_256 = 13,
    AES_CCM_16_64_256 = 14,
    AES_CCM_16_128_128 = 30,
    AES_CCM_16_128_256 = 31,
    AES_CCM_64_128_128 = 32,
    AES_CCM_64_128_256 = 33,
    // Key agreement
    Direct = -6,
}

impl Algorithm {
    /// The algorithm's registered number.
    pub fn into_i64(self) -> i64 {
        self as i64
    }

    /// Look an algorithm up by its registered number. Returns `None` for
    /// anything not in the registry.
    pub fn from_i64(v: i64) -> Option<Algorithm> {
        use self::Algorithm::*;
        match v {
            -7 => Some(ES256),
            -35 => Some(ES384),
            -36 => Some(ES512),
            -8 => Some(EdDSA),
            -257 => Some(RS256),
            -258 => Some(RS384),
            -259 => Some(RS512),
            -37 => Some(PS256),
            -38 => Some(PS384),
            -39 => Some(PS512),
            4 => Some(HMAC_256_64),
            5 => Some(HMAC_256_256),
            6 => Some(HMAC_384_384),
            7 => Some(HMAC_512_512),
            1 => Some(AES_GCM_128),
            2 => Some(AES_GCM_192),
            3 => Some(AES_GCM_256),
            24 => Some(ChaCha20_Poly1305),
            10 => Some(AES_CCM_16_64_128),
            12 => Some(AES_CCM_64_64_128),
            13 => Some(AES_CCM_64_64_256),
            14 => Some(AES_CCM_16_64_256),
            30 => Some(AES_CCM_16_128_128),
            31 => Some(AES_CCM_16_128_256),
            32 => Some(AES_CCM_64_128_128),
            33 => Some(AES_CCM_64_128_256),
            -6 => Some(Direct),
            _ => None,
        }
    }
}

impl From<Algorithm> for Value {
    fn from(alg: Algorithm) -> Value {
        Value::from(alg.into_i64())
    }
}

/// Check a protected header: the `alg` parameter must be present and its
/// value must be a registered algorithm number. Runs on both encode and
/// decode, for the outer header and for every signature/recipient header.
pub fn check_protected(header: &HeaderMap) -> Result<()> {
    let alg = header.get(&Key::from(label::ALG)).ok_or_else(|| {
        Error::BadHeader("Protected header must contain 'alg' parameter".to_string())
    })?;
    match alg.as_i64().and_then(Algorithm::from_i64) {
        Some(_) => Ok(()),
        None => Err(Error::BadHeader(
            "Invalid or unsupported algorithm in protected header".to_string(),
        )),
    }
}
