//! Build a COSE_Sign1 message, encode it, and decode it back.
//!
//! The signature here is a placeholder; a real caller would compute it over
//! the Sig_structure with the key named by `kid`.

use cose_pack::cose::{label, Algorithm, CoseSign1, HeaderMap};
use cose_pack::{Key, Value};

fn main() {
    let mut protected = HeaderMap::new();
    protected.insert(Key::from(label::ALG), Value::from(Algorithm::ES256));

    let mut unprotected = HeaderMap::new();
    unprotected.insert(Key::from(label::KID), Value::from(&b"device-key-1"[..]));

    let msg = CoseSign1 {
        protected,
        unprotected,
        payload: Some(b"This is the content.".to_vec()),
        signature: vec![0x5c; 64],
    };

    let encoded = msg.encode().expect("message should encode");
    println!("encoded {} bytes:", encoded.len());
    for chunk in encoded.chunks(16) {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        println!("  {}", hex.join(" "));
    }

    let decoded = CoseSign1::decode(&encoded).expect("message should decode");
    assert_eq!(decoded, msg);
    println!(
        "decoded payload: {:?}",
        String::from_utf8_lossy(decoded.payload.as_deref().unwrap_or_default())
    );
}
