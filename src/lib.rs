//! A structural codec for a self-describing binary data format and the
//! signing/encryption envelopes layered on top of it (the RFC 8949 and
//! RFC 8152 wire formats).
//!
//! The byte codec turns [`Value`] trees into canonical byte streams and back,
//! with hardened parsing: every read is bounds-checked and hard ceilings are
//! enforced on input/output size, container arity, and nesting depth. The
//! [`cose`] module builds the six tagged envelope structures and the key
//! descriptor on top of it, validating protected headers in both directions.
//! No cryptographic computation happens anywhere in this crate; signatures,
//! tags, ciphertexts, and key material are carried as opaque bytes.
//!
//! User-defined types can go straight to and from the wire through serde with
//! [`to_vec`] and [`from_slice`].

mod marker;
pub mod element;

mod depth_tracking;

pub mod integer;
pub use integer::Integer;

mod error;
pub use error::{Error, Result};

mod value;
pub use value::{Key, Value};

mod decode;
pub use decode::{read_typed_map, read_value, read_value_offset};

mod encode;
pub use encode::encode_value;

mod ser;
pub use ser::to_vec;

mod de;
pub use de::from_slice;

pub mod cose;

/// The maximum number of nested containers allowed, on both encode and
/// decode.
pub const MAX_DEPTH: usize = 100;
/// The maximum allowed size of any input buffer or encoded output is 16 MiB.
/// Anything larger is refused at the entry of every operation.
pub const MAX_SIZE: usize = 16 << 20; // 16 MiB
/// The maximum number of elements in an array and of pairs in a map, checked
/// recursively at every level on both encode and decode.
pub const MAX_CONTAINER_LEN: usize = 10000;
/// The largest integer magnitude the wire format carries: 2⁵³−1, the safe
/// integer ceiling of an IEEE-754 double.
pub const MAX_SAFE_INT: u64 = (1u64 << 53) - 1;
