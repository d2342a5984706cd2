use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::Integer;

/// A map key: an integer or a text string.
///
/// Keys order by their decimal-string textual form, which is the order map
/// entries are emitted in on the wire. An integer key and a text key with the
/// same textual form stay distinct; the integer sorts first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Int(Integer),
    Str(String),
}

impl Key {
    /// The key's textual form: integer keys render in decimal.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Key::Int(v) => Cow::Owned(v.to_string()),
            Key::Str(v) => Cow::Borrowed(v.as_str()),
        }
    }

    /// Returns the key as an integer if it is one, or else `None`.
    pub fn as_int(&self) -> Option<Integer> {
        match self {
            Key::Int(v) => Some(*v),
            Key::Str(_) => None,
        }
    }

    /// Returns the key as an `i64` if it is an integer in range.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_int().and_then(|v| v.as_i64())
    }

    /// Returns the key as a string slice if it is text, or else `None`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Int(_) => None,
            Key::Str(v) => Some(v.as_str()),
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Key::Int(_) => 0,
            Key::Str(_) => 1,
        }
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Key) -> Ordering {
        self.as_text()
            .cmp(&other.as_text())
            .then_with(|| self.kind_rank().cmp(&other.kind_rank()))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Key) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Key::Int(v) => fmt::Display::fmt(v, f),
            Key::Str(v) => fmt::Display::fmt(v, f),
        }
    }
}

macro_rules! impl_key_from_int {
    ($t: ty) => {
        impl From<$t> for Key {
            fn from(n: $t) -> Self {
                Key::Int(Integer::from(n))
            }
        }
    };
}

impl_key_from_int!(u8);
impl_key_from_int!(u16);
impl_key_from_int!(u32);
impl_key_from_int!(u64);
impl_key_from_int!(i8);
impl_key_from_int!(i16);
impl_key_from_int!(i32);
impl_key_from_int!(i64);

impl From<Integer> for Key {
    fn from(v: Integer) -> Self {
        Key::Int(v)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Str(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::Str(v)
    }
}

/// A decoded item: the owned, recursive value tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Undefined,
    Boolean(bool),
    Integer(Integer),
    F64(f64),
    String(String),
    Binary(Vec<u8>),
    Array(Vec<Value>),
    Map(BTreeMap<Key, Value>),
    Tagged(u64, Box<Value>),
}

impl Value {
    /// Wrap a value with a tag number.
    pub fn tag(tag: u64, value: Value) -> Self {
        Value::Tagged(tag, Box::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_bool(&self) -> bool {
        self.as_bool().is_some()
    }

    pub fn is_int(&self) -> bool {
        self.as_int().is_some()
    }

    pub fn is_f64(&self) -> bool {
        self.as_f64().is_some()
    }

    pub fn is_str(&self) -> bool {
        self.as_str().is_some()
    }

    pub fn is_bin(&self) -> bool {
        self.as_slice().is_some()
    }

    pub fn is_array(&self) -> bool {
        self.as_array().is_some()
    }

    pub fn is_map(&self) -> bool {
        self.as_map().is_some()
    }

    pub fn is_tagged(&self) -> bool {
        self.as_tagged().is_some()
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Boolean(val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_int(&self) -> Option<Integer> {
        if let Value::Integer(val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_int().and_then(|v| v.as_i64())
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_int().and_then(|v| v.as_u64())
    }

    pub fn as_f64(&self) -> Option<f64> {
        if let Value::F64(val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::String(ref val) = *self {
            Some(val.as_str())
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> Option<&[u8]> {
        if let Value::Binary(ref val) = *self {
            Some(val.as_slice())
        } else {
            None
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        if let Value::Array(ref val) = *self {
            Some(val.as_slice())
        } else {
            None
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<Key, Value>> {
        if let Value::Map(ref val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_tagged(&self) -> Option<(u64, &Value)> {
        if let Value::Tagged(tag, ref val) = *self {
            Some((tag, val))
        } else {
            None
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<Integer> for Value {
    fn from(v: Integer) -> Self {
        Value::Integer(v)
    }
}

macro_rules! impl_value_from_int {
    ($t: ty) => {
        impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Integer(Integer::from(n))
            }
        }
    };
}

impl_value_from_int!(u8);
impl_value_from_int!(u16);
impl_value_from_int!(u32);
impl_value_from_int!(u64);
impl_value_from_int!(i8);
impl_value_from_int!(i16);
impl_value_from_int!(i32);
impl_value_from_int!(i64);

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Binary(v.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<BTreeMap<Key, Value>> for Value {
    fn from(v: BTreeMap<Key, Value>) -> Self {
        Value::Map(v)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn key_text_ordering() {
        // Decimal-string comparison, not numeric: "10" sorts before "9",
        // and "-1" (leading '-') sorts before any digit.
        let mut keys: Vec<Key> = vec![
            Key::from(9),
            Key::from(10),
            Key::from(-1),
            Key::from("alg"),
            Key::from("1"),
            Key::from(1),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                Key::from(-1),
                Key::from(1),
                Key::from("1"),
                Key::from(10),
                Key::from(9),
                Key::from("alg"),
            ]
        );
    }

    #[test]
    fn key_kinds_stay_distinct() {
        let mut map: BTreeMap<Key, Value> = BTreeMap::new();
        map.insert(Key::from(1), Value::from("int"));
        map.insert(Key::from("1"), Value::from("text"));
        assert_eq!(map.len(), 2, "integer 1 and text \"1\" are different keys");
    }

    #[test]
    fn accessors() {
        let v = Value::from(42u8);
        assert!(v.is_int());
        assert_eq!(v.as_u64(), Some(42));
        assert_eq!(v.as_str(), None);

        let v = Value::tag(18, Value::from(vec![Value::Null]));
        let (tag, inner) = v.as_tagged().expect("should be tagged");
        assert_eq!(tag, 18);
        assert!(inner.as_array().is_some());
        assert!(!v.is_map());

        let v = Value::from(&b"\x01\x02"[..]);
        assert!(v.is_bin());
        assert_eq!(v.as_slice(), Some(&b"\x01\x02"[..]));

        assert!(Value::Undefined.is_undefined());
        assert!(!Value::Null.is_undefined());
        assert!(Value::Null.is_null());
        assert_eq!(Value::from(1.5).as_f64(), Some(1.5));
        assert!(Value::from(true).is_bool());
        assert!(Value::from("x").is_str());
        assert!(Value::Map(BTreeMap::new()).is_map());
        assert!(Value::from(Vec::<Value>::new()).is_array());
        assert!(Value::from(0.5).is_f64());
        assert!(Value::tag(0, Value::Null).is_tagged());

        let k = Key::from("kid");
        assert_eq!(k.as_str(), Some("kid"));
        assert_eq!(k.as_i64(), None);
        assert_eq!(Key::from(4).as_text(), "4");
    }
}
