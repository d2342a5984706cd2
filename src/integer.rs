use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;

use num_traits::NumCast;

use crate::MAX_SAFE_INT;

/// An integer carried in a decoded item, stored as a sign plus magnitude.
///
/// This mirrors how the wire format itself frames integers: a major type for
/// the sign and an unsigned argument for the size. Any 64-bit signed or
/// unsigned value is representable, but only magnitudes inside the safe
/// interchange range ([`is_safe`](Self::is_safe)) can actually be encoded.
/// Construct one with `From` on any primitive integer type.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Integer {
    /// Set only for values strictly below zero; zero is always non-negative.
    neg: bool,
    mag: u64,
}

impl Integer {
    /// Smallest representable integer, matching `i64::MIN`.
    pub const MIN: Integer = Integer {
        neg: true,
        mag: 1 << 63,
    };

    /// Largest representable integer, matching `u64::MAX`.
    pub const MAX: Integer = Integer {
        neg: false,
        mag: u64::MAX,
    };

    // Every public constructor funnels through here. The input always comes
    // from a 64-bit primitive, so the magnitude fits.
    fn from_i128(v: i128) -> Self {
        if v < 0 {
            Integer {
                neg: true,
                mag: v.unsigned_abs() as u64,
            }
        } else {
            Integer {
                neg: false,
                mag: v as u64,
            }
        }
    }

    /// The value widened to 128 bits, which holds every `Integer` exactly.
    #[inline]
    pub fn as_i128(&self) -> i128 {
        if self.neg {
            -(self.mag as i128)
        } else {
            self.mag as i128
        }
    }

    /// The absolute value.
    #[inline]
    pub fn magnitude(&self) -> u64 {
        self.mag
    }

    /// True when the value is strictly below zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.neg
    }

    /// True when the magnitude is at most 2⁵³−1. Only safe integers can go
    /// on the wire.
    #[inline]
    pub fn is_safe(&self) -> bool {
        self.mag <= MAX_SAFE_INT
    }

    // One checked conversion path for every numeric target.
    fn cast<T: NumCast>(&self) -> Option<T> {
        NumCast::from(self.as_i128())
    }

    /// The value as `i64`, if it fits.
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        self.cast()
    }

    /// The value as `u64`, if it is non-negative.
    #[inline]
    pub fn as_u64(&self) -> Option<u64> {
        self.cast()
    }

    /// The value as `f64`, if it converts without surprises.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        self.cast()
    }
}

impl Ord for Integer {
    fn cmp(&self, other: &Integer) -> Ordering {
        self.as_i128().cmp(&other.as_i128())
    }
}

impl PartialOrd for Integer {
    fn partial_cmp(&self, other: &Integer) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.as_i128(), f)
    }
}

macro_rules! integer_from_primitive {
    ($($t:ty)*) => {$(
        impl From<$t> for Integer {
            fn from(v: $t) -> Self {
                Integer::from_i128(v as i128)
            }
        }
    )*};
}

integer_from_primitive!(u8 u16 u32 u64 usize i8 i16 i32 i64 isize);

macro_rules! primitive_try_from_integer {
    ($($t:ty)*) => {$(
        impl TryFrom<Integer> for $t {
            type Error = Integer;
            fn try_from(v: Integer) -> Result<Self, Integer> {
                <$t>::try_from(v.as_i128()).map_err(|_| v)
            }
        }
    )*};
}

primitive_try_from_integer!(u8 u16 u32 u64 usize i8 i16 i32 i64 isize);

use serde::{
    de::{Deserialize, Deserializer, Visitor},
    ser::{Serialize, Serializer},
};

impl Serialize for Integer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.neg {
            // Every negative value fits in i64
            serializer.serialize_i64(self.as_i128() as i64)
        } else {
            serializer.serialize_u64(self.mag)
        }
    }
}

impl<'de> Deserialize<'de> for Integer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IntegerVisitor;
        impl<'de> Visitor<'de> for IntegerVisitor {
            type Value = Integer;

            fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt.write_str("a signed or unsigned integer")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Integer, E> {
                Ok(v.into())
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Integer, E> {
                Ok(v.into())
            }
        }

        deserializer.deserialize_any(IntegerVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_magnitude() {
        assert!(!Integer::from(0i64).is_negative());
        assert!(!Integer::from(0u64).is_negative());
        assert_eq!(
            Integer::from(0i64),
            Integer::from(0u64),
            "zero must compare equal no matter how it was built"
        );
        assert!(Integer::from(-1).is_negative());
        assert_eq!(Integer::from(-1).magnitude(), 1);
        assert_eq!(Integer::MIN.magnitude(), 1 << 63);
        assert_eq!(Integer::MIN.to_string(), "-9223372036854775808");
        assert_eq!(Integer::MAX.to_string(), "18446744073709551615");
    }

    #[test]
    fn safe_range() {
        assert!(Integer::from(0u64).is_safe());
        assert!(Integer::from(MAX_SAFE_INT).is_safe());
        assert!(!Integer::from(MAX_SAFE_INT + 1).is_safe());
        assert!(!Integer::MAX.is_safe());
        assert!(Integer::from(-(MAX_SAFE_INT as i64)).is_safe());
        assert!(!Integer::from(-(MAX_SAFE_INT as i64) - 1).is_safe());
        assert!(!Integer::MIN.is_safe());
    }

    #[test]
    fn ordering() {
        let mut v = vec![
            Integer::from(10u64),
            Integer::from(-1),
            Integer::MAX,
            Integer::from(0u64),
            Integer::MIN,
        ];
        v.sort();
        assert_eq!(
            v,
            vec![
                Integer::MIN,
                Integer::from(-1),
                Integer::from(0u64),
                Integer::from(10u64),
                Integer::MAX,
            ]
        );
    }

    #[test]
    fn conversions() {
        let x = Integer::from(300u64);
        assert_eq!(x.as_i128(), 300);
        assert_eq!(x.as_i64(), Some(300));
        assert_eq!(x.as_u64(), Some(300));
        assert!(u8::try_from(x).is_err());
        assert_eq!(u16::try_from(x), Ok(300));
        let x = Integer::from(-300);
        assert_eq!(x.as_i128(), -300);
        assert_eq!(x.as_i64(), Some(-300));
        assert_eq!(x.as_u64(), None);
        assert_eq!(x.as_f64(), Some(-300.0));
        assert_eq!(i64::try_from(x), Ok(-300));
        assert_eq!(i64::try_from(Integer::MIN), Ok(i64::MIN));
        assert!(i64::try_from(Integer::MAX).is_err());
    }
}
