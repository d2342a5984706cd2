//! Deserialization.
//!

use serde::de::*;

use crate::element::{Element, Parser};
use crate::error::{Error, Result};
use crate::marker::{Major, Marker};
use crate::MAX_SIZE;

/// Decode any serde-deserializable type from a byte slice. The slice must
/// hold exactly one item; trailing bytes fail the decode.
///
/// # Errors
///
/// Fails if the buffer is over the maximum allowed size, the item is
/// truncated, malformed, or over a codec limit, or the item doesn't fit the
/// requested type.
pub fn from_slice<'a, T: serde::Deserialize<'a>>(buf: &'a [u8]) -> Result<T> {
    if buf.len() > MAX_SIZE {
        return Err(Error::LengthTooLong {
            max: MAX_SIZE,
            actual: buf.len(),
        });
    }
    let mut de = PackDeserializer::new(buf);
    let value = T::deserialize(&mut de)?;
    de.finish()?;
    Ok(value)
}

pub(crate) struct PackDeserializer<'de> {
    parser: Parser<'de>,
}

impl<'de> PackDeserializer<'de> {
    pub(crate) fn new(buf: &'de [u8]) -> Self {
        Self {
            parser: Parser::new(buf),
        }
    }

    pub(crate) fn finish(self) -> Result<()> {
        self.parser.finish()
    }

    fn next_elem(&mut self) -> Result<Element<'de>> {
        self.parser
            .next()
            .ok_or_else(|| Error::SerdeFail("missing next value".to_string()))?
    }
}

impl<'de, 'a> serde::Deserializer<'de> for &'a mut PackDeserializer<'de> {
    type Error = Error;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let elem = self.next_elem()?;
        match elem {
            Element::Null | Element::Undefined => visitor.visit_unit(),
            Element::Bool(v) => visitor.visit_bool(v),
            Element::Int(v) => match v.as_u64() {
                Some(u) => visitor.visit_u64(u),
                // Every negative value fits in i64
                None => visitor.visit_i64(v.as_i128() as i64),
            },
            Element::F64(v) => visitor.visit_f64(v),
            Element::Str(v) => visitor.visit_borrowed_str(v),
            Element::Bin(v) => visitor.visit_borrowed_bytes(v),
            Element::Array(len) => visitor.visit_seq(SeqAccess::new(self, len)),
            Element::Map(len) => visitor.visit_map(MapAccess::new(self, len)),
            // Tags have no serde-level surface; read straight through to the
            // inner item
            Element::Tag(_) => self.deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let marker = self
            .parser
            .peek_marker()
            .ok_or_else(|| Error::SerdeFail("missing next value".to_string()))?;
        if marker == Marker::from_u8(0xf6) || marker == Marker::from_u8(0xf7) {
            self.next_elem()?;
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_enum(EnumAccess::new(self))
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str
        string bytes byte_buf unit unit_struct newtype_struct
        seq tuple tuple_struct map struct identifier ignored_any
    }
}

struct EnumAccess<'a, 'de> {
    de: &'a mut PackDeserializer<'de>,
    has_value: bool,
}

impl<'a, 'de> EnumAccess<'a, 'de> {
    fn new(de: &'a mut PackDeserializer<'de>) -> Self {
        Self {
            de,
            has_value: false,
        }
    }
}

impl<'a, 'de> serde::de::EnumAccess<'de> for EnumAccess<'a, 'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(mut self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: DeserializeSeed<'de>,
    {
        let marker = self
            .de
            .parser
            .peek_marker()
            .ok_or_else(|| Error::SerdeFail("missing next value".to_string()))?;
        let val = match marker.major {
            Major::Map => {
                match self.de.next_elem()? {
                    Element::Map(1) => (),
                    _ => {
                        return Err(Error::SerdeFail(
                            "expected a size-1 map or a string".to_string(),
                        ))
                    }
                }
                self.has_value = true;
                seed.deserialize(&mut *self.de)?
            }
            Major::Str => {
                self.has_value = false;
                seed.deserialize(&mut *self.de)?
            }
            _ => {
                return Err(Error::SerdeFail(
                    "expected a size-1 map or a string".to_string(),
                ))
            }
        };
        Ok((val, self))
    }
}

impl<'a, 'de> serde::de::VariantAccess<'de> for EnumAccess<'a, 'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        if self.has_value {
            Err(Error::SerdeFail(
                "invalid type: non-unit variant, expected unit variant".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        if self.has_value {
            seed.deserialize(&mut *self.de)
        } else {
            Err(Error::SerdeFail(
                "invalid type: unit variant, expected newtype variant".to_string(),
            ))
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if self.has_value {
            self.de.deserialize_map(visitor)
        } else {
            Err(Error::SerdeFail(
                "invalid type: unit variant, expected struct variant".to_string(),
            ))
        }
    }

    fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if self.has_value {
            self.de.deserialize_tuple(len, visitor)
        } else {
            Err(Error::SerdeFail(
                "invalid type: unit variant, expected tuple variant".to_string(),
            ))
        }
    }
}

struct SeqAccess<'a, 'de> {
    de: &'a mut PackDeserializer<'de>,
    size_left: usize,
}

impl<'a, 'de> SeqAccess<'a, 'de> {
    fn new(de: &'a mut PackDeserializer<'de>, len: usize) -> Self {
        Self { de, size_left: len }
    }
}

impl<'a, 'de> serde::de::SeqAccess<'de> for SeqAccess<'a, 'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        if self.size_left > 0 {
            self.size_left -= 1;
            let val = seed.deserialize(&mut *self.de)?;
            Ok(Some(val))
        } else {
            Ok(None)
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.size_left)
    }
}

struct MapAccess<'a, 'de> {
    de: &'a mut PackDeserializer<'de>,
    size_left: usize,
}

impl<'a, 'de> MapAccess<'a, 'de> {
    fn new(de: &'a mut PackDeserializer<'de>, len: usize) -> Self {
        Self { de, size_left: len }
    }
}

impl<'a, 'de> serde::de::MapAccess<'de> for MapAccess<'a, 'de> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        if self.size_left > 0 {
            self.size_left -= 1;
            Ok(Some(seed.deserialize(&mut *self.de)?))
        } else {
            Ok(None)
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.size_left)
    }
}
