//! Serialization.
//!
//! Maps and structs are buffered entry-by-entry and emitted in the
//! deterministic key order, so any serde-serializable type produces the same
//! bytes as the equivalent value tree. Map keys must serialize as integers or
//! text strings.
//!
//! Enum variants, when mapped, are:
//! - Unit - Just the variant name as a string
//! - Newtype - Map with one pair. Key is variant name, content is the value
//! - Tuple - Map with one pair. Key is variant name, content is the tuple as an array
//! - Struct - Map with one pair. Key is variant name, content is the struct

use serde::ser::*;
use std::{collections::BTreeMap, mem};

use crate::depth_tracking::DepthTracker;
use crate::element::{serialize_elem, Element};
use crate::error::{Error, Result};
use crate::value::Key;
use crate::{Integer, MAX_SIZE};

/// Encode any serde-serializable type to a byte vector.
///
/// # Errors
///
/// Fails on map keys that aren't integers or text, integers outside the safe
/// interchange range, containers over the element ceiling, nesting past the
/// depth ceiling, or output over the maximum allowed size.
pub fn to_vec<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut ser = PackSerializer::new();
    value.serialize(&mut ser)?;
    let buf = ser.finish();
    if buf.len() > MAX_SIZE {
        return Err(Error::LengthTooLong {
            max: MAX_SIZE,
            actual: buf.len(),
        });
    }
    Ok(buf)
}

pub(crate) struct PackSerializer {
    depth_tracking: DepthTracker,
    buf: Vec<u8>,
}

impl PackSerializer {
    fn new() -> Self {
        PackSerializer {
            depth_tracking: DepthTracker::new(),
            buf: Vec::new(),
        }
    }

    fn encode_element(&mut self, elem: Element) -> Result<()> {
        self.depth_tracking.track(&elem)?;
        serialize_elem(&mut self.buf, elem)
    }

    fn encode_key(&mut self, key: &Key) -> Result<()> {
        match key {
            Key::Int(i) => self.encode_element(Element::Int(*i)),
            Key::Str(s) => self.encode_element(Element::Str(s)),
        }
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

impl<'a> Serializer for &'a mut PackSerializer {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = SeqSerializer<'a>;
    type SerializeTuple = TupleSerializer<'a>;
    type SerializeTupleStruct = TupleSerializer<'a>;
    type SerializeTupleVariant = TupleSerializer<'a>;
    type SerializeMap = MapSerializer<'a>;
    type SerializeStruct = StructSerializer<'a>;
    type SerializeStructVariant = StructSerializer<'a>;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.encode_element(Element::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.encode_element(Element::Int(Integer::from(v)))
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.encode_element(Element::Int(Integer::from(v)))
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        // This format carries every non-integer number as binary64
        self.serialize_f64(v as f64)
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.encode_element(Element::F64(v))
    }

    fn serialize_char(self, v: char) -> Result<()> {
        self.encode_element(Element::Str(v.encode_utf8(&mut [0u8; 4])))
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.encode_element(Element::Str(v))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.encode_element(Element::Bin(v))
    }

    fn serialize_none(self) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_some<T: Serialize + ?Sized>(self, v: &T) -> Result<()> {
        v.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.encode_element(Element::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        v: &T,
    ) -> Result<()> {
        v.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()> {
        self.encode_element(Element::Map(1))?;
        self.encode_element(Element::Str(variant))?;
        value.serialize(self)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        SeqSerializer::new(self, len)
    }

    fn serialize_tuple(self, len: usize) -> Result<TupleSerializer<'a>> {
        self.encode_element(Element::Array(len))?;
        Ok(TupleSerializer::new(self))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<TupleSerializer<'a>> {
        // Tuple structs usually just discard the name
        self.encode_element(Element::Array(len))?;
        Ok(TupleSerializer::new(self))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.encode_element(Element::Map(1))?;
        self.encode_element(Element::Str(variant))?;
        self.encode_element(Element::Array(len))?;
        Ok(TupleSerializer::new(self))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        MapSerializer::new(self)
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Self::SerializeStruct> {
        self.encode_element(Element::Map(len))?;
        Ok(StructSerializer::new(self))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.encode_element(Element::Map(1))?;
        self.encode_element(Element::Str(variant))?;
        self.encode_element(Element::Map(len))?;
        Ok(StructSerializer::new(self))
    }
}

/// Encode a sequence of possibly unknown length.
///
/// If the length is known the array marker goes out immediately. If it isn't,
/// we can't encode the marker ahead of time, so instead we:
///
/// 1. Swap a temporary buffer into the serializer
/// 2. Update the depth tracker with a placeholder array element
/// 3. Serialize elements as normal
/// 4. Swap the original buffer back in
/// 5. Directly encode the real array element, skipping the depth tracker
/// 6. Copy over the temporary buffer and drop the placeholder depth
pub struct SeqSerializer<'a> {
    se: &'a mut PackSerializer,
    unknown_len: Option<(usize, Vec<u8>)>,
}

impl<'a> SeqSerializer<'a> {
    fn new(se: &'a mut PackSerializer, len: Option<usize>) -> Result<Self> {
        if let Some(len) = len {
            se.encode_element(Element::Array(len))?;
            Ok(Self {
                se,
                unknown_len: None,
            })
        } else {
            se.depth_tracking
                .track(&Element::Array(u32::MAX as usize))?;
            let enc = mem::take(&mut se.buf);
            Ok(Self {
                se,
                unknown_len: Some((0, enc)),
            })
        }
    }
}

impl<'a> SerializeSeq for SeqSerializer<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        if let Some((ref mut len, _)) = self.unknown_len {
            *len += 1;
        }
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        if let Some((len, enc)) = self.unknown_len {
            let enc = mem::replace(&mut self.se.buf, enc);
            serialize_elem(&mut self.se.buf, Element::Array(len))?;
            self.se.buf.extend_from_slice(&enc);
            self.se.depth_tracking.end_unsized();
        }
        Ok(())
    }
}

pub struct TupleSerializer<'a> {
    se: &'a mut PackSerializer,
}

impl<'a> TupleSerializer<'a> {
    fn new(se: &'a mut PackSerializer) -> Self {
        Self { se }
    }
}

impl<'a> SerializeTuple for TupleSerializer<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeTupleStruct for TupleSerializer<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeTupleVariant for TupleSerializer<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

/// Map entries are buffered one encoded entry at a time, then flushed in key
/// order once the pair count is known. The map marker always goes out at the
/// end, so known and unknown lengths take the same path.
pub struct MapSerializer<'a> {
    se: &'a mut PackSerializer,
    map: BTreeMap<Key, Vec<u8>>,
    pending_key: Option<Key>,
}

impl<'a> MapSerializer<'a> {
    fn new(se: &'a mut PackSerializer) -> Result<Self> {
        // Placeholder frame; the real marker goes out in end() once the pair
        // count is known
        se.depth_tracking
            .track(&Element::Map(u32::MAX as usize))?;
        Ok(Self {
            se,
            map: BTreeMap::new(),
            pending_key: None,
        })
    }
}

impl<'a> SerializeMap for MapSerializer<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<()> {
        self.pending_key = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| Error::SerdeFail("map value came without a key".to_string()))?;
        // Slot in a buffer, fill it like we're writing to the actual buffer,
        // then store it off for reordering
        let buf = mem::take(&mut self.se.buf);
        self.se.encode_key(&key)?;
        value.serialize(&mut *self.se)?;
        let entry = mem::replace(&mut self.se.buf, buf);
        self.map.insert(key, entry);
        Ok(())
    }

    fn end(self) -> Result<()> {
        serialize_elem(&mut self.se.buf, Element::Map(self.map.len()))?;
        for (_, entry) in self.map.iter() {
            self.se.buf.extend_from_slice(entry);
        }
        self.se.depth_tracking.end_unsized();
        Ok(())
    }
}

pub struct StructSerializer<'a> {
    se: &'a mut PackSerializer,
    map: BTreeMap<Key, Vec<u8>>,
}

impl<'a> StructSerializer<'a> {
    fn new(se: &'a mut PackSerializer) -> Self {
        Self {
            se,
            map: BTreeMap::new(),
        }
    }

    fn serialize_field_inner<T: Serialize + ?Sized>(
        &mut self,
        field: &'static str,
        value: &T,
    ) -> Result<()> {
        let key = Key::from(field);
        let buf = mem::take(&mut self.se.buf);
        self.se.encode_key(&key)?;
        value.serialize(&mut *self.se)?;
        let entry = mem::replace(&mut self.se.buf, buf);
        self.map.insert(key, entry);
        Ok(())
    }

    fn end_inner(self) -> Result<()> {
        // The map marker already went out with the struct's field count
        for (_, entry) in self.map.iter() {
            self.se.buf.extend_from_slice(entry);
        }
        Ok(())
    }
}

impl<'a> SerializeStruct for StructSerializer<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        field: &'static str,
        value: &T,
    ) -> Result<()> {
        self.serialize_field_inner(field, value)
    }

    fn end(self) -> Result<()> {
        self.end_inner()
    }
}

impl<'a> SerializeStructVariant for StructSerializer<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        field: &'static str,
        value: &T,
    ) -> Result<()> {
        self.serialize_field_inner(field, value)
    }

    fn end(self) -> Result<()> {
        self.end_inner()
    }
}

// Turns a serialized map key into a `Key`, failing on anything that isn't an
// integer or text.
struct KeySerializer;

impl KeySerializer {
    fn fail(received: &'static str) -> Error {
        Error::BadKey(format!(
            "Map keys must be integers or text, got {}",
            received
        ))
    }
}

impl Serializer for KeySerializer {
    type Ok = Key;
    type Error = Error;
    type SerializeSeq = Impossible<Key, Error>;
    type SerializeTuple = Impossible<Key, Error>;
    type SerializeTupleStruct = Impossible<Key, Error>;
    type SerializeTupleVariant = Impossible<Key, Error>;
    type SerializeMap = Impossible<Key, Error>;
    type SerializeStruct = Impossible<Key, Error>;
    type SerializeStructVariant = Impossible<Key, Error>;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, _: bool) -> Result<Key> {
        Err(Self::fail("a boolean"))
    }

    fn serialize_i8(self, v: i8) -> Result<Key> {
        Ok(Key::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Key> {
        Ok(Key::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Key> {
        Ok(Key::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Key> {
        Ok(Key::from(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Key> {
        Ok(Key::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Key> {
        Ok(Key::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Key> {
        Ok(Key::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Key> {
        Ok(Key::from(v))
    }

    fn serialize_f32(self, _: f32) -> Result<Key> {
        Err(Self::fail("a float"))
    }

    fn serialize_f64(self, _: f64) -> Result<Key> {
        Err(Self::fail("a float"))
    }

    fn serialize_char(self, v: char) -> Result<Key> {
        let mut buf = [0u8; 4];
        Ok(Key::from(&*v.encode_utf8(&mut buf)))
    }

    fn serialize_str(self, v: &str) -> Result<Key> {
        Ok(Key::from(v))
    }

    fn serialize_bytes(self, _: &[u8]) -> Result<Key> {
        Err(Self::fail("a byte string"))
    }

    fn serialize_none(self) -> Result<Key> {
        Err(Self::fail("a null"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, v: &T) -> Result<Key> {
        v.serialize(self)
    }

    fn serialize_unit(self) -> Result<Key> {
        Err(Self::fail("a null"))
    }

    fn serialize_unit_struct(self, _: &'static str) -> Result<Key> {
        Err(Self::fail("a unit struct"))
    }

    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
    ) -> Result<Key> {
        Ok(Key::from(variant))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        v: &T,
    ) -> Result<Key> {
        v.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: &T,
    ) -> Result<Key> {
        Err(Self::fail("an enum variant"))
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(Self::fail("an array"))
    }

    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple> {
        Err(Self::fail("an array"))
    }

    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Result<Self::SerializeTupleStruct> {
        Err(Self::fail("an array"))
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(Self::fail("an enum variant"))
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap> {
        Err(Self::fail("a map"))
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Self::SerializeStruct> {
        Err(Self::fail("a map"))
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(Self::fail("an enum variant"))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Serialize;
    use std::collections::BTreeMap as StdBTreeMap;

    #[test]
    fn scalars() {
        assert_eq!(to_vec(&0u8).unwrap(), &[0x00]);
        assert_eq!(to_vec(&-1i32).unwrap(), &[0x20]);
        assert_eq!(to_vec(&"a").unwrap(), &[0x61, 0x61]);
        assert_eq!(to_vec(&true).unwrap(), &[0xf5]);
        assert_eq!(to_vec(&()).unwrap(), &[0xf6]);
        assert_eq!(to_vec(&Option::<u8>::None).unwrap(), &[0xf6]);
        assert_eq!(
            to_vec(&1.0f32).unwrap(),
            &[0xfb, 0x3f, 0xf0, 0, 0, 0, 0, 0, 0],
            "f32 should widen to binary64"
        );
    }

    #[test]
    fn struct_fields_canonical() {
        #[derive(Serialize)]
        struct Example {
            beta: u8,
            alpha: u8,
        }
        let enc = to_vec(&Example { beta: 2, alpha: 1 }).unwrap();
        // {"alpha": 1, "beta": 2} with keys in text order
        assert_eq!(
            enc,
            &[
                0xa2, 0x65, 0x61, 0x6c, 0x70, 0x68, 0x61, 0x01, 0x64, 0x62, 0x65, 0x74, 0x61,
                0x02,
            ]
        );
    }

    #[test]
    fn int_keyed_map() {
        let mut map = StdBTreeMap::new();
        map.insert(10i32, "b");
        map.insert(9i32, "a");
        let enc = to_vec(&map).unwrap();
        // 10 sorts before 9 in text form
        assert_eq!(enc, &[0xa2, 0x0a, 0x61, 0x62, 0x09, 0x61, 0x61]);
    }

    #[test]
    fn bad_key_rejected() {
        let mut map = StdBTreeMap::new();
        map.insert(vec![1u8], "x");
        assert!(matches!(to_vec(&map), Err(Error::BadKey(_))));
    }

    #[test]
    fn bytes_via_serde_bytes() {
        #[derive(Serialize)]
        struct Blob<'a> {
            #[serde(with = "serde_bytes")]
            data: &'a [u8],
        }
        let enc = to_vec(&Blob { data: &[1, 2, 3] }).unwrap();
        assert_eq!(enc, &[0xa1, 0x64, 0x64, 0x61, 0x74, 0x61, 0x43, 1, 2, 3]);
    }

    #[test]
    fn enum_variants() {
        #[derive(Serialize)]
        enum Shape {
            Unit,
            Newtype(u8),
            Tuple(u8, u8),
            Struct { x: u8 },
        }
        assert_eq!(to_vec(&Shape::Unit).unwrap(), &[0x64, 0x55, 0x6e, 0x69, 0x74]);
        assert_eq!(
            to_vec(&Shape::Newtype(7)).unwrap(),
            &[0xa1, 0x67, 0x4e, 0x65, 0x77, 0x74, 0x79, 0x70, 0x65, 0x07]
        );
        assert_eq!(
            to_vec(&Shape::Tuple(1, 2)).unwrap(),
            &[0xa1, 0x65, 0x54, 0x75, 0x70, 0x6c, 0x65, 0x82, 0x01, 0x02]
        );
        assert_eq!(
            to_vec(&Shape::Struct { x: 9 }).unwrap(),
            &[0xa1, 0x66, 0x53, 0x74, 0x72, 0x75, 0x63, 0x74, 0xa1, 0x61, 0x78, 0x09]
        );
    }

    #[test]
    fn unknown_length_seq() {
        struct Stream;
        impl Serialize for Stream {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                let mut seq = serializer.serialize_seq(None)?;
                for i in 0u8..3 {
                    SerializeSeq::serialize_element(&mut seq, &i)?;
                }
                SerializeSeq::end(seq)
            }
        }
        assert_eq!(to_vec(&Stream).unwrap(), &[0x83, 0x00, 0x01, 0x02]);
    }
}
