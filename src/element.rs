use byteorder::ReadBytesExt;

use crate::depth_tracking::DepthTracker;
use crate::error::{Error, Result};
use crate::marker::{Major, Marker, SimpleValue, ARG_U16, ARG_U32, ARG_U64, ARG_U8};
use crate::{Integer, MAX_CONTAINER_LEN, MAX_SAFE_INT};

/// A single decoded item header or scalar. Borrowed where possible; `Array`,
/// `Map`, and `Tag` only carry their argument, with the children following as
/// further elements in the stream.
#[derive(Clone, Debug)]
pub enum Element<'a> {
    Null,
    Undefined,
    Bool(bool),
    Int(Integer),
    F64(f64),
    Str(&'a str),
    Bin(&'a [u8]),
    Array(usize),
    Map(usize),
    Tag(u64),
}

impl<'a> Element<'a> {
    pub fn name(&self) -> &'static str {
        use self::Element::*;
        match self {
            Null => "Null",
            Undefined => "Undefined",
            Bool(_) => "Bool",
            Int(_) => "Int",
            F64(_) => "F64",
            Str(_) => "Str",
            Bin(_) => "Bin",
            Array(_) => "Array",
            Map(_) => "Map",
            Tag(_) => "Tag",
        }
    }

}

/// Write an initial byte for `major`, with `arg` in the shortest valid
/// argument representation.
fn serialize_marker(buf: &mut Vec<u8>, major: Major, arg: u64) {
    let base = major.into_u8();
    if arg <= 23 {
        buf.push(base | (arg as u8));
    } else if arg <= u8::MAX as u64 {
        buf.push(base | ARG_U8);
        buf.push(arg as u8);
    } else if arg <= u16::MAX as u64 {
        buf.push(base | ARG_U16);
        buf.extend_from_slice(&(arg as u16).to_be_bytes());
    } else if arg <= u32::MAX as u64 {
        buf.push(base | ARG_U32);
        buf.extend_from_slice(&(arg as u32).to_be_bytes());
    } else {
        buf.push(base | ARG_U64);
        buf.extend_from_slice(&arg.to_be_bytes());
    }
}

/// Serialize an element onto a byte vector. Doesn't check if Array & Map
/// structures make sense, just writes elements out. Fails on integers outside
/// the safe interchange range and on containers past the element ceiling.
pub fn serialize_elem(buf: &mut Vec<u8>, elem: Element) -> Result<()> {
    use self::Element::*;
    match elem {
        Null => buf.push(Major::Simple.into_u8() | SimpleValue::Null.into_u8()),
        Undefined => buf.push(Major::Simple.into_u8() | SimpleValue::Undefined.into_u8()),
        Bool(v) => buf.push(
            Major::Simple.into_u8()
                | if v {
                    SimpleValue::True.into_u8()
                } else {
                    SimpleValue::False.into_u8()
                },
        ),
        Int(v) => {
            if !v.is_safe() {
                return Err(Error::BadEncode(format!(
                    "Integer {} is outside the safe interchange range",
                    v
                )));
            }
            if v.is_negative() {
                // The wire argument for a negative value is |v| - 1
                serialize_marker(buf, Major::NegInt, v.magnitude() - 1);
            } else {
                serialize_marker(buf, Major::PosInt, v.magnitude());
            }
        }
        F64(v) => {
            buf.push(Major::Simple.into_u8() | ARG_U64);
            buf.extend_from_slice(&v.to_bits().to_be_bytes());
        }
        Str(v) => {
            serialize_marker(buf, Major::Str, v.len() as u64);
            buf.extend_from_slice(v.as_bytes());
        }
        Bin(v) => {
            serialize_marker(buf, Major::Bin, v.len() as u64);
            buf.extend_from_slice(v);
        }
        Array(len) => {
            if len > MAX_CONTAINER_LEN {
                return Err(Error::ParseLimit(format!(
                    "Array length {} exceeds the {} element limit",
                    len, MAX_CONTAINER_LEN
                )));
            }
            serialize_marker(buf, Major::Array, len as u64);
        }
        Map(len) => {
            if len > MAX_CONTAINER_LEN {
                return Err(Error::ParseLimit(format!(
                    "Map length {} exceeds the {} pair limit",
                    len, MAX_CONTAINER_LEN
                )));
            }
            serialize_marker(buf, Major::Map, len as u64);
        }
        Tag(v) => serialize_marker(buf, Major::Tag, v),
    }
    Ok(())
}

/// Widen an IEEE-754 binary16 value to binary64.
fn f16_to_f64(half: u16) -> f64 {
    let exp = (half >> 10) & 0x1f;
    let mant = (half & 0x3ff) as f64;
    let val = match exp {
        0 => mant * (-24f64).exp2(),
        31 => {
            if mant == 0.0 {
                f64::INFINITY
            } else {
                f64::NAN
            }
        }
        _ => (mant + 1024.0) * f64::from(exp as i32 - 25).exp2(),
    };
    if half & 0x8000 != 0 {
        -val
    } else {
        val
    }
}

/// A pull parser over a byte slice, yielding one [`Element`] at a time.
///
/// Every multi-byte read is checked against the remaining input, container
/// arities are checked against [`MAX_CONTAINER_LEN`](crate::MAX_CONTAINER_LEN),
/// and nesting is checked against [`MAX_DEPTH`](crate::MAX_DEPTH). Once a
/// parse fails the parser yields nothing further.
#[derive(Clone, Debug)]
pub struct Parser<'a> {
    data: &'a [u8],
    depth_tracking: DepthTracker,
    errored: bool,
}

impl<'a> Parser<'a> {
    pub fn new(data: &'a [u8]) -> Parser<'a> {
        Self {
            data,
            depth_tracking: DepthTracker::new(),
            errored: false,
        }
    }

    pub(crate) fn peek_marker(&self) -> Option<Marker> {
        self.data.first().map(|n| Marker::from_u8(*n))
    }

    /// How many bytes of input haven't been parsed yet.
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    /// Verify the parser consumed its entire input.
    pub fn finish(self) -> Result<()> {
        if self.data.is_empty() {
            Ok(())
        } else {
            Err(Error::BadEncode(format!(
                "{} bytes of trailing data after the last item",
                self.data.len()
            )))
        }
    }

    // Read the argument selected by the marker's additional info. The marker
    // byte itself has already been consumed.
    fn read_arg(&mut self, marker: Marker) -> Result<u64> {
        match marker.info {
            0..=23 => Ok(marker.info as u64),
            ARG_U8 => {
                let v = self.data.read_u8().map_err(|_| Error::LengthTooShort {
                    step: "decode 1-byte argument",
                    actual: 0,
                    expected: 1,
                })?;
                Ok(v as u64)
            }
            ARG_U16 => {
                let v = self
                    .data
                    .read_u16::<byteorder::BigEndian>()
                    .map_err(|_| Error::LengthTooShort {
                        step: "decode 2-byte argument",
                        actual: self.data.len(),
                        expected: 2,
                    })?;
                Ok(v as u64)
            }
            ARG_U32 => {
                let v = self
                    .data
                    .read_u32::<byteorder::BigEndian>()
                    .map_err(|_| Error::LengthTooShort {
                        step: "decode 4-byte argument",
                        actual: self.data.len(),
                        expected: 4,
                    })?;
                Ok(v as u64)
            }
            ARG_U64 => {
                let v = self
                    .data
                    .read_u64::<byteorder::BigEndian>()
                    .map_err(|_| Error::LengthTooShort {
                        step: "decode 8-byte argument",
                        actual: self.data.len(),
                        expected: 8,
                    })?;
                Ok(v)
            }
            info => Err(Error::BadEncode(format!(
                "Invalid additional information value {}",
                info
            ))),
        }
    }

    // Split `len` raw bytes off the front of the input.
    fn read_raw(&mut self, len: usize, step: &'static str) -> Result<&'a [u8]> {
        if len > self.data.len() {
            return Err(Error::LengthTooShort {
                step,
                actual: self.data.len(),
                expected: len,
            });
        }
        let (bytes, data) = self.data.split_at(len);
        self.data = data;
        Ok(bytes)
    }

    // Given a retrieved marker, try to turn it into the next element, which
    // may move through the indexed data. If we can't, error. This function
    // *does not* set the errored flag. That's up to the caller.
    fn parse_element(&mut self, marker: Marker) -> Result<Element<'a>> {
        let elem = match marker.major {
            Major::PosInt => {
                let v = self.read_arg(marker)?;
                if v > MAX_SAFE_INT {
                    return Err(Error::ParseLimit(format!(
                        "Integer {} is outside the safe interchange range",
                        v
                    )));
                }
                Element::Int(v.into())
            }
            Major::NegInt => {
                let v = self.read_arg(marker)?;
                // The encoded argument is |v| - 1, so the magnitude check
                // shifts down by one.
                if v >= MAX_SAFE_INT {
                    return Err(Error::ParseLimit(format!(
                        "Integer -{} is outside the safe interchange range",
                        v as u128 + 1
                    )));
                }
                Element::Int((-1 - v as i64).into())
            }
            Major::Bin => {
                let len = self.read_arg(marker)? as usize;
                Element::Bin(self.read_raw(len, "get byte string content")?)
            }
            Major::Str => {
                let len = self.read_arg(marker)? as usize;
                let bytes = self.read_raw(len, "get text string content")?;
                Element::Str(std::str::from_utf8(bytes)?)
            }
            Major::Array => {
                let len = self.read_arg(marker)? as usize;
                if len > MAX_CONTAINER_LEN {
                    return Err(Error::ParseLimit(format!(
                        "Array length {} exceeds the {} element limit",
                        len, MAX_CONTAINER_LEN
                    )));
                }
                Element::Array(len)
            }
            Major::Map => {
                let len = self.read_arg(marker)? as usize;
                if len > MAX_CONTAINER_LEN {
                    return Err(Error::ParseLimit(format!(
                        "Map length {} exceeds the {} pair limit",
                        len, MAX_CONTAINER_LEN
                    )));
                }
                Element::Map(len)
            }
            Major::Tag => Element::Tag(self.read_arg(marker)?),
            Major::Simple => match marker.info {
                ARG_U16 => {
                    let v = self
                        .data
                        .read_u16::<byteorder::BigEndian>()
                        .map_err(|_| Error::LengthTooShort {
                            step: "decode binary16 float",
                            actual: self.data.len(),
                            expected: 2,
                        })?;
                    Element::F64(f16_to_f64(v))
                }
                ARG_U32 => {
                    let v = self
                        .data
                        .read_f32::<byteorder::BigEndian>()
                        .map_err(|_| Error::LengthTooShort {
                            step: "decode binary32 float",
                            actual: self.data.len(),
                            expected: 4,
                        })?;
                    Element::F64(v as f64)
                }
                ARG_U64 => {
                    let v = self
                        .data
                        .read_f64::<byteorder::BigEndian>()
                        .map_err(|_| Error::LengthTooShort {
                            step: "decode binary64 float",
                            actual: self.data.len(),
                            expected: 8,
                        })?;
                    Element::F64(v)
                }
                info => match SimpleValue::from_u8(info) {
                    Some(SimpleValue::False) => Element::Bool(false),
                    Some(SimpleValue::True) => Element::Bool(true),
                    Some(SimpleValue::Null) => Element::Null,
                    Some(SimpleValue::Undefined) => Element::Undefined,
                    None => {
                        return Err(Error::BadEncode(format!(
                            "Unsupported simple value {}",
                            info
                        )))
                    }
                },
            },
        };
        self.depth_tracking.track(&elem)?;
        Ok(elem)
    }
}

impl<'a> std::iter::Iterator for Parser<'a> {
    type Item = Result<Element<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.errored {
            return None;
        }
        let (&marker, data) = self.data.split_first()?;
        self.data = data;
        let result = self.parse_element(Marker::from_u8(marker));
        if result.is_err() {
            self.errored = true;
        }
        Some(result)
    }
}
