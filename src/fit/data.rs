//! Field values of data records.

use crate::binary::read_string;

use super::definition::{BaseType, Endian, FieldDefinition};

/// A decoded field value.
///
/// Fields holding their type's 'invalid' marker are never published, so a
/// `Value` is always meaningful.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// Valid elements of an array field, in order.
    Array(Vec<Value>),
}

impl Value {
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::Unsigned(x) => Some(x),
            Self::Signed(x) => u64::try_from(x).ok(),
            Self::Array(ref a) => a.first().and_then(Self::as_u64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Unsigned(x) => i64::try_from(x).ok(),
            Self::Signed(x) => Some(x),
            Self::Array(ref a) => a.first().and_then(Self::as_i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Unsigned(x) => Some(x as f64),
            Self::Signed(x) => Some(x as f64),
            Self::Float(x) => Some(x),
            Self::Array(ref a) => a.first().and_then(Self::as_f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

macro_rules! element {
    ($r:expr, $endian:expr, $t:ty, $variant:ident) => {{
        let bytes = $r.try_into().ok()?;
        let x = match $endian {
            Endian::Little => <$t>::from_le_bytes(bytes),
            Endian::Big => <$t>::from_be_bytes(bytes),
        };
        (x != <$t>::MAX).then(|| Value::$variant(x.into()))
    }};
}

macro_rules! float {
    ($r:expr, $endian:expr, $bits:ty, $t:ty) => {{
        let bytes = $r.try_into().ok()?;
        let x = match $endian {
            Endian::Little => <$bits>::from_le_bytes(bytes),
            Endian::Big => <$bits>::from_be_bytes(bytes),
        };
        (x != <$bits>::MAX).then(|| Value::Float(<$t>::from_bits(x) as f64))
    }};
}

/// Decode a single element of a base type, if valid.
fn decode_element(r: &[u8], base_type: BaseType, endian: Endian) -> Option<Value> {
    match base_type {
        BaseType::Enum | BaseType::UInt8 | BaseType::UInt8z | BaseType::Byte => {
            element!(r, endian, u8, Unsigned)
        }
        BaseType::SInt8 => element!(r, endian, i8, Signed),
        BaseType::UInt16 | BaseType::UInt16z => element!(r, endian, u16, Unsigned),
        BaseType::SInt16 => element!(r, endian, i16, Signed),
        BaseType::UInt32 | BaseType::UInt32z => element!(r, endian, u32, Unsigned),
        BaseType::SInt32 => element!(r, endian, i32, Signed),
        BaseType::UInt64 | BaseType::UInt64z => element!(r, endian, u64, Unsigned),
        BaseType::SInt64 => element!(r, endian, i64, Signed),
        BaseType::Float32 => float!(r, endian, u32, f32),
        BaseType::Float64 => float!(r, endian, u64, f64),
        BaseType::String => None,
    }
}

/// Decode the bytes of one field, returning `None` if it holds no valid data.
///
/// `r` must hold exactly `field.size` bytes.
pub fn decode_field(r: &[u8], field: &FieldDefinition, endian: Endian) -> Option<Value> {
    match field.base_type {
        BaseType::String => {
            let text = read_string(r, 0, r.len());
            (!text.is_empty()).then_some(Value::Text(text))
        }
        BaseType::Byte if r.len() > 1 => {
            (!r.iter().all(|&b| b == 0xFF)).then(|| Value::Bytes(r.to_vec()))
        }
        base_type => {
            let size = base_type.size();
            if r.len() == size {
                return decode_element(r, base_type, endian);
            }
            if r.len() < size || r.len() % size != 0 {
                // Declared size does not fit the base type.
                return Some(Value::Bytes(r.to_vec()));
            }

            let elements: Vec<Value> = r
                .chunks_exact(size)
                .filter_map(|e| decode_element(e, base_type, endian))
                .collect();
            (!elements.is_empty()).then_some(Value::Array(elements))
        }
    }
}
