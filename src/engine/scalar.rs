//! Scalar values for coordinates, cell values and predicate operands
//!
//! The set of value kinds is closed: integral, unsigned integral, floating
//! point and string. Every engine datatype maps onto exactly one of them.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::Datatype;

/// A single typed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Kind name for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Scalar::Int(_) => "int",
            Scalar::UInt(_) => "uint",
            Scalar::Float(_) => "float",
            Scalar::Str(_) => "string",
        }
    }

    /// Converts to the canonical variant for `datatype`.
    ///
    /// Returns None if the value cannot be represented, e.g. a string for an
    /// integer column or 300 for an int8 column.
    pub fn coerce(&self, datatype: Datatype) -> Option<Scalar> {
        match datatype {
            Datatype::Int8 => self.as_i64().filter(|v| i8::try_from(*v).is_ok()).map(Scalar::Int),
            Datatype::Int16 => self.as_i64().filter(|v| i16::try_from(*v).is_ok()).map(Scalar::Int),
            Datatype::Int32 => self.as_i64().filter(|v| i32::try_from(*v).is_ok()).map(Scalar::Int),
            Datatype::Int64 => self.as_i64().map(Scalar::Int),
            Datatype::UInt8 => self.as_u64().filter(|v| u8::try_from(*v).is_ok()).map(Scalar::UInt),
            Datatype::UInt16 => self
                .as_u64()
                .filter(|v| u16::try_from(*v).is_ok())
                .map(Scalar::UInt),
            Datatype::UInt32 => self
                .as_u64()
                .filter(|v| u32::try_from(*v).is_ok())
                .map(Scalar::UInt),
            Datatype::UInt64 => self.as_u64().map(Scalar::UInt),
            Datatype::Bool => self.as_u64().filter(|v| *v <= 1).map(Scalar::UInt),
            Datatype::Float32 | Datatype::Float64 => match self {
                Scalar::Float(v) => Some(Scalar::Float(*v)),
                Scalar::Int(v) => Some(Scalar::Float(*v as f64)),
                Scalar::UInt(v) => Some(Scalar::Float(*v as f64)),
                Scalar::Str(_) => None,
            },
            Datatype::Char => match self {
                Scalar::Str(s) if s.len() == 1 => Some(self.clone()),
                _ => None,
            },
            Datatype::StringAscii => match self {
                Scalar::Str(s) if s.is_ascii() => Some(self.clone()),
                _ => None,
            },
            Datatype::StringUtf8 | Datatype::Blob => match self {
                Scalar::Str(_) => Some(self.clone()),
                _ => None,
            },
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            Scalar::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    fn as_u64(&self) -> Option<u64> {
        match self {
            Scalar::UInt(v) => Some(*v),
            Scalar::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Orders two scalars of compatible kinds. Mixed numeric kinds compare
    /// numerically; strings compare bytewise; anything else is unordered.
    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => Some(a.cmp(b)),
            (Scalar::UInt(a), Scalar::UInt(b)) => Some(a.cmp(b)),
            (Scalar::Int(a), Scalar::UInt(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
            (Scalar::UInt(a), Scalar::Int(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
            (Scalar::Str(a), Scalar::Str(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (Scalar::Str(_), _) | (_, Scalar::Str(_)) => None,
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::UInt(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            Scalar::Str(_) => None,
        }
    }

    /// Appends the in-memory representation of a coerced value.
    ///
    /// Fixed-size types are written in native byte order, matching the typed
    /// views handed out by column buffers. Strings append their bytes.
    pub fn encode(&self, datatype: Datatype, out: &mut Vec<u8>) {
        match (datatype, self) {
            (Datatype::Int8, Scalar::Int(v)) => out.extend_from_slice(&(*v as i8).to_ne_bytes()),
            (Datatype::Int16, Scalar::Int(v)) => out.extend_from_slice(&(*v as i16).to_ne_bytes()),
            (Datatype::Int32, Scalar::Int(v)) => out.extend_from_slice(&(*v as i32).to_ne_bytes()),
            (Datatype::Int64, Scalar::Int(v)) => out.extend_from_slice(&v.to_ne_bytes()),
            (Datatype::UInt8 | Datatype::Bool, Scalar::UInt(v)) => out.push(*v as u8),
            (Datatype::UInt16, Scalar::UInt(v)) => {
                out.extend_from_slice(&(*v as u16).to_ne_bytes())
            }
            (Datatype::UInt32, Scalar::UInt(v)) => {
                out.extend_from_slice(&(*v as u32).to_ne_bytes())
            }
            (Datatype::UInt64, Scalar::UInt(v)) => out.extend_from_slice(&v.to_ne_bytes()),
            (Datatype::Float32, Scalar::Float(v)) => {
                out.extend_from_slice(&(*v as f32).to_ne_bytes())
            }
            (Datatype::Float64, Scalar::Float(v)) => out.extend_from_slice(&v.to_ne_bytes()),
            (dt, Scalar::Str(s)) if dt.is_string() => out.extend_from_slice(s.as_bytes()),
            // Uncoerced input: encode through the canonical form, or zero-fill.
            (dt, other) => match other.coerce(dt) {
                Some(coerced) if coerced != *other => coerced.encode(dt, out),
                _ => out.resize(out.len() + dt.size(), 0),
            },
        }
    }

    /// Decodes one cell. Fixed-size types expect exactly `datatype.size()`
    /// bytes; string types take the whole slice.
    pub fn decode(datatype: Datatype, bytes: &[u8]) -> Option<Scalar> {
        fn arr<const N: usize>(bytes: &[u8]) -> Option<[u8; N]> {
            bytes.try_into().ok()
        }
        let value = match datatype {
            Datatype::Int8 => Scalar::Int(i8::from_ne_bytes(arr(bytes)?) as i64),
            Datatype::Int16 => Scalar::Int(i16::from_ne_bytes(arr(bytes)?) as i64),
            Datatype::Int32 => Scalar::Int(i32::from_ne_bytes(arr(bytes)?) as i64),
            Datatype::Int64 => Scalar::Int(i64::from_ne_bytes(arr(bytes)?)),
            Datatype::UInt8 | Datatype::Bool => Scalar::UInt(u8::from_ne_bytes(arr(bytes)?) as u64),
            Datatype::UInt16 => Scalar::UInt(u16::from_ne_bytes(arr(bytes)?) as u64),
            Datatype::UInt32 => Scalar::UInt(u32::from_ne_bytes(arr(bytes)?) as u64),
            Datatype::UInt64 => Scalar::UInt(u64::from_ne_bytes(arr(bytes)?)),
            Datatype::Float32 => Scalar::Float(f32::from_ne_bytes(arr(bytes)?) as f64),
            Datatype::Float64 => Scalar::Float(f64::from_ne_bytes(arr(bytes)?)),
            Datatype::Char | Datatype::StringAscii | Datatype::StringUtf8 | Datatype::Blob => {
                Scalar::Str(String::from_utf8_lossy(bytes).into_owned())
            }
        };
        Some(value)
    }

    /// Parses text as a value of `datatype` (CLI input)
    pub fn parse_as(datatype: Datatype, text: &str) -> Option<Scalar> {
        let parsed = if datatype.is_signed() {
            Scalar::Int(text.trim().parse().ok()?)
        } else if datatype.is_unsigned() {
            Scalar::UInt(text.trim().parse().ok()?)
        } else if datatype.is_float() {
            Scalar::Float(text.trim().parse().ok()?)
        } else {
            Scalar::Str(text.to_string())
        };
        parsed.coerce(datatype)
    }

    /// JSON form used by result printers
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Int(v) => serde_json::Value::from(*v),
            Scalar::UInt(v) => serde_json::Value::from(*v),
            Scalar::Float(v) => serde_json::Value::from(*v),
            Scalar::Str(s) => serde_json::Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::UInt(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Str(s) => write!(f, "'{}'", s),
        }
    }
}

macro_rules! scalar_from {
    ($variant:ident as $target:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Scalar {
                fn from(v: $t) -> Self {
                    Scalar::$variant(v as $target)
                }
            }
        )*
    };
}

scalar_from!(Int as i64: i8, i16, i32, i64);
scalar_from!(UInt as u64: u8, u16, u32, u64);
scalar_from!(Float as f64: f32, f64);

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

impl From<&String> for Scalar {
    fn from(v: &String) -> Self {
        Scalar::Str(v.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_narrow_integers() {
        assert_eq!(Scalar::Int(100).coerce(Datatype::Int8), Some(Scalar::Int(100)));
        assert_eq!(Scalar::Int(300).coerce(Datatype::Int8), None);
        assert_eq!(Scalar::Int(-1).coerce(Datatype::UInt32), None);
        assert_eq!(Scalar::Int(7).coerce(Datatype::UInt32), Some(Scalar::UInt(7)));
    }

    #[test]
    fn test_coerce_rejects_wrong_kind() {
        assert_eq!(Scalar::from("chr1").coerce(Datatype::Int32), None);
        assert_eq!(Scalar::Int(1).coerce(Datatype::StringAscii), None);
        assert_eq!(Scalar::from("é").coerce(Datatype::StringAscii), None);
        assert!(Scalar::from("é").coerce(Datatype::StringUtf8).is_some());
    }

    #[test]
    fn test_coerce_ints_to_float() {
        assert_eq!(Scalar::Int(3).coerce(Datatype::Float64), Some(Scalar::Float(3.0)));
    }

    #[test]
    fn test_compare_mixed_numeric() {
        assert_eq!(Scalar::Int(-1).compare(&Scalar::UInt(0)), Some(Ordering::Less));
        assert_eq!(Scalar::Int(2).compare(&Scalar::Float(1.5)), Some(Ordering::Greater));
        assert_eq!(Scalar::from("a").compare(&Scalar::Int(1)), None);
        assert_eq!(Scalar::from("abc").compare(&Scalar::from("abd")), Some(Ordering::Less));
    }

    #[test]
    fn test_encode_then_decode_int32() {
        let mut bytes = Vec::new();
        Scalar::Int(-42).encode(Datatype::Int32, &mut bytes);
        assert_eq!(bytes.len(), 4);
        assert_eq!(Scalar::decode(Datatype::Int32, &bytes), Some(Scalar::Int(-42)));
    }

    #[test]
    fn test_decode_wrong_width_fails() {
        assert_eq!(Scalar::decode(Datatype::Int64, &[0u8; 4]), None);
    }

    #[test]
    fn test_parse_as() {
        assert_eq!(Scalar::parse_as(Datatype::Int32, "17"), Some(Scalar::Int(17)));
        assert_eq!(Scalar::parse_as(Datatype::Float32, "0.5"), Some(Scalar::Float(0.5)));
        assert_eq!(Scalar::parse_as(Datatype::StringAscii, "chr2"), Some(Scalar::from("chr2")));
        assert_eq!(Scalar::parse_as(Datatype::UInt8, "-3"), None);
    }

    #[test]
    fn test_untagged_json() {
        let values: Vec<Scalar> = serde_json::from_str(r#"[1, -2, 1.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![Scalar::Int(1), Scalar::Int(-2), Scalar::Float(1.5), Scalar::from("x")]
        );
    }
}
