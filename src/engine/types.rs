//! Engine type tags
//!
//! Closed sets shared by every engine implementation:
//! - Datatype: element type of a dimension or attribute
//! - ArrayType: dense or sparse storage
//! - Layout: result/cell order of a query
//! - QueryType: read or write
//! - QueryStatus: raw status reported after a submission

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Element type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Datatype {
    Int8,
    Int16,
    Int32,
    Int64,
    #[serde(rename = "uint8")]
    UInt8,
    #[serde(rename = "uint16")]
    UInt16,
    #[serde(rename = "uint32")]
    UInt32,
    #[serde(rename = "uint64")]
    UInt64,
    Float32,
    Float64,
    /// Single byte character
    Char,
    /// ASCII string, always variable-length
    StringAscii,
    /// UTF-8 string, always variable-length
    StringUtf8,
    /// Boolean stored as one byte
    Bool,
    /// Opaque bytes
    Blob,
}

impl Datatype {
    /// Size in bytes of one element
    pub fn size(&self) -> usize {
        match self {
            Datatype::Int8
            | Datatype::UInt8
            | Datatype::Char
            | Datatype::StringAscii
            | Datatype::StringUtf8
            | Datatype::Bool
            | Datatype::Blob => 1,
            Datatype::Int16 | Datatype::UInt16 => 2,
            Datatype::Int32 | Datatype::UInt32 | Datatype::Float32 => 4,
            Datatype::Int64 | Datatype::UInt64 | Datatype::Float64 => 8,
        }
    }

    /// Returns the type name for error messages
    pub fn name(&self) -> &'static str {
        match self {
            Datatype::Int8 => "int8",
            Datatype::Int16 => "int16",
            Datatype::Int32 => "int32",
            Datatype::Int64 => "int64",
            Datatype::UInt8 => "uint8",
            Datatype::UInt16 => "uint16",
            Datatype::UInt32 => "uint32",
            Datatype::UInt64 => "uint64",
            Datatype::Float32 => "float32",
            Datatype::Float64 => "float64",
            Datatype::Char => "char",
            Datatype::StringAscii => "string_ascii",
            Datatype::StringUtf8 => "string_utf8",
            Datatype::Bool => "bool",
            Datatype::Blob => "blob",
        }
    }

    /// Signed integer types
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            Datatype::Int8 | Datatype::Int16 | Datatype::Int32 | Datatype::Int64
        )
    }

    /// Unsigned integer types, including bool
    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            Datatype::UInt8
                | Datatype::UInt16
                | Datatype::UInt32
                | Datatype::UInt64
                | Datatype::Bool
        )
    }

    /// Any integer type
    pub fn is_integral(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Datatype::Float32 | Datatype::Float64)
    }

    /// Character data: chars, strings and blobs
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            Datatype::Char | Datatype::StringAscii | Datatype::StringUtf8 | Datatype::Blob
        )
    }

    /// String types that are always variable-length
    pub fn is_var_string(&self) -> bool {
        matches!(self, Datatype::StringAscii | Datatype::StringUtf8)
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Storage layout of an array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayType {
    Dense,
    Sparse,
}

impl fmt::Display for ArrayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayType::Dense => write!(f, "dense"),
            ArrayType::Sparse => write!(f, "sparse"),
        }
    }
}

/// Cell order hint for query results (reads) or input cells (writes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    RowMajor,
    ColMajor,
    GlobalOrder,
    Unordered,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::RowMajor => "row-major",
            Layout::ColMajor => "col-major",
            Layout::GlobalOrder => "global-order",
            Layout::Unordered => "unordered",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "row-major" => Ok(Layout::RowMajor),
            "col-major" => Ok(Layout::ColMajor),
            "global-order" => Ok(Layout::GlobalOrder),
            "unordered" => Ok(Layout::Unordered),
            other => Err(format!(
                "unknown layout '{}': expected row-major, col-major, global-order or unordered",
                other
            )),
        }
    }
}

/// Mode an array is opened in, and thereby the type of its queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Read,
    Write,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::Read => write!(f, "read"),
            QueryType::Write => write!(f, "write"),
        }
    }
}

/// Raw status of an engine query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Uninitialized,
    InProgress,
    /// Buffers filled before all results were produced; resubmit to resume
    Incomplete,
    Complete,
    Failed,
}

impl QueryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Uninitialized => "UNINITIALIZED",
            QueryStatus::InProgress => "INPROGRESS",
            QueryStatus::Incomplete => "INCOMPLETE",
            QueryStatus::Complete => "COMPLETE",
            QueryStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
