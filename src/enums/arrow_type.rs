//! # ArrowType Module - *Logical type tagging and the compact format codec*
//!
//! Unified Picoarrow representations of the supported *Apache Arrow*
//! interchange data types, plus the compact format-string codec used to
//! describe a type across a component boundary.
//!
//! ## Overview
//! - Covers fixed-width integer and floating-point types, boolean,
//!   variable-length binary/UTF-8 (32- and 64-bit offsets), fixed-size
//!   binary, list/large-list/fixed-size-list, struct, and
//!   dictionary-encoded types.
//! - Each type knows its format code, required child arity, and storage
//!   geometry (fixed byte width, offset width), which together drive array
//!   construction and decoding.
//! - A dictionary-encoded type's format string is its *index* type's code;
//!   the values type travels on the attached dictionary schema, matching
//!   the interchange convention.
//!
//! ## Copyright Notice
//! - The `Picoarrow` crate is not affiliated with the `Apache Arrow` project.
//! - The term `Apache Arrow` is a trademark of the *Apache Software Foundation*.
//! - The term `Arrow` is used here under fair use to implement the public
//!   interoperability standard, in accordance with the official guidance:
//!   <https://www.apache.org/foundation/marks/>.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::enums::error::PicoarrowError;

/// # ArrowType
///
/// Logical type discriminant for schemas and arrays.
///
/// ## Purpose
/// - Encodes the physical layout contract of one column: how many buffers
///   an array of this type carries, how many children it owns, and how its
///   value bytes are addressed.
/// - Provides a single discriminant used across the crate for schema
///   construction, append dispatch, and decode validation.
///
/// ## Notes
/// - `FixedSizeBinary` and `FixedSizeList` carry their width/size parameter;
///   both must be positive.
/// - `Dictionary` carries only the index width. The values type lives on the
///   schema's dictionary slot, since the wire format describes it there.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrowType {
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Binary,
    LargeBinary,
    String,
    LargeString,
    FixedSizeBinary(i32),
    List,
    LargeList,
    FixedSizeList(i32),
    Struct,
    Dictionary(DictionaryIndex),
}

/// Integer width of the key column that indexes into a dictionary's values.
///
/// Smaller widths reduce the footprint of low-cardinality data; larger
/// widths allow more distinct values without overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryIndex {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
}

impl DictionaryIndex {
    /// The plain integer type backing this index width.
    #[inline]
    pub fn index_type(&self) -> ArrowType {
        match self {
            DictionaryIndex::Int8 => ArrowType::Int8,
            DictionaryIndex::Int16 => ArrowType::Int16,
            DictionaryIndex::Int32 => ArrowType::Int32,
            DictionaryIndex::Int64 => ArrowType::Int64,
            DictionaryIndex::UInt8 => ArrowType::UInt8,
            DictionaryIndex::UInt16 => ArrowType::UInt16,
            DictionaryIndex::UInt32 => ArrowType::UInt32,
            DictionaryIndex::UInt64 => ArrowType::UInt64,
        }
    }
}

/// Width of an offsets buffer for variable-length and list types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetWidth {
    Bits32,
    Bits64,
}

impl ArrowType {
    /// Constructs the compact format string for this type.
    ///
    /// Dictionary-encoded types render their index type's code; the values
    /// type is described by the dictionary schema attached alongside.
    pub fn format(&self) -> String {
        match self {
            ArrowType::Null => "n".to_string(),
            ArrowType::Boolean => "b".to_string(),
            ArrowType::Int8 => "c".to_string(),
            ArrowType::UInt8 => "C".to_string(),
            ArrowType::Int16 => "s".to_string(),
            ArrowType::UInt16 => "S".to_string(),
            ArrowType::Int32 => "i".to_string(),
            ArrowType::UInt32 => "I".to_string(),
            ArrowType::Int64 => "l".to_string(),
            ArrowType::UInt64 => "L".to_string(),
            ArrowType::Float32 => "f".to_string(),
            ArrowType::Float64 => "g".to_string(),
            ArrowType::Binary => "z".to_string(),
            ArrowType::LargeBinary => "Z".to_string(),
            ArrowType::String => "u".to_string(),
            ArrowType::LargeString => "U".to_string(),
            ArrowType::FixedSizeBinary(width) => format!("w:{width}"),
            ArrowType::List => "+l".to_string(),
            ArrowType::LargeList => "+L".to_string(),
            ArrowType::FixedSizeList(size) => format!("+w:{size}"),
            ArrowType::Struct => "+s".to_string(),
            ArrowType::Dictionary(idx) => idx.index_type().format(),
        }
    }

    /// Parses a compact format string back into a logical type.
    ///
    /// Total over well-formed strings; rejects unknown codes, missing or
    /// non-numeric parameters, and non-positive widths. Never yields
    /// `Dictionary` - that encoding is resolved at the schema level from the
    /// presence of a dictionary descriptor.
    pub fn parse_format(format: &str) -> Result<ArrowType, PicoarrowError> {
        let dtype = match format {
            "n" => ArrowType::Null,
            "b" => ArrowType::Boolean,
            "c" => ArrowType::Int8,
            "C" => ArrowType::UInt8,
            "s" => ArrowType::Int16,
            "S" => ArrowType::UInt16,
            "i" => ArrowType::Int32,
            "I" => ArrowType::UInt32,
            "l" => ArrowType::Int64,
            "L" => ArrowType::UInt64,
            "f" => ArrowType::Float32,
            "g" => ArrowType::Float64,
            "z" => ArrowType::Binary,
            "Z" => ArrowType::LargeBinary,
            "u" => ArrowType::String,
            "U" => ArrowType::LargeString,
            "+l" => ArrowType::List,
            "+L" => ArrowType::LargeList,
            "+s" => ArrowType::Struct,
            other => {
                if let Some(param) = other.strip_prefix("+w:") {
                    ArrowType::FixedSizeList(parse_size_param(param, "fixed-size list")?)
                } else if let Some(param) = other.strip_prefix("w:") {
                    ArrowType::FixedSizeBinary(parse_size_param(param, "fixed-size binary")?)
                } else {
                    return Err(PicoarrowError::format(format!(
                        "unknown format code '{other}'"
                    )));
                }
            }
        };
        Ok(dtype)
    }

    /// Number of children the type requires, or `None` when the caller
    /// chooses the arity (struct).
    #[inline]
    pub fn required_children(&self) -> Option<usize> {
        match self {
            ArrowType::List | ArrowType::LargeList | ArrowType::FixedSizeList(_) => Some(1),
            ArrowType::Struct => None,
            _ => Some(0),
        }
    }

    /// Byte width of one stored element for fixed-width storage, or `None`
    /// for boolean (bit-packed), variable-length, nested, and null types.
    ///
    /// Dictionary-encoded types report their index width - that is what the
    /// value buffer stores.
    #[inline]
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            ArrowType::Int8 | ArrowType::UInt8 => Some(1),
            ArrowType::Int16 | ArrowType::UInt16 => Some(2),
            ArrowType::Int32 | ArrowType::UInt32 | ArrowType::Float32 => Some(4),
            ArrowType::Int64 | ArrowType::UInt64 | ArrowType::Float64 => Some(8),
            ArrowType::FixedSizeBinary(width) => Some(*width as usize),
            ArrowType::Dictionary(idx) => idx.index_type().fixed_width(),
            _ => None,
        }
    }

    /// Offsets-buffer width for variable-length and list types.
    #[inline]
    pub fn offset_width(&self) -> Option<OffsetWidth> {
        match self {
            ArrowType::Binary | ArrowType::String | ArrowType::List => Some(OffsetWidth::Bits32),
            ArrowType::LargeBinary | ArrowType::LargeString | ArrowType::LargeList => {
                Some(OffsetWidth::Bits64)
            }
            _ => None,
        }
    }

    /// Total buffer count the interchange layout prescribes for this type,
    /// counting the validity bitmap slot.
    #[inline]
    pub fn buffer_count(&self) -> usize {
        match self {
            ArrowType::Null => 0,
            ArrowType::Struct | ArrowType::FixedSizeList(_) => 1,
            ArrowType::Binary
            | ArrowType::LargeBinary
            | ArrowType::String
            | ArrowType::LargeString => 3,
            ArrowType::List | ArrowType::LargeList => 2,
            _ => 2,
        }
    }

    /// True for types whose value bytes are addressed through an offsets
    /// buffer into a companion data buffer.
    #[inline]
    pub fn is_variable_binary(&self) -> bool {
        matches!(
            self,
            ArrowType::Binary | ArrowType::LargeBinary | ArrowType::String | ArrowType::LargeString
        )
    }
}

fn parse_size_param(param: &str, what: &str) -> Result<i32, PicoarrowError> {
    if param.is_empty() {
        return Err(PicoarrowError::format(format!(
            "{what} format is missing its size parameter"
        )));
    }
    let size: i32 = param.parse().map_err(|_| {
        PicoarrowError::format(format!("{what} size parameter '{param}' is not numeric"))
    })?;
    if size <= 0 {
        return Err(PicoarrowError::format(format!(
            "{what} size must be positive, got {size}"
        )));
    }
    Ok(size)
}

impl Display for ArrowType {
    /// Render the ArrowType as its variant name, including parameters where applicable.
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ArrowType::Null => f.write_str("Null"),
            ArrowType::Boolean => f.write_str("Boolean"),
            ArrowType::Int8 => f.write_str("Int8"),
            ArrowType::Int16 => f.write_str("Int16"),
            ArrowType::Int32 => f.write_str("Int32"),
            ArrowType::Int64 => f.write_str("Int64"),
            ArrowType::UInt8 => f.write_str("UInt8"),
            ArrowType::UInt16 => f.write_str("UInt16"),
            ArrowType::UInt32 => f.write_str("UInt32"),
            ArrowType::UInt64 => f.write_str("UInt64"),
            ArrowType::Float32 => f.write_str("Float32"),
            ArrowType::Float64 => f.write_str("Float64"),
            ArrowType::Binary => f.write_str("Binary"),
            ArrowType::LargeBinary => f.write_str("LargeBinary"),
            ArrowType::String => f.write_str("String"),
            ArrowType::LargeString => f.write_str("LargeString"),
            ArrowType::FixedSizeBinary(width) => write!(f, "FixedSizeBinary({width})"),
            ArrowType::List => f.write_str("List"),
            ArrowType::LargeList => f.write_str("LargeList"),
            ArrowType::FixedSizeList(size) => write!(f, "FixedSizeList({size})"),
            ArrowType::Struct => f.write_str("Struct"),
            ArrowType::Dictionary(idx) => write!(f, "Dictionary({idx})"),
        }
    }
}

impl Display for DictionaryIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DictionaryIndex::Int8 => f.write_str("Int8"),
            DictionaryIndex::Int16 => f.write_str("Int16"),
            DictionaryIndex::Int32 => f.write_str("Int32"),
            DictionaryIndex::Int64 => f.write_str("Int64"),
            DictionaryIndex::UInt8 => f.write_str("UInt8"),
            DictionaryIndex::UInt16 => f.write_str("UInt16"),
            DictionaryIndex::UInt32 => f.write_str("UInt32"),
            DictionaryIndex::UInt64 => f.write_str("UInt64"),
        }
    }
}
