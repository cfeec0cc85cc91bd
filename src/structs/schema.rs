//! # Schema Module - *Recursive Field Descriptors*
//!
//! Describes one column's logical type plus nested children: format code,
//! name, nullability, ordered key/value metadata, owned child schemas, and an
//! optional dictionary-values schema for dictionary-encoded columns.
//!
//! The schema tree is exclusively owned top-down; dropping a schema drops its
//! children and dictionary exactly once through plain Rust ownership.
//!
//! Metadata follows the interchange byte layout: a little-endian `i32` pair
//! count, then per pair an `i32` key length, the key bytes, an `i32` value
//! length, and the value bytes. Keys may repeat, so the in-memory form is an
//! ordered pair list, not a deduplicating map.

use std::fmt::{Display, Formatter};

use crate::enums::arrow_type::ArrowType;
use crate::enums::error::PicoarrowError;

/// Ordered key/value metadata. Keys may repeat.
pub type Metadata = Vec<(String, Vec<u8>)>;

/// # Schema
///
/// Recursive type descriptor for one field.
///
/// ## Description
/// - `dtype` fixes the physical layout contract; [`Schema::format`] renders
///   the compact type string for the boundary.
/// - `children` arity is fixed by the type: none for primitives, one for
///   list-likes, caller-chosen for struct.
/// - `dictionary` describes the values of a dictionary-encoded column and
///   must be present exactly when `dtype` is dictionary-encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub name: Option<String>,
    pub dtype: ArrowType,
    pub nullable: bool,
    pub metadata: Metadata,
    pub children: Vec<Schema>,
    pub dictionary: Option<Box<Schema>>,
}

impl Schema {
    /// Constructs a schema from a logical type, seeding the child slots the
    /// type requires. List-like children start as a nullable `item` of type
    /// `Null` and are replaced via [`set_child`](Schema::set_child).
    ///
    /// Fails with a type error on malformed parameters (the format codec
    /// rejects them on the wire; this guards the in-memory path).
    pub fn from_type(dtype: ArrowType) -> Result<Self, PicoarrowError> {
        match dtype {
            ArrowType::FixedSizeBinary(w) if w <= 0 => {
                return Err(PicoarrowError::type_error(format!(
                    "fixed-size binary width must be positive, got {w}"
                )));
            }
            ArrowType::FixedSizeList(n) if n <= 0 => {
                return Err(PicoarrowError::type_error(format!(
                    "fixed-size list size must be positive, got {n}"
                )));
            }
            _ => {}
        }
        let children = match dtype.required_children() {
            Some(1) => vec![Schema {
                name: Some("item".to_string()),
                ..Schema::from_type(ArrowType::Null)?
            }],
            _ => Vec::new(),
        };
        Ok(Schema {
            name: None,
            dtype,
            nullable: true,
            metadata: Vec::new(),
            children,
            dictionary: None,
        })
    }

    /// Constructs a struct schema over the given fields.
    pub fn struct_of(fields: Vec<Schema>) -> Self {
        Schema {
            name: None,
            dtype: ArrowType::Struct,
            nullable: true,
            metadata: Vec::new(),
            children: fields,
            dictionary: None,
        }
    }

    /// Parses a compact format string into a schema, seeding child arity.
    pub fn parse(format: &str) -> Result<Self, PicoarrowError> {
        Schema::from_type(ArrowType::parse_format(format)?)
    }

    /// The compact format string describing this field's type.
    #[inline]
    pub fn format(&self) -> String {
        self.dtype.format()
    }

    /// Renames the field, builder-style.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks the field non-nullable, builder-style.
    pub fn non_nullable(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Replaces child `idx`, taking ownership of the new child.
    ///
    /// # Panics
    /// Panics when `idx` is beyond the seeded child slots; arity is fixed by
    /// the type, so an out-of-range index is a programming error.
    pub fn set_child(&mut self, idx: usize, child: Schema) {
        assert!(
            idx < self.children.len(),
            "child index {idx} out of range for {} child slot(s)",
            self.children.len()
        );
        self.children[idx] = child;
    }

    /// Replaces the full child list. Only meaningful for struct, whose arity
    /// is caller-chosen; other types re-validate on use.
    pub fn set_children(&mut self, children: Vec<Schema>) {
        self.children = children;
    }

    /// Attaches the dictionary-values schema, taking ownership.
    pub fn set_dictionary(&mut self, dictionary: Schema) {
        self.dictionary = Some(Box::new(dictionary));
    }

    /// Appends one metadata pair; keys may repeat.
    pub fn append_metadata(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.metadata.push((key.into(), value.into()));
    }

    /// Checks the tree against its types: child arity, parameter sanity, and
    /// dictionary presence, recursively.
    pub fn validate(&self) -> Result<(), PicoarrowError> {
        match self.dtype {
            ArrowType::FixedSizeBinary(w) if w <= 0 => {
                return Err(PicoarrowError::type_error(format!(
                    "fixed-size binary width must be positive, got {w}"
                )));
            }
            ArrowType::FixedSizeList(n) if n <= 0 => {
                return Err(PicoarrowError::type_error(format!(
                    "fixed-size list size must be positive, got {n}"
                )));
            }
            _ => {}
        }
        if let Some(required) = self.dtype.required_children() {
            if self.children.len() != required {
                return Err(PicoarrowError::type_error(format!(
                    "type {} requires exactly {} child(ren), found {}",
                    self.dtype,
                    required,
                    self.children.len()
                )));
            }
        }
        match (&self.dtype, &self.dictionary) {
            (ArrowType::Dictionary(_), None) => {
                return Err(PicoarrowError::type_error(
                    "dictionary-encoded schema has no dictionary-values schema",
                ));
            }
            (ArrowType::Dictionary(_), Some(dictionary)) => dictionary.validate()?,
            (_, Some(_)) => {
                return Err(PicoarrowError::type_error(format!(
                    "non-dictionary type {} carries a dictionary schema",
                    self.dtype
                )));
            }
            (_, None) => {}
        }
        for child in &self.children {
            child.validate()?;
        }
        Ok(())
    }

    /// Encodes this schema's metadata into the interchange byte layout.
    pub fn encode_metadata(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.metadata.len() as i32).to_le_bytes());
        for (key, value) in &self.metadata {
            out.extend_from_slice(&(key.len() as i32).to_le_bytes());
            out.extend_from_slice(key.as_bytes());
            out.extend_from_slice(&(value.len() as i32).to_le_bytes());
            out.extend_from_slice(value);
        }
        out
    }

    /// Decodes the interchange metadata byte layout, rejecting truncated or
    /// malformed input. Empty input decodes as no metadata.
    pub fn decode_metadata(bytes: &[u8]) -> Result<Metadata, PicoarrowError> {
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        let mut cursor = MetadataCursor { bytes, pos: 0 };
        let count = cursor.read_len("pair count")?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let key_len = cursor.read_len("key length")?;
            let key = cursor.read_bytes(key_len, "key")?;
            let key = std::str::from_utf8(key)
                .map_err(|_| PicoarrowError::format("metadata key is not valid UTF-8"))?
                .to_string();
            let value_len = cursor.read_len("value length")?;
            let value = cursor.read_bytes(value_len, "value")?.to_vec();
            out.push((key, value));
        }
        Ok(out)
    }
}

struct MetadataCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl MetadataCursor<'_> {
    fn read_len(&mut self, what: &str) -> Result<usize, PicoarrowError> {
        if self.pos + 4 > self.bytes.len() {
            return Err(PicoarrowError::format(format!(
                "metadata truncated while reading {what}"
            )));
        }
        let raw = i32::from_le_bytes(self.bytes[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        if raw < 0 {
            return Err(PicoarrowError::format(format!(
                "metadata {what} is negative ({raw})"
            )));
        }
        Ok(raw as usize)
    }

    fn read_bytes(&mut self, len: usize, what: &str) -> Result<&[u8], PicoarrowError> {
        if self.pos + len > self.bytes.len() {
            return Err(PicoarrowError::format(format!(
                "metadata truncated while reading {what}"
            )));
        }
        let out = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Field \"{}\": {}{}",
            self.name.as_deref().unwrap_or(""),
            self.dtype,
            if self.nullable { " (nullable)" } else { "" }
        )?;
        if !self.children.is_empty() {
            write!(f, " [{} child(ren)]", self.children.len())?;
        }
        Ok(())
    }
}
