//! # **Array Module** - *Construction State Machine and Transferable Container*
//!
//! An [`Array`] is built incrementally against a [`Schema`] and, once
//! finished, becomes an immutable, transferable unit of column data:
//! validity bitmask, offsets/value buffers, child arrays, and an optional
//! dictionary-values array.
//!
//! ## Lifecycle
//! `Uninitialized → Initialized → Appending → Finished → Released`, tagged
//! explicitly via [`BuildState`]. [`take`](Array::take) transfers every
//! resource to the returned array and leaves the source `Released`, so there
//! is exactly one live owner at all times and a moved-from handle's release
//! obligation is a no-op.
//!
//! ## Appending
//! Appends grow the validity bitmask (marking valid unless appending null),
//! grow value/offset buffers consistently, and bump the running length and
//! null tally. Nested types delegate element content to their children and
//! seal one parent slot per [`finish_element`](Array::finish_element).
//!
//! ## Finishing
//! [`finish_building`](Array::finish_building) resolves the null count,
//! validates buffer sizing and offset monotonicity for the final length, and
//! recursively finishes children. Validation failures leave the array
//! unusable; the caller releases it.

use crate::enums::arrow_type::{ArrowType, OffsetWidth};
use crate::enums::error::PicoarrowError;
use crate::enums::lifecycle::{BuildState, ValidationLevel};
use crate::structs::bitmask::Bitmask;
use crate::structs::buffer::Buffer;
use crate::structs::schema::Schema;
use crate::traits::type_unions::Primitive;
use crate::utils::{bytes_for_bits, set_bit};

/// Sentinel for a null count that must be recomputed at finish time.
pub const NULL_COUNT_UNKNOWN: i64 = -1;

/// # Array
///
/// Mutable builder and immutable transferable container of buffers and
/// children conforming to a [`Schema`].
///
/// ## Fields
/// - `validity`: optional bit-packed validity mask, materialised on the
///   first null append (1 = valid, 0 = null).
/// - `offsets`: offsets buffer for variable-length and list types, seeded
///   with a single zero at initialisation.
/// - `data`: value bytes; bit-packed for boolean, index values for
///   dictionary-encoded types.
#[derive(Debug)]
pub struct Array {
    pub(crate) dtype: ArrowType,
    pub(crate) state: BuildState,
    pub(crate) length: usize,
    pub(crate) null_count: i64,
    pub(crate) validity: Option<Bitmask>,
    pub(crate) offsets: Buffer,
    pub(crate) data: Buffer,
    pub(crate) children: Vec<Array>,
    pub(crate) dictionary: Option<Box<Array>>,
}

impl Array {
    /// Allocates the exact buffer and child slots `schema`'s type requires,
    /// leaving the array `Initialized` and empty.
    ///
    /// Fails with a type error on an unsupported or malformed schema.
    pub fn from_schema(schema: &Schema) -> Result<Self, PicoarrowError> {
        schema.validate()?;
        let dtype = schema.dtype.clone();

        let mut offsets = Buffer::new();
        match dtype.offset_width() {
            Some(OffsetWidth::Bits32) => {
                offsets.set_element_size_hint(4);
                offsets.push_typed(0i32);
            }
            Some(OffsetWidth::Bits64) => {
                offsets.set_element_size_hint(8);
                offsets.push_typed(0i64);
            }
            None => {}
        }

        let mut data = Buffer::new();
        if let Some(width) = dtype.fixed_width() {
            data.set_element_size_hint(width);
        }

        let children = schema
            .children
            .iter()
            .map(Array::from_schema)
            .collect::<Result<Vec<_>, _>>()?;
        let dictionary = match &schema.dictionary {
            Some(values) => Some(Box::new(Array::from_schema(values)?)),
            None => None,
        };

        Ok(Array {
            dtype,
            state: BuildState::Initialized,
            length: 0,
            null_count: 0,
            validity: None,
            offsets,
            data,
            children,
            dictionary,
        })
    }

    /// The logical type this array was initialised against.
    #[inline]
    pub fn dtype(&self) -> &ArrowType {
        &self.dtype
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Logical element count.
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Known null count, or [`NULL_COUNT_UNKNOWN`] until resolved.
    #[inline]
    pub fn null_count(&self) -> i64 {
        self.null_count
    }

    /// Marks the null count as unknown so the next finish recomputes it
    /// from the validity bitmask.
    #[inline]
    pub fn invalidate_null_count(&mut self) {
        self.null_count = NULL_COUNT_UNKNOWN;
    }

    /// The validity bitmask, if any null has been appended.
    #[inline]
    pub fn validity(&self) -> Option<&Bitmask> {
        self.validity.as_ref()
    }

    /// The offsets buffer (empty for types without one).
    #[inline]
    pub fn offsets(&self) -> &Buffer {
        &self.offsets
    }

    /// The value-bytes buffer.
    #[inline]
    pub fn data(&self) -> &Buffer {
        &self.data
    }

    #[inline]
    pub fn children(&self) -> &[Array] {
        &self.children
    }

    /// Child array `idx`.
    ///
    /// # Panics
    /// Panics when `idx` is out of range; arity is fixed at initialisation.
    #[inline]
    pub fn child(&self, idx: usize) -> &Array {
        &self.children[idx]
    }

    #[inline]
    pub fn child_mut(&mut self, idx: usize) -> &mut Array {
        &mut self.children[idx]
    }

    #[inline]
    pub fn dictionary(&self) -> Option<&Array> {
        self.dictionary.as_deref()
    }

    #[inline]
    pub fn dictionary_mut(&mut self) -> Option<&mut Array> {
        self.dictionary.as_deref_mut()
    }

    /// `Initialized → Appending`, recursively for children and dictionary.
    /// Idempotent while already appending.
    pub fn start_appending(&mut self) -> Result<(), PicoarrowError> {
        match self.state {
            BuildState::Appending => return Ok(()),
            BuildState::Initialized => {}
            other => {
                return Err(PicoarrowError::type_error(format!(
                    "cannot start appending on an array in state {other:?}"
                )));
            }
        }
        self.state = BuildState::Appending;
        for child in &mut self.children {
            child.start_appending()?;
        }
        if let Some(dictionary) = &mut self.dictionary {
            dictionary.start_appending()?;
        }
        Ok(())
    }

    /// Appends a null element: validity bit cleared, buffers padded so every
    /// buffer stays consistent with the new length.
    pub fn append_null(&mut self) -> Result<(), PicoarrowError> {
        self.append_blank(false)
    }

    /// Appends a non-null zero/empty element.
    pub fn append_empty(&mut self) -> Result<(), PicoarrowError> {
        self.append_blank(true)
    }

    fn append_blank(&mut self, valid: bool) -> Result<(), PicoarrowError> {
        self.expect_appending()?;
        match self.dtype.clone() {
            ArrowType::Null => {}
            ArrowType::Struct => {
                for child in &mut self.children {
                    child.append_blank(valid)?;
                }
            }
            ArrowType::FixedSizeList(size) => {
                let child = &mut self.children[0];
                for _ in 0..size {
                    child.append_blank(valid)?;
                }
            }
            ArrowType::List => self.push_offset32_abs(self.children[0].length)?,
            ArrowType::LargeList => self.push_offset64_abs(self.children[0].length)?,
            ArrowType::Binary | ArrowType::String => self.push_offset32_abs(self.data.len())?,
            ArrowType::LargeBinary | ArrowType::LargeString => {
                self.push_offset64_abs(self.data.len())?
            }
            ArrowType::Boolean => self.push_data_bit(false),
            other => {
                // Fixed-width storage, including dictionary index columns.
                let width = other
                    .fixed_width()
                    .expect("type with no blank-append representation");
                self.data.append_fill(0, width);
            }
        }
        // Null-type elements are null by definition.
        self.bump(valid && self.dtype != ArrowType::Null);
        Ok(())
    }

    /// Appends a signed integer to integer, floating-point, or dictionary
    /// index storage. Values outside the target range fail with a capacity
    /// error rather than wrapping.
    pub fn append_int(&mut self, value: i64) -> Result<(), PicoarrowError> {
        self.expect_appending()?;
        match self.storage_type() {
            ArrowType::Int8 => self.push_fixed(range_checked::<i8>(value)?),
            ArrowType::Int16 => self.push_fixed(range_checked::<i16>(value)?),
            ArrowType::Int32 => self.push_fixed(range_checked::<i32>(value)?),
            ArrowType::Int64 => self.push_fixed(value),
            ArrowType::UInt8 => self.push_fixed(range_checked::<u8>(value)?),
            ArrowType::UInt16 => self.push_fixed(range_checked::<u16>(value)?),
            ArrowType::UInt32 => self.push_fixed(range_checked::<u32>(value)?),
            ArrowType::UInt64 => self.push_fixed(range_checked::<u64>(value)?),
            ArrowType::Float32 => self.push_fixed(value as f32),
            ArrowType::Float64 => self.push_fixed(value as f64),
            other => {
                return Err(PicoarrowError::type_error(format!(
                    "cannot append an integer to a {other} array"
                )));
            }
        }
        self.bump(true);
        Ok(())
    }

    /// Appends an unsigned integer; see [`append_int`](Array::append_int).
    pub fn append_uint(&mut self, value: u64) -> Result<(), PicoarrowError> {
        self.expect_appending()?;
        match self.storage_type() {
            ArrowType::Int8 => self.push_fixed(range_checked_u::<i8>(value)?),
            ArrowType::Int16 => self.push_fixed(range_checked_u::<i16>(value)?),
            ArrowType::Int32 => self.push_fixed(range_checked_u::<i32>(value)?),
            ArrowType::Int64 => self.push_fixed(range_checked_u::<i64>(value)?),
            ArrowType::UInt8 => self.push_fixed(range_checked_u::<u8>(value)?),
            ArrowType::UInt16 => self.push_fixed(range_checked_u::<u16>(value)?),
            ArrowType::UInt32 => self.push_fixed(range_checked_u::<u32>(value)?),
            ArrowType::UInt64 => self.push_fixed(value),
            ArrowType::Float32 => self.push_fixed(value as f32),
            ArrowType::Float64 => self.push_fixed(value as f64),
            other => {
                return Err(PicoarrowError::type_error(format!(
                    "cannot append an unsigned integer to a {other} array"
                )));
            }
        }
        self.bump(true);
        Ok(())
    }

    /// Appends a floating-point value to float storage.
    pub fn append_float(&mut self, value: f64) -> Result<(), PicoarrowError> {
        self.expect_appending()?;
        match self.storage_type() {
            ArrowType::Float32 => self.push_fixed(value as f32),
            ArrowType::Float64 => self.push_fixed(value),
            other => {
                return Err(PicoarrowError::type_error(format!(
                    "cannot append a float to a {other} array"
                )));
            }
        }
        self.bump(true);
        Ok(())
    }

    /// Appends a boolean to bit-packed boolean storage.
    pub fn append_bool(&mut self, value: bool) -> Result<(), PicoarrowError> {
        self.expect_appending()?;
        if self.storage_type() != ArrowType::Boolean {
            return Err(PicoarrowError::type_error(format!(
                "cannot append a boolean to a {} array",
                self.dtype
            )));
        }
        self.push_data_bit(value);
        self.bump(true);
        Ok(())
    }

    /// Appends a byte span to variable-length or fixed-size binary storage.
    /// A 32-bit offsets buffer that would pass `i32::MAX` fails with a
    /// capacity error.
    pub fn append_bytes(&mut self, value: &[u8]) -> Result<(), PicoarrowError> {
        self.expect_appending()?;
        match self.dtype.clone() {
            ArrowType::Binary | ArrowType::String => {
                self.data.append(value);
                self.push_offset32_abs(self.data.len())?;
            }
            ArrowType::LargeBinary | ArrowType::LargeString => {
                self.data.append(value);
                self.push_offset64_abs(self.data.len())?;
            }
            ArrowType::FixedSizeBinary(width) => {
                if value.len() != width as usize {
                    return Err(PicoarrowError::type_error(format!(
                        "fixed-size binary of width {width} cannot hold {} bytes",
                        value.len()
                    )));
                }
                self.data.append(value);
            }
            other => {
                return Err(PicoarrowError::type_error(format!(
                    "cannot append bytes to a {other} array"
                )));
            }
        }
        self.bump(true);
        Ok(())
    }

    /// Appends a UTF-8 string to string storage.
    pub fn append_str(&mut self, value: &str) -> Result<(), PicoarrowError> {
        match self.dtype {
            ArrowType::String | ArrowType::LargeString => self.append_bytes(value.as_bytes()),
            ref other => Err(PicoarrowError::type_error(format!(
                "cannot append a string to a {other} array"
            ))),
        }
    }

    /// Seals one element of a nested array after its content has been
    /// appended to the children: bumps the parent's length and validity and,
    /// for list types, records the new cumulative offset.
    pub fn finish_element(&mut self) -> Result<(), PicoarrowError> {
        self.expect_appending()?;
        match self.dtype.clone() {
            ArrowType::List => self.push_offset32_abs(self.children[0].length)?,
            ArrowType::LargeList => self.push_offset64_abs(self.children[0].length)?,
            ArrowType::FixedSizeList(size) => {
                let expected = (self.length + 1) * size as usize;
                if self.children[0].length != expected {
                    return Err(PicoarrowError::validation(format!(
                        "fixed-size list of size {size} expected the child to hold {expected} \
                         elements after this slot, found {}",
                        self.children[0].length
                    )));
                }
            }
            ArrowType::Struct => {
                for (idx, child) in self.children.iter().enumerate() {
                    if child.length != self.length + 1 {
                        return Err(PicoarrowError::validation(format!(
                            "struct child {idx} holds {} element(s), expected {} after this slot",
                            child.length,
                            self.length + 1
                        )));
                    }
                }
            }
            other => {
                return Err(PicoarrowError::type_error(format!(
                    "finish_element applies to nested arrays, not {other}"
                )));
            }
        }
        self.bump(true);
        Ok(())
    }

    /// `Appending → Finished` with full validation.
    pub fn finish_building(&mut self) -> Result<(), PicoarrowError> {
        self.finish_building_with(ValidationLevel::Full)
    }

    /// `Appending → Finished`, resolving the null count and validating the
    /// layout at the requested level; children and the dictionary finish
    /// recursively first.
    pub fn finish_building_with(&mut self, level: ValidationLevel) -> Result<(), PicoarrowError> {
        match self.state {
            BuildState::Appending | BuildState::Initialized => {}
            other => {
                return Err(PicoarrowError::type_error(format!(
                    "cannot finish an array in state {other:?}"
                )));
            }
        }
        for child in &mut self.children {
            child.finish_building_with(level)?;
        }
        if let Some(dictionary) = &mut self.dictionary {
            dictionary.finish_building_with(level)?;
        }

        if self.null_count == NULL_COUNT_UNKNOWN {
            self.null_count = match (&self.dtype, &self.validity) {
                (ArrowType::Null, _) => self.length as i64,
                (_, Some(mask)) => mask.count_zeros() as i64,
                (_, None) => 0,
            };
        }

        self.check_layout(level)
            .map_err(PicoarrowError::validation)?;
        self.state = BuildState::Finished;
        Ok(())
    }

    /// Moves every resource (buffers, children, dictionary, and the release
    /// obligation) into the returned array, which keeps this array's state.
    /// The source is left `Released`: empty, and a further release is a
    /// no-op.
    pub fn take(&mut self) -> Array {
        std::mem::replace(self, Array::released())
    }

    /// Releases all owned resources. Safe to call in any state, including on
    /// an already-released array (no-op).
    pub fn release(&mut self) {
        *self = Array::released();
    }

    fn released() -> Array {
        Array {
            dtype: ArrowType::Null,
            state: BuildState::Released,
            length: 0,
            null_count: 0,
            validity: None,
            offsets: Buffer::new(),
            data: Buffer::new(),
            children: Vec::new(),
            dictionary: None,
        }
    }

    /// The type actually stored in the value buffer: the index type for
    /// dictionary-encoded arrays, the array's own type otherwise.
    #[inline]
    pub(crate) fn storage_type(&self) -> ArrowType {
        match &self.dtype {
            ArrowType::Dictionary(idx) => idx.index_type(),
            other => other.clone(),
        }
    }

    fn expect_appending(&self) -> Result<(), PicoarrowError> {
        if self.state != BuildState::Appending {
            return Err(PicoarrowError::type_error(format!(
                "cannot append to an array in state {:?}",
                self.state
            )));
        }
        Ok(())
    }

    fn push_fixed<T: Primitive>(&mut self, value: T) {
        self.data.push_typed(value);
    }

    fn push_data_bit(&mut self, value: bool) {
        let idx = self.length;
        let need = bytes_for_bits(idx + 1);
        if self.data.len() < need {
            let grow = need - self.data.len();
            self.data.append_fill(0, grow);
        }
        if value {
            set_bit(self.data.as_mut_slice(), idx, true);
        }
    }

    fn push_offset32_abs(&mut self, value: usize) -> Result<(), PicoarrowError> {
        if value > i32::MAX as usize {
            return Err(PicoarrowError::capacity(format!(
                "cumulative offset {value} exceeds the 32-bit offset range"
            )));
        }
        self.offsets.push_typed(value as i32);
        Ok(())
    }

    fn push_offset64_abs(&mut self, value: usize) -> Result<(), PicoarrowError> {
        if value > i64::MAX as usize {
            return Err(PicoarrowError::capacity(format!(
                "cumulative offset {value} exceeds the 64-bit offset range"
            )));
        }
        self.offsets.push_typed(value as i64);
        Ok(())
    }

    fn push_validity(&mut self, valid: bool) {
        match &mut self.validity {
            Some(mask) => mask.append(valid, 1),
            None if valid => {}
            None => {
                // First null: materialise the mask over the preceding
                // all-valid prefix.
                let mut mask = Bitmask::new_set_all(self.length, true);
                mask.append(false, 1);
                self.validity = Some(mask);
            }
        }
    }

    fn bump(&mut self, valid: bool) {
        if self.dtype != ArrowType::Null {
            self.push_validity(valid);
        }
        self.length += 1;
        if !valid && self.null_count >= 0 {
            self.null_count += 1;
        }
    }

    /// Layout checks shared by finish-time validation (mapped to validation
    /// errors) and view construction (mapped to layout errors).
    pub(crate) fn check_layout(&self, level: ValidationLevel) -> Result<(), String> {
        if let Some(mask) = &self.validity {
            if mask.len() != self.length {
                return Err(format!(
                    "validity bitmap covers {} bit(s) for length {}",
                    mask.len(),
                    self.length
                ));
            }
        }
        match self.dtype.clone() {
            ArrowType::Null => {}
            ArrowType::Boolean => {
                if level == ValidationLevel::Full && self.data.len() < bytes_for_bits(self.length)
                {
                    return Err(format!(
                        "boolean data of {} byte(s) cannot hold {} element(s)",
                        self.data.len(),
                        self.length
                    ));
                }
            }
            ArrowType::Struct => {
                for (idx, child) in self.children.iter().enumerate() {
                    if child.length != self.length {
                        return Err(format!(
                            "struct child {idx} holds {} element(s), expected {}",
                            child.length, self.length
                        ));
                    }
                }
            }
            ArrowType::FixedSizeList(size) => {
                let expected = self.length * size as usize;
                if self.children[0].length != expected {
                    return Err(format!(
                        "fixed-size list child holds {} element(s), expected {expected}",
                        self.children[0].length
                    ));
                }
            }
            ArrowType::List => self.check_offsets::<i32>(level, self.children[0].length)?,
            ArrowType::LargeList => self.check_offsets::<i64>(level, self.children[0].length)?,
            ArrowType::Binary | ArrowType::String => {
                self.check_offsets::<i32>(level, self.data.len())?
            }
            ArrowType::LargeBinary | ArrowType::LargeString => {
                self.check_offsets::<i64>(level, self.data.len())?
            }
            _ => {
                let width = self
                    .storage_type()
                    .fixed_width()
                    .expect("fixed-width storage");
                if level == ValidationLevel::Full && self.data.len() < self.length * width {
                    return Err(format!(
                        "value buffer of {} byte(s) cannot hold {} element(s) of width {width}",
                        self.data.len(),
                        self.length
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_offsets<T: Primitive>(
        &self,
        level: ValidationLevel,
        limit: usize,
    ) -> Result<(), String> {
        let offsets = self.offsets.typed_slice::<T>();
        if offsets.len() != self.length + 1 {
            return Err(format!(
                "offsets buffer holds {} value(s), expected {}",
                offsets.len(),
                self.length + 1
            ));
        }
        if level != ValidationLevel::Full {
            return Ok(());
        }
        let mut prev = offsets[0].to_i64().expect("offset conversion failed");
        if prev < 0 {
            return Err(format!("first offset is negative ({prev})"));
        }
        for (idx, raw) in offsets.iter().enumerate().skip(1) {
            let cur = raw.to_i64().expect("offset conversion failed");
            if cur < prev {
                return Err(format!(
                    "offsets are not monotonically non-decreasing at element {idx} \
                     ({cur} after {prev})"
                ));
            }
            prev = cur;
        }
        if prev > limit as i64 {
            return Err(format!(
                "final offset {prev} exceeds the referenced buffer length {limit}"
            ));
        }
        Ok(())
    }
}

fn range_checked<T: Primitive>(value: i64) -> Result<T, PicoarrowError> {
    num_traits::cast(value).ok_or_else(|| {
        PicoarrowError::capacity(format!(
            "value {value} does not fit the array's {}-byte storage",
            std::mem::size_of::<T>()
        ))
    })
}

fn range_checked_u<T: Primitive>(value: u64) -> Result<T, PicoarrowError> {
    num_traits::cast(value).ok_or_else(|| {
        PicoarrowError::capacity(format!(
            "value {value} does not fit the array's {}-byte storage",
            std::mem::size_of::<T>()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::arrow_type::DictionaryIndex;

    fn appending(dtype: ArrowType) -> Array {
        let schema = Schema::from_type(dtype).unwrap();
        let mut array = Array::from_schema(&schema).unwrap();
        array.start_appending().unwrap();
        array
    }

    #[test]
    fn test_primitive_build() {
        let mut array = appending(ArrowType::Int32);
        array.append_int(123).unwrap();
        array.append_null().unwrap();
        array.append_int(-7).unwrap();
        array.finish_building().unwrap();

        assert_eq!(array.state(), BuildState::Finished);
        assert_eq!(array.len(), 3);
        assert_eq!(array.null_count(), 1);
        assert_eq!(array.data().typed_slice::<i32>(), &[123, 0, -7]);
        let mask = array.validity().unwrap();
        assert!(mask.get(0));
        assert!(!mask.get(1));
        assert!(mask.get(2));
    }

    #[test]
    fn test_validity_stays_absent_without_nulls() {
        let mut array = appending(ArrowType::UInt16);
        array.append_uint(1).unwrap();
        array.append_uint(2).unwrap();
        array.finish_building().unwrap();
        assert!(array.validity().is_none());
        assert_eq!(array.null_count(), 0);
    }

    #[test]
    fn test_null_count_matches_cleared_bits() {
        let mut array = appending(ArrowType::Float64);
        for i in 0..37 {
            if i % 5 == 0 {
                array.append_null().unwrap();
            } else {
                array.append_float(i as f64).unwrap();
            }
        }
        array.invalidate_null_count();
        array.finish_building().unwrap();
        let mask = array.validity().unwrap();
        assert_eq!(array.null_count() as usize, mask.count_zeros());
        assert_eq!(array.null_count(), 8);
    }

    #[test]
    fn test_string_build_offsets() {
        let mut array = appending(ArrowType::String);
        array.append_str("abc").unwrap();
        array.append_null().unwrap();
        array.append_str("defghi").unwrap();
        array.append_str("").unwrap();
        array.finish_building().unwrap();

        assert_eq!(array.offsets().typed_slice::<i32>(), &[0, 3, 3, 9, 9]);
        assert_eq!(array.data().as_slice(), b"abcdefghi");
        assert_eq!(array.null_count(), 1);
    }

    #[test]
    fn test_large_binary_build() {
        let mut array = appending(ArrowType::LargeBinary);
        array.append_bytes(b"xy").unwrap();
        array.append_bytes(b"z").unwrap();
        array.finish_building().unwrap();
        assert_eq!(array.offsets().typed_slice::<i64>(), &[0, 2, 3]);
    }

    #[test]
    fn test_fixed_size_binary_build() {
        let mut array = appending(ArrowType::FixedSizeBinary(3));
        array.append_bytes(b"foo").unwrap();
        array.append_bytes(b"bar").unwrap();
        let err = array.append_bytes(b"toolong").unwrap_err();
        assert_eq!(err.kind(), "type");
        array.finish_building().unwrap();
        assert_eq!(array.data().as_slice(), b"foobar");
    }

    #[test]
    fn test_boolean_build() {
        let mut array = appending(ArrowType::Boolean);
        for v in [true, true, false, true] {
            array.append_bool(v).unwrap();
        }
        array.append_null().unwrap();
        array.finish_building().unwrap();
        assert_eq!(array.len(), 5);
        assert_eq!(array.data().as_slice(), &[0b0000_1011]);
        assert_eq!(array.null_count(), 1);
    }

    #[test]
    fn test_int_range_overflow_is_capacity_error() {
        let mut array = appending(ArrowType::Int8);
        assert_eq!(array.append_int(300).unwrap_err().kind(), "capacity");
        let mut array = appending(ArrowType::UInt32);
        assert_eq!(array.append_int(-1).unwrap_err().kind(), "capacity");
    }

    #[test]
    fn test_offset32_overflow_is_capacity_error() {
        let mut array = appending(ArrowType::String);
        let err = array.push_offset32_abs(i32::MAX as usize + 1).unwrap_err();
        assert_eq!(err.kind(), "capacity");
    }

    #[test]
    fn test_append_requires_appending_state() {
        let schema = Schema::from_type(ArrowType::Int32).unwrap();
        let mut array = Array::from_schema(&schema).unwrap();
        assert_eq!(array.append_int(1).unwrap_err().kind(), "type");

        array.start_appending().unwrap();
        array.start_appending().unwrap(); // idempotent
        array.append_int(1).unwrap();
        array.finish_building().unwrap();
        assert_eq!(array.append_int(2).unwrap_err().kind(), "type");
    }

    #[test]
    fn test_type_mismatch_appends_rejected() {
        let mut array = appending(ArrowType::Int32);
        assert_eq!(array.append_str("x").unwrap_err().kind(), "type");
        assert_eq!(array.append_bool(true).unwrap_err().kind(), "type");
        let mut array = appending(ArrowType::String);
        assert_eq!(array.append_float(1.0).unwrap_err().kind(), "type");
    }

    #[test]
    fn test_struct_build_and_validation() {
        let schema = Schema::struct_of(vec![
            Schema::from_type(ArrowType::Int64).unwrap().with_name("a"),
            Schema::from_type(ArrowType::String).unwrap().with_name("b"),
        ]);
        let mut array = Array::from_schema(&schema).unwrap();
        array.start_appending().unwrap();

        array.child_mut(0).append_int(1).unwrap();
        array.child_mut(1).append_str("one").unwrap();
        array.finish_element().unwrap();

        array.child_mut(0).append_int(2).unwrap();
        array.child_mut(1).append_str("two").unwrap();
        array.finish_element().unwrap();

        array.finish_building().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array.child(0).data().typed_slice::<i64>(), &[1, 2]);
    }

    #[test]
    fn test_struct_child_length_mismatch_fails_validation() {
        let schema = Schema::struct_of(vec![
            Schema::from_type(ArrowType::Int64).unwrap().with_name("a"),
        ]);
        let mut array = Array::from_schema(&schema).unwrap();
        array.start_appending().unwrap();
        array.child_mut(0).append_int(1).unwrap();
        // No finish_element: parent length stays 0 while the child holds 1.
        let err = array.finish_building().unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_list_build() {
        let mut schema = Schema::from_type(ArrowType::List).unwrap();
        schema.set_child(0, Schema::from_type(ArrowType::Int32).unwrap().with_name("item"));
        let mut array = Array::from_schema(&schema).unwrap();
        array.start_appending().unwrap();

        array.child_mut(0).append_int(1).unwrap();
        array.child_mut(0).append_int(2).unwrap();
        array.finish_element().unwrap();
        array.append_null().unwrap();
        array.child_mut(0).append_int(3).unwrap();
        array.finish_element().unwrap();

        array.finish_building().unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array.offsets().typed_slice::<i32>(), &[0, 2, 2, 3]);
        assert_eq!(array.null_count(), 1);
    }

    #[test]
    fn test_fixed_size_list_enforces_child_arity() {
        let mut schema = Schema::from_type(ArrowType::FixedSizeList(2)).unwrap();
        schema.set_child(0, Schema::from_type(ArrowType::Int32).unwrap().with_name("item"));
        let mut array = Array::from_schema(&schema).unwrap();
        array.start_appending().unwrap();

        array.child_mut(0).append_int(1).unwrap();
        let err = array.finish_element().unwrap_err();
        assert_eq!(err.kind(), "validation");

        array.child_mut(0).append_int(2).unwrap();
        array.finish_element().unwrap();
        array.finish_building().unwrap();
        assert_eq!(array.len(), 1);
    }

    #[test]
    fn test_dictionary_build() {
        let mut schema = Schema::from_type(ArrowType::Dictionary(DictionaryIndex::Int32)).unwrap();
        schema.set_dictionary(Schema::from_type(ArrowType::String).unwrap());
        let mut array = Array::from_schema(&schema).unwrap();
        array.start_appending().unwrap();

        let values = array.dictionary_mut().unwrap();
        values.append_str("red").unwrap();
        values.append_str("green").unwrap();

        array.append_int(0).unwrap();
        array.append_int(1).unwrap();
        array.append_int(0).unwrap();
        array.finish_building().unwrap();

        assert_eq!(array.len(), 3);
        assert_eq!(array.data().typed_slice::<i32>(), &[0, 1, 0]);
        assert_eq!(array.dictionary().unwrap().len(), 2);
        assert_eq!(array.dictionary().unwrap().state(), BuildState::Finished);
    }

    #[test]
    fn test_dictionary_schema_without_values_is_type_error() {
        let schema = Schema::from_type(ArrowType::Dictionary(DictionaryIndex::Int32)).unwrap();
        assert_eq!(Array::from_schema(&schema).unwrap_err().kind(), "type");
    }

    #[test]
    fn test_null_type_array() {
        let mut array = appending(ArrowType::Null);
        array.append_null().unwrap();
        array.append_null().unwrap();
        array.finish_building().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array.null_count(), 2);
        assert!(array.validity().is_none());
    }

    #[test]
    fn test_take_empties_source_and_preserves_destination() {
        let mut source = appending(ArrowType::Int32);
        source.append_int(42).unwrap();
        source.finish_building().unwrap();
        let expected = source.data().as_slice().to_vec();

        let moved = source.take();
        assert_eq!(source.state(), BuildState::Released);
        assert_eq!(source.len(), 0);
        assert!(source.data().is_empty());
        assert_eq!(moved.state(), BuildState::Finished);
        assert_eq!(moved.data().as_slice(), expected.as_slice());

        // Releasing the emptied source again is a no-op.
        source.release();
        assert_eq!(source.state(), BuildState::Released);
        assert_eq!(moved.len(), 1);
    }

    #[test]
    fn test_take_mid_build_keeps_state() {
        let mut source = appending(ArrowType::Int32);
        source.append_int(1).unwrap();
        let mut moved = source.take();
        assert_eq!(source.state(), BuildState::Released);
        assert_eq!(moved.state(), BuildState::Appending);
        moved.append_int(2).unwrap();
        moved.finish_building().unwrap();
        assert_eq!(moved.data().typed_slice::<i32>(), &[1, 2]);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut array = appending(ArrowType::String);
        array.append_str("x").unwrap();
        array.release();
        assert_eq!(array.state(), BuildState::Released);
        array.release();
        assert_eq!(array.state(), BuildState::Released);
        assert_eq!(array.append_str("y").unwrap_err().kind(), "type");
    }

    #[test]
    fn test_minimal_finish_skips_deep_scans() {
        let mut array = appending(ArrowType::String);
        array.append_str("ok").unwrap();
        array.finish_building_with(ValidationLevel::Minimal).unwrap();
        assert_eq!(array.state(), BuildState::Finished);
        assert_eq!(array.null_count(), 0);
    }
}
