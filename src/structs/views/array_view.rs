//! # **ArrayView Module** - *Validated, Non-Owning Decode of an Array*
//!
//! An [`ArrayView`] is a read-only decoded projection of a finished
//! [`Array`], validated against its paired [`Schema`] and exposing typed
//! random access plus lazy, restartable slot iterators over `[0, length)`.
//!
//! ## Behaviour
//! - Construction validates that the array's buffer and child geometry match
//!   what the schema's type requires; at the default `Full` level it also
//!   scans offsets for monotonicity and bounds. Failures surface as layout
//!   errors, never conflated with build-time validation or allocation
//!   failures.
//! - The view borrows the array's buffers and must not outlive it; it owns
//!   nothing.
//! - Out-of-range index access is a programming error and panics; length is
//!   fixed at construction time.
//! - Typed reads use unaligned loads, so foreign-owned (wrapped) buffers of
//!   any alignment decode correctly.

use std::marker::PhantomData;
use std::mem::size_of;

use num_traits::ToPrimitive;

use crate::enums::arrow_type::{ArrowType, OffsetWidth};
use crate::enums::error::PicoarrowError;
use crate::enums::lifecycle::{BuildState, ValidationLevel};
use crate::structs::array::Array;
use crate::structs::buffer::Buffer;
use crate::structs::schema::Schema;
use crate::traits::type_unions::Primitive;
use crate::utils::bit;

/// # ArrayView
///
/// Non-owning decoded projection referencing an [`Array`]'s buffers.
///
/// Valid only as long as the underlying array is alive and unmodified; the
/// borrow checker enforces both.
#[derive(Debug)]
pub struct ArrayView<'a> {
    dtype: ArrowType,
    length: usize,
    null_count: usize,
    validity: Option<&'a [u8]>,
    offsets: &'a Buffer,
    data: &'a Buffer,
    children: Vec<ArrayView<'a>>,
    dictionary: Option<Box<ArrayView<'a>>>,
}

impl<'a> ArrayView<'a> {
    /// Builds a view with full validation.
    pub fn try_new(schema: &Schema, array: &'a Array) -> Result<Self, PicoarrowError> {
        ArrayView::try_new_with(schema, array, ValidationLevel::Full)
    }

    /// Builds a view at the requested validation level. `Minimal` skips the
    /// per-element offset and bounds scans for call sites that trust the
    /// producer; structural arity is always checked.
    pub fn try_new_with(
        schema: &Schema,
        array: &'a Array,
        level: ValidationLevel,
    ) -> Result<Self, PicoarrowError> {
        schema.validate()?;
        if array.state() != BuildState::Finished {
            return Err(PicoarrowError::layout(format!(
                "cannot view an array in state {:?}; finish it first",
                array.state()
            )));
        }
        if schema.dtype != *array.dtype() {
            return Err(PicoarrowError::layout(format!(
                "schema describes {} but the array holds {}",
                schema.dtype,
                array.dtype()
            )));
        }
        if schema.children.len() != array.children().len() {
            return Err(PicoarrowError::layout(format!(
                "schema describes {} child(ren) but the array holds {}",
                schema.children.len(),
                array.children().len()
            )));
        }
        array
            .check_layout(level)
            .map_err(PicoarrowError::layout)?;

        let children = schema
            .children
            .iter()
            .zip(array.children())
            .map(|(child_schema, child)| ArrayView::try_new_with(child_schema, child, level))
            .collect::<Result<Vec<_>, _>>()?;

        let dictionary = match (&schema.dictionary, array.dictionary()) {
            (Some(values_schema), Some(values)) => Some(Box::new(ArrayView::try_new_with(
                values_schema,
                values,
                level,
            )?)),
            (None, None) => None,
            _ => {
                return Err(PicoarrowError::layout(
                    "schema and array disagree on dictionary encoding",
                ));
            }
        };

        let null_count = if array.null_count() >= 0 {
            array.null_count() as usize
        } else {
            match (array.dtype(), array.validity()) {
                (ArrowType::Null, _) => array.len(),
                (_, Some(mask)) => mask.count_zeros(),
                (_, None) => 0,
            }
        };

        Ok(ArrayView {
            dtype: array.dtype().clone(),
            length: array.len(),
            null_count,
            validity: array.validity().map(|mask| mask.as_bytes()),
            offsets: array.offsets(),
            data: array.data(),
            children,
            dictionary,
        })
    }

    /// The storage type being decoded.
    #[inline]
    pub fn dtype(&self) -> &ArrowType {
        &self.dtype
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Resolved null count over `[0, length)`.
    #[inline]
    pub fn null_count(&self) -> usize {
        self.null_count
    }

    #[inline]
    pub fn children(&self) -> &[ArrayView<'a>] {
        &self.children
    }

    /// Sub-view of child `idx`.
    ///
    /// # Panics
    /// Panics when `idx` is out of range.
    #[inline]
    pub fn child(&self, idx: usize) -> &ArrayView<'a> {
        &self.children[idx]
    }

    /// Decoded dictionary values for a dictionary-encoded column.
    #[inline]
    pub fn dictionary(&self) -> Option<&ArrayView<'a>> {
        self.dictionary.as_deref()
    }

    /// True when the element's validity bit is unset.
    ///
    /// # Panics
    /// Panics when `idx >= len()`.
    #[inline]
    pub fn is_null(&self, idx: usize) -> bool {
        assert!(
            idx < self.length,
            "index {idx} out of bounds for view of length {}",
            self.length
        );
        match self.validity {
            Some(bits) => !bit(bits, idx),
            None => self.dtype == ArrowType::Null,
        }
    }

    /// Fixed-width value at `idx`, or `None` when null.
    ///
    /// # Panics
    /// Panics when `idx` is out of range or `T` does not match the storage
    /// width.
    #[inline]
    pub fn value_at<T: Primitive>(&self, idx: usize) -> Option<T> {
        assert_eq!(
            self.storage_width(),
            Some(size_of::<T>()),
            "requested element width {} does not match {} storage",
            size_of::<T>(),
            self.dtype
        );
        if self.is_null(idx) {
            return None;
        }
        Some(self.data.read_typed::<T>(idx))
    }

    /// Boolean value at `idx`, or `None` when null.
    #[inline]
    pub fn bool_at(&self, idx: usize) -> Option<bool> {
        assert_eq!(
            self.dtype,
            ArrowType::Boolean,
            "bool_at on a {} view",
            self.dtype
        );
        if self.is_null(idx) {
            return None;
        }
        Some(bit(self.data.as_slice(), idx))
    }

    /// Byte span at `idx` for variable-length and fixed-size binary storage,
    /// or `None` when null.
    pub fn bytes_at(&self, idx: usize) -> Option<&'a [u8]> {
        if self.is_null(idx) {
            return None;
        }
        let span = match self.dtype {
            ArrowType::Binary | ArrowType::String => {
                let start = self.offsets.read_typed::<i32>(idx) as usize;
                let end = self.offsets.read_typed::<i32>(idx + 1) as usize;
                &self.data.as_slice()[start..end]
            }
            ArrowType::LargeBinary | ArrowType::LargeString => {
                let start = self.offsets.read_typed::<i64>(idx) as usize;
                let end = self.offsets.read_typed::<i64>(idx + 1) as usize;
                &self.data.as_slice()[start..end]
            }
            ArrowType::FixedSizeBinary(width) => {
                let width = width as usize;
                &self.data.as_slice()[idx * width..(idx + 1) * width]
            }
            ref other => panic!("bytes_at on a {other} view"),
        };
        Some(span)
    }

    /// UTF-8 string at `idx`, or `None` when null.
    #[inline]
    pub fn str_at(&self, idx: usize) -> Option<&'a str> {
        // String storage is written through the UTF-8 append path.
        self.bytes_at(idx)
            .map(|bytes| unsafe { std::str::from_utf8_unchecked(bytes) })
    }

    /// Child-index range `[start, end)` of list element `idx`, or `None`
    /// when null. For fixed-size lists the range is derived from the list
    /// size.
    ///
    /// # Panics
    /// Panics when `idx` is out of range or the view is not list-typed.
    pub fn list_bounds(&self, idx: usize) -> Option<(usize, usize)> {
        if self.is_null(idx) {
            return None;
        }
        let bounds = match self.dtype {
            ArrowType::List => (
                self.offsets.read_typed::<i32>(idx) as usize,
                self.offsets.read_typed::<i32>(idx + 1) as usize,
            ),
            ArrowType::LargeList => (
                self.offsets.read_typed::<i64>(idx) as usize,
                self.offsets.read_typed::<i64>(idx + 1) as usize,
            ),
            ArrowType::FixedSizeList(size) => {
                let size = size as usize;
                (idx * size, (idx + 1) * size)
            }
            ref other => panic!("list_bounds on a {other} view"),
        };
        Some(bounds)
    }

    /// Lazy, restartable sequence of fixed-width slots over `[0, length)`.
    pub fn iter_as<T: Primitive>(&self) -> PrimitiveSlots<'a, T> {
        assert_eq!(
            self.storage_width(),
            Some(size_of::<T>()),
            "requested element width {} does not match {} storage",
            size_of::<T>(),
            self.dtype
        );
        PrimitiveSlots {
            data: self.data,
            validity: self.validity,
            idx: 0,
            len: self.length,
            _marker: PhantomData,
        }
    }

    /// Lazy sequence of byte-span slots for variable-length storage.
    pub fn iter_bytes(&self) -> ByteSlots<'a> {
        let width = match self.dtype.offset_width() {
            Some(width) => width,
            None => panic!("iter_bytes on a {} view", self.dtype),
        };
        ByteSlots {
            offsets: self.offsets,
            data: self.data,
            width,
            validity: self.validity,
            idx: 0,
            len: self.length,
        }
    }

    /// Lazy sequence of fixed-width byte-span slots.
    pub fn iter_fixed_bytes(&self) -> FixedSlots<'a> {
        let width = match self.dtype {
            ArrowType::FixedSizeBinary(width) => width as usize,
            ref other => panic!("iter_fixed_bytes on a {other} view"),
        };
        FixedSlots {
            data: self.data,
            width,
            validity: self.validity,
            idx: 0,
            len: self.length,
        }
    }

    /// Lazy sequence of boolean slots.
    pub fn iter_bool(&self) -> BoolSlots<'a> {
        assert_eq!(
            self.dtype,
            ArrowType::Boolean,
            "iter_bool on a {} view",
            self.dtype
        );
        BoolSlots {
            data: self.data,
            validity: self.validity,
            idx: 0,
            len: self.length,
        }
    }

    fn storage_width(&self) -> Option<usize> {
        match &self.dtype {
            ArrowType::Dictionary(idx) => idx.index_type().fixed_width(),
            other => other.fixed_width(),
        }
    }
}

#[inline]
fn slot_is_valid(validity: Option<&[u8]>, idx: usize) -> bool {
    match validity {
        Some(bits) => bit(bits, idx),
        None => true,
    }
}

/// Iterator over fixed-width slots; `None` marks a null element.
pub struct PrimitiveSlots<'a, T> {
    data: &'a Buffer,
    validity: Option<&'a [u8]>,
    idx: usize,
    len: usize,
    _marker: PhantomData<T>,
}

impl<'a, T: Primitive> Iterator for PrimitiveSlots<'a, T> {
    type Item = Option<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx >= self.len {
            return None;
        }
        let idx = self.idx;
        self.idx += 1;
        if slot_is_valid(self.validity, idx) {
            Some(Some(self.data.read_typed::<T>(idx)))
        } else {
            Some(None)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.idx;
        (remaining, Some(remaining))
    }
}

impl<'a, T: Primitive> ExactSizeIterator for PrimitiveSlots<'a, T> {}

/// Iterator over variable-length byte spans; `None` marks a null element.
pub struct ByteSlots<'a> {
    offsets: &'a Buffer,
    data: &'a Buffer,
    width: OffsetWidth,
    validity: Option<&'a [u8]>,
    idx: usize,
    len: usize,
}

impl<'a> Iterator for ByteSlots<'a> {
    type Item = Option<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx >= self.len {
            return None;
        }
        let idx = self.idx;
        self.idx += 1;
        if !slot_is_valid(self.validity, idx) {
            return Some(None);
        }
        let (start, end) = match self.width {
            OffsetWidth::Bits32 => (
                self.offsets.read_typed::<i32>(idx).to_usize(),
                self.offsets.read_typed::<i32>(idx + 1).to_usize(),
            ),
            OffsetWidth::Bits64 => (
                self.offsets.read_typed::<i64>(idx).to_usize(),
                self.offsets.read_typed::<i64>(idx + 1).to_usize(),
            ),
        };
        let start = start.expect("offset conversion failed");
        let end = end.expect("offset conversion failed");
        Some(Some(&self.data.as_slice()[start..end]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.idx;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for ByteSlots<'a> {}

/// Iterator over fixed-width byte spans; `None` marks a null element.
pub struct FixedSlots<'a> {
    data: &'a Buffer,
    width: usize,
    validity: Option<&'a [u8]>,
    idx: usize,
    len: usize,
}

impl<'a> Iterator for FixedSlots<'a> {
    type Item = Option<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx >= self.len {
            return None;
        }
        let idx = self.idx;
        self.idx += 1;
        if !slot_is_valid(self.validity, idx) {
            return Some(None);
        }
        Some(Some(
            &self.data.as_slice()[idx * self.width..(idx + 1) * self.width],
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.idx;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for FixedSlots<'a> {}

/// Iterator over boolean slots; `None` marks a null element.
pub struct BoolSlots<'a> {
    data: &'a Buffer,
    validity: Option<&'a [u8]>,
    idx: usize,
    len: usize,
}

impl<'a> Iterator for BoolSlots<'a> {
    type Item = Option<bool>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx >= self.len {
            return None;
        }
        let idx = self.idx;
        self.idx += 1;
        if slot_is_valid(self.validity, idx) {
            Some(Some(bit(self.data.as_slice(), idx)))
        } else {
            Some(None)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.idx;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for BoolSlots<'a> {}
