//! # **Buffer** — *Unified owned/wrapped byte storage*
//!
//! Buffer backs every array surface in *Picoarrow*: validity bitmasks,
//! offsets buffers, and value data.
//!
//! # Design
//! `Buffer` abstracts over two storage backends:
//! - **Owned**: [`Vec64<u8>`] — an internally aligned, 64-byte, heap-allocated
//!   vector, so typed reads over builder-written buffers are always aligned.
//! - **Wrapped**: a read-only window into foreign-owned memory whose owner
//!   travels inside the buffer. Dropping or resetting the buffer runs the
//!   owner's destructor exactly once; moving the buffer onward moves the
//!   obligation with it. This is what lets an array wrap a moved-in native
//!   object without copying.
//!
//! ## Behaviour
//! - **Read-only ops** (`&[u8]` slicing, typed reads) operate directly on the
//!   backing memory regardless of ownership.
//! - **Mutating ops** (append, resize) transparently convert wrapped buffers
//!   into owned storage before modifying, discharging the wrapped owner's
//!   release obligation at that point.
//! - Capacity growth rounds up to the next power of two, so repeated appends
//!   stay amortised linear.
//!
//! ## Alignment rules
//! - Owned storage is always 64-byte aligned.
//! - Wrapped storage carries whatever alignment the foreign allocator chose;
//!   [`typed_slice`](Buffer::typed_slice) asserts alignment, while
//!   [`read_typed`](Buffer::read_typed) uses unaligned loads and is total.

use std::any::Any;
use std::fmt;
use std::mem::size_of;
use std::ops::Deref;
use std::slice;

use vec64::Vec64;

use crate::enums::error::PicoarrowError;
use crate::traits::type_unions::Primitive;

/// # Buffer
///
/// Growable, capacity-tracked byte store with single-owner semantics and an
/// optional wrapped foreign owner whose destructor is the release obligation.
///
/// ### Behaviour:
/// - Semantically a byte vector for the owned case.
/// - Wrapping a foreign object ([`Buffer::wrapped`], [`Buffer::from_owner`])
///   stores the object inside the buffer; its destructor fires exactly once:
///   on [`reset`](Buffer::reset), on drop, or never here if the buffer was
///   moved onward first.
/// - `element_size_hint` records the byte width of one logical element so
///   callers can reserve in element units.
pub struct Buffer {
    storage: Storage,
    element_size_hint: usize,
}

/// Internal memory ownership tracking store for `Buffer`.
enum Storage {
    Owned(Vec64<u8>),
    Wrapped {
        ptr: *const u8,
        len: usize,
        owner: Box<dyn Any + Send + Sync>,
    },
}

impl Buffer {
    /// Constructs a new, empty buffer.
    #[inline]
    pub fn new() -> Self {
        Self {
            storage: Storage::Owned(Vec64::new()),
            element_size_hint: 0,
        }
    }

    /// Constructs an empty buffer with at least `capacity` bytes reserved.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: Storage::Owned(Vec64::with_capacity(capacity)),
            element_size_hint: 0,
        }
    }

    /// Construct an owned buffer from a byte slice, copying the data into an
    /// aligned Vec64.
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut v = Vec64::with_capacity(bytes.len());
        v.extend_from_slice(bytes);
        Buffer::from_vec64(v)
    }

    /// Construct from an owned `Vec64<u8>`.
    #[inline]
    pub fn from_vec64(v: Vec64<u8>) -> Self {
        Self {
            storage: Storage::Owned(v),
            element_size_hint: 0,
        }
    }

    /// Constructs an owned buffer from a slice of fixed-width values, copied
    /// as raw machine bytes, recording the element width as the size hint.
    #[inline]
    pub fn from_sequence<T: Primitive>(values: &[T]) -> Self {
        let bytes = unsafe {
            slice::from_raw_parts(values.as_ptr() as *const u8, values.len() * size_of::<T>())
        };
        let mut buf = Buffer::from_slice(bytes);
        buf.element_size_hint = size_of::<T>();
        buf
    }

    /// Wraps foreign-owned memory without copying.
    ///
    /// The owner is stored inside the buffer and dropped exactly once, when
    /// this buffer (or whichever buffer the storage is moved into) is reset
    /// or dropped. `ptr`/`len` may be null/zero for owners with no byte view.
    ///
    /// # Safety
    /// - `ptr` must be valid for reads of `len` bytes for as long as `owner`
    ///   is alive, or null with `len == 0`.
    #[inline]
    pub unsafe fn wrapped<O: Send + Sync + 'static>(owner: O, ptr: *const u8, len: usize) -> Self {
        Self {
            storage: Storage::Wrapped {
                ptr,
                len,
                owner: Box::new(owner),
            },
            element_size_hint: 0,
        }
    }

    /// Wraps a foreign owner that exposes its own byte view.
    ///
    /// Zero-copy: the buffer reads through the owner's slice and drops the
    /// owner exactly once when the buffer is reset or dropped.
    pub fn from_owner<O>(owner: O) -> Self
    where
        O: AsRef<[u8]> + Send + Sync + 'static,
    {
        let boxed = Box::new(owner);
        let bytes = (*boxed).as_ref();
        let ptr = bytes.as_ptr();
        let len = bytes.len();
        if len > 0 && ptr as usize % 8 != 0 {
            eprintln!(
                "Buffer::from_owner: foreign memory {ptr:p} is not 8-byte aligned; typed access falls back to unaligned reads."
            );
        }
        Self {
            storage: Storage::Wrapped {
                ptr,
                len,
                owner: boxed,
            },
            element_size_hint: 0,
        }
    }

    /// Byte width of one logical element, `0` when the buffer is plain bytes.
    #[inline]
    pub fn element_size_hint(&self) -> usize {
        self.element_size_hint
    }

    #[inline]
    pub fn set_element_size_hint(&mut self, bytes_per_element: usize) {
        self.element_size_hint = bytes_per_element;
    }

    /// Returns the buffer contents as a byte slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match &self.storage {
            Storage::Owned(vec) => vec.as_slice(),
            Storage::Wrapped { ptr, len, .. } => {
                if *len == 0 || ptr.is_null() {
                    &[]
                } else {
                    unsafe { slice::from_raw_parts(*ptr, *len) }
                }
            }
        }
    }

    /// Returns a mutable byte slice; copies wrapped storage to owned first.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.make_owned_mut().as_mut_slice()
    }

    /// Pointer to the first byte, dangling for an empty buffer.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.as_slice().as_ptr()
    }

    /// Size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Owned(vec) => vec.len(),
            Storage::Wrapped { len, .. } => *len,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity in bytes. Wrapped storage has no reserve: capacity == len.
    #[inline]
    pub fn capacity(&self) -> usize {
        match &self.storage {
            Storage::Owned(vec) => vec.capacity(),
            Storage::Wrapped { len, .. } => *len,
        }
    }

    /// Returns true if the buffer is a wrapped (foreign-owned) region whose
    /// release obligation has not yet been discharged.
    #[inline]
    pub fn is_wrapped(&self) -> bool {
        matches!(self.storage, Storage::Wrapped { .. })
    }

    /// Reserves room for at least `additional` more bytes, rounding the new
    /// capacity up to the next power of two.
    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        let vec = self.make_owned_mut();
        let required = vec.len() + additional;
        if required > vec.capacity() {
            let target = required.next_power_of_two();
            let len = vec.len();
            vec.reserve(target - len);
        }
    }

    /// Fallible reservation: rejects requests no allocator could satisfy
    /// with an allocation error instead of aborting on arithmetic overflow.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), PicoarrowError> {
        let representable = self
            .len()
            .checked_add(additional)
            .is_some_and(|n| n <= isize::MAX as usize);
        if !representable {
            return Err(PicoarrowError::allocation(format!(
                "cannot grow buffer of {} bytes by {} more",
                self.len(),
                additional
            )));
        }
        self.reserve(additional);
        Ok(())
    }

    /// Appends raw bytes, growing capacity as needed and preserving the
    /// existing contents.
    #[inline]
    pub fn append(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.make_owned_mut().extend_from_slice(bytes);
    }

    /// Appends `count` repeated copies of `value`.
    #[inline]
    pub fn append_fill(&mut self, value: u8, count: usize) {
        self.reserve(count);
        let vec = self.make_owned_mut();
        let new_len = vec.len() + count;
        vec.resize(new_len, value);
    }

    /// Appends one fixed-width value as raw machine bytes.
    #[inline]
    pub fn push_typed<T: Primitive>(&mut self, value: T) {
        let bytes =
            unsafe { slice::from_raw_parts(&value as *const T as *const u8, size_of::<T>()) };
        self.append(bytes);
    }

    /// Grows or trims to exactly `new_len` bytes. Growth zero-fills; when
    /// trimming, `shrink` additionally returns excess capacity.
    pub fn resize(&mut self, new_len: usize, shrink: bool) {
        let vec = self.make_owned_mut();
        if new_len <= vec.len() {
            vec.truncate(new_len);
            if shrink {
                vec.shrink_to_fit();
            }
        } else {
            vec.resize(new_len, 0);
        }
    }

    /// Discharges the release obligation (dropping a wrapped owner exactly
    /// once) and returns the buffer to its empty initial state. Resetting an
    /// already-empty buffer is a no-op.
    pub fn reset(&mut self) {
        match &self.storage {
            Storage::Owned(vec) if vec.is_empty() => {}
            _ => self.storage = Storage::Owned(Vec64::new()),
        }
    }

    /// Moves the contents (and any release obligation) out, leaving this
    /// buffer empty. The source can be reused or dropped freely afterwards.
    #[inline]
    pub fn take(&mut self) -> Buffer {
        std::mem::take(self)
    }

    /// Reinterprets the buffer as a slice of fixed-width values.
    ///
    /// # Panics
    /// Panics when the byte length is not a multiple of the element width or
    /// the backing pointer is not aligned for `T`; both indicate the buffer
    /// was not written as a `T` sequence.
    #[inline]
    pub fn typed_slice<T: Primitive>(&self) -> &[T] {
        let bytes = self.as_slice();
        assert_eq!(
            bytes.len() % size_of::<T>(),
            0,
            "buffer length {} is not a whole number of {}-byte elements",
            bytes.len(),
            size_of::<T>()
        );
        if bytes.is_empty() {
            return &[];
        }
        assert_eq!(
            bytes.as_ptr() as usize % std::mem::align_of::<T>(),
            0,
            "buffer is not aligned for the requested element type"
        );
        unsafe { slice::from_raw_parts(bytes.as_ptr() as *const T, bytes.len() / size_of::<T>()) }
    }

    /// Reads element `idx` as a fixed-width value via an unaligned load, so
    /// it is total over wrapped foreign memory of any alignment.
    ///
    /// # Panics
    /// Panics when `(idx + 1) * size_of::<T>()` exceeds the byte length.
    #[inline]
    pub fn read_typed<T: Primitive>(&self, idx: usize) -> T {
        let bytes = self.as_slice();
        let offset = idx * size_of::<T>();
        assert!(
            offset + size_of::<T>() <= bytes.len(),
            "typed read at element {idx} is out of bounds for {} bytes",
            bytes.len()
        );
        unsafe { std::ptr::read_unaligned(bytes.as_ptr().add(offset) as *const T) }
    }

    /// Ensure owned and return `&mut Vec64<u8>`, copying wrapped bytes and
    /// discharging the wrapped owner's release obligation if needed.
    #[inline]
    fn make_owned_mut(&mut self) -> &mut Vec64<u8> {
        if let Storage::Wrapped { .. } = self.storage {
            let mut v = Vec64::with_capacity(self.len());
            v.extend_from_slice(self.as_slice());
            self.storage = Storage::Owned(v);
        }
        match &mut self.storage {
            Storage::Owned(vec) => vec,
            Storage::Wrapped { .. } => unreachable!(),
        }
    }
}

impl Default for Buffer {
    #[inline]
    fn default() -> Self {
        Buffer::new()
    }
}

impl Clone for Buffer {
    /// Cloning a wrapped buffer copies its bytes into owned storage; the
    /// foreign owner stays with the source.
    fn clone(&self) -> Self {
        let mut out = Buffer::from_slice(self.as_slice());
        out.element_size_hint = self.element_size_hint;
        out
    }
}

impl PartialEq for Buffer {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Deref for Buffer {
    type Target = [u8];
    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for Buffer {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("wrapped", &self.is_wrapped())
            .finish()
    }
}

// SAFETY: Wrapped owners are constrained to Send + Sync and the raw pointer
// targets memory the boxed owner keeps alive.
unsafe impl Send for Buffer {}
unsafe impl Sync for Buffer {}

#[cfg(feature = "parallel_proc")]
impl Buffer {
    #[inline]
    pub fn par_iter(&self) -> rayon::slice::Iter<'_, u8> {
        use rayon::iter::IntoParallelRefIterator;
        self.as_slice().par_iter()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_append_and_fill() {
        let mut buf = Buffer::new();
        assert_eq!(buf.len(), 0);
        buf.append(b"1234");
        assert_eq!(buf.as_slice(), b"1234");
        buf.append_fill(0xFF, 3);
        assert_eq!(buf.as_slice(), &[b'1', b'2', b'3', b'4', 0xFF, 0xFF, 0xFF]);
        assert!(buf.capacity() >= buf.len());
    }

    #[test]
    fn test_growth_is_power_of_two() {
        let mut buf = Buffer::new();
        buf.append_fill(0xAB, 123);
        assert_eq!(buf.len(), 123);
        assert!(buf.capacity() >= 128);
    }

    #[test]
    fn test_resize() {
        let mut buf = Buffer::from_slice(b"abcdef");
        buf.resize(3, false);
        assert_eq!(buf.as_slice(), b"abc");
        buf.resize(5, false);
        assert_eq!(buf.as_slice(), &[b'a', b'b', b'c', 0, 0]);
        buf.resize(0, true);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_typed_round_trip() {
        let mut buf = Buffer::new();
        buf.push_typed(0i32);
        buf.push_typed(1i32);
        buf.push_typed(4i32);
        assert_eq!(buf.len(), 12);
        assert_eq!(buf.typed_slice::<i32>(), &[0, 1, 4]);
        assert_eq!(buf.read_typed::<i32>(2), 4);
    }

    #[test]
    fn test_from_sequence() {
        let buf = Buffer::from_sequence(&[8f32, 4.0, 2.0]);
        assert_eq!(buf.len(), 12);
        assert_eq!(buf.element_size_hint(), 4);
        assert_eq!(buf.typed_slice::<f32>(), &[8.0, 4.0, 2.0]);
    }

    /// Drop-counting owner for exercising the release obligation.
    struct CountedOwner {
        drops: Arc<AtomicUsize>,
        bytes: Vec<u8>,
    }

    impl AsRef<[u8]> for CountedOwner {
        fn as_ref(&self) -> &[u8] {
            &self.bytes
        }
    }

    impl Drop for CountedOwner {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_wrapped_owner_released_exactly_once_on_reset() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut buf = Buffer::from_owner(CountedOwner {
            drops: drops.clone(),
            bytes: vec![1, 2, 3, 4],
        });
        assert!(buf.is_wrapped());
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        buf.reset();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(buf.is_empty());

        // Second reset of the now-empty buffer must not fire again.
        buf.reset();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wrapped_owner_released_once_on_drop() {
        let drops = Arc::new(AtomicUsize::new(0));
        {
            let _buf = Buffer::from_owner(CountedOwner {
                drops: drops.clone(),
                bytes: vec![9],
            });
        }
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wrapped_obligation_moves_with_take() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut src = Buffer::from_owner(CountedOwner {
            drops: drops.clone(),
            bytes: vec![7, 8],
        });
        let dst = src.take();
        assert!(src.is_empty());
        assert!(!src.is_wrapped());
        assert_eq!(dst.as_slice(), &[7, 8]);
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        // Resetting the emptied source never touches the moved owner.
        src.reset();
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        drop(dst);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wrapped_without_byte_view() {
        struct Opaque;
        let buf = unsafe { Buffer::wrapped(Opaque, std::ptr::null(), 0) };
        assert!(buf.is_wrapped());
        assert!(buf.is_empty());
        assert_eq!(buf.as_slice(), &[] as &[u8]);
    }

    #[test]
    fn test_mutation_of_wrapped_copies_to_owned() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut buf = Buffer::from_owner(CountedOwner {
            drops: drops.clone(),
            bytes: vec![1, 2],
        });
        buf.append(&[3]);
        // The copy-on-write discharged the wrapped owner.
        assert!(!buf.is_wrapped());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert_eq!(buf.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_clone_leaves_owner_with_source() {
        let drops = Arc::new(AtomicUsize::new(0));
        let buf = Buffer::from_owner(CountedOwner {
            drops: drops.clone(),
            bytes: vec![5, 6],
        });
        let copy = buf.clone();
        assert!(!copy.is_wrapped());
        assert_eq!(copy.as_slice(), &[5, 6]);
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        drop(buf);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_try_reserve_overflow_is_allocation_error() {
        let mut buf = Buffer::from_slice(b"x");
        let err = buf.try_reserve(usize::MAX).unwrap_err();
        assert_eq!(err.kind(), "allocation");
    }
}
