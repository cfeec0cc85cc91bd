use std::fmt::Debug;

use num_traits::{NumCast, ToPrimitive};

/// Trait for fixed-width element types that may be written to or read from a
/// value buffer as raw little-endian machine bytes.
///
/// Useful when specifying `my_fn::<T: Primitive>() {}` over typed appends and
/// decoded slot access. Bounded by the *num-traits* cast traits so appends
/// range-check and offset/index values widen losslessly when addressing
/// companion buffers.
pub trait Primitive: Copy + Default + PartialEq + Debug + ToPrimitive + NumCast + 'static {}

impl Primitive for i8 {}
impl Primitive for i16 {}
impl Primitive for i32 {}
impl Primitive for i64 {}
impl Primitive for u8 {}
impl Primitive for u16 {}
impl Primitive for u32 {}
impl Primitive for u64 {}
impl Primitive for f32 {}
impl Primitive for f64 {}
