//! # Picoarrow
//!
//! Columnar in-memory data interchange core: growable byte buffers with
//! bit-packed validity bitmasks, a compact recursive type/schema encoding,
//! an incremental array-construction state machine, a validated decoding
//! layer, and a pull-based array stream protocol with exactly-once release
//! semantics.
//!
//! Ownership is single-owner throughout: buffers, arrays, and stream
//! producers each have exactly one live owner, transfers empty the source,
//! and [`ArrayView`] is the one borrowing surface. No wire transport,
//! compression, or compute layer lives here.

pub mod enums {
    pub mod arrow_type;
    pub mod error;
    pub mod lifecycle;
}

pub mod structs {
    pub mod views {
        pub mod array_view;
    }
    pub mod array;
    pub mod bitmask;
    pub mod buffer;
    pub mod schema;
    pub mod stream;
}

pub mod traits {
    pub mod type_unions;
}

pub mod utils;

pub use enums::arrow_type::{ArrowType, DictionaryIndex, OffsetWidth};
pub use enums::error::PicoarrowError;
pub use enums::lifecycle::{BuildState, StreamState, ValidationLevel};

pub use structs::array::{Array, NULL_COUNT_UNKNOWN};
pub use structs::bitmask::Bitmask;
pub use structs::buffer::Buffer;
pub use structs::schema::{Metadata, Schema};
pub use structs::stream::{ArrayStream, EmptyStream, ReplayStream, StreamIter, StreamProducer};
pub use structs::views::array_view::{
    ArrayView, BoolSlots, ByteSlots, FixedSlots, PrimitiveSlots,
};

pub use traits::type_unions::Primitive;
