//! # Lifecycle Module - *Builder and Stream State Tags*
//!
//! Explicit state tags for the two protocol state machines in the crate:
//! array construction and stream consumption. Tagging the state (rather than
//! relying on convention) is what lets a moved-from handle refuse further
//! mutation and lets release be idempotent.

/// Construction lifecycle of an [`Array`](crate::Array).
///
/// `Uninitialized → Initialized → Appending → Finished → Released`.
///
/// `Released` is terminal: a released (or moved-from) array holds no
/// resources and rejects mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Uninitialized,
    Initialized,
    Appending,
    Finished,
    Released,
}

/// Consumption lifecycle of an [`ArrayStream`](crate::ArrayStream).
///
/// `Errored` records that the immediately preceding call failed; `Exhausted`
/// persists, so every later pull keeps reporting end-of-stream rather than
/// an error. `Released` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Active,
    Errored,
    Exhausted,
    Released,
}

/// How much scanning a finish or view-construction pass performs.
///
/// `Full` is the default everywhere. `Minimal` is the named, explicit
/// opt-out for producers that are trusted to have written consistent
/// offsets and buffer sizes; it still checks structural arity and counts,
/// but skips the per-element offset and bounds scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationLevel {
    Minimal,
    #[default]
    Full,
}
