//! Object/ref store.
//!
//! Provides:
//! - blob/tree/commit/tag construction directly in the object database
//! - compare-and-swap ref updates with bounded jittered retry
//! - merge-tolerant note appends (concatenate-then-dedupe JSONL)
//! - wire formats for every persisted record shape

pub mod error;
pub mod notes;
pub mod odb;
pub mod refs;
pub mod wire;

pub use error::{StoreError, WireError};
pub use refs::{CasOutcome, RetryPolicy, compare_and_swap, read_ref, with_cas_retry};
