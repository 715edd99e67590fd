//! Ledger service.
//!
//! Orphan run history plus immutable anchor tags on the primary history.

mod anchor;
mod error;
mod service;

pub use anchor::{create_anchor, read_anchor, run_tag_name};
pub use error::LedgerError;
pub use service::{LedgerService, RunDetail, RunFilter, RunListing};
