//! Chat over git notes, with vault-keyed encryption.

mod crypto;
mod error;
mod store;

pub use crypto::Vault;
pub use error::ChatError;
pub use store::{ChatStore, MessageListing, MessageScope, ThreadDraft};
