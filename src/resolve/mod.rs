//! Typed reference parsing, resolution, and autocomplete.

mod autocomplete;
mod error;
mod lookup;
mod parse;

pub use autocomplete::Suggestion;
pub use error::ResolveError;
pub use lookup::{Resolution, ResolveContext, Resolver, Snapshot};
pub use parse::parse_refs;
