//! HTML extraction for listing and detail pages
//!
//! Both page kinds are described by declarative field tables (see
//! [`extract`]); the parsers only add the parts that are not a plain field
//! lookup, such as link resolution and location composition.

pub mod extract;
mod detail;
mod listing;
pub mod normalize;

pub use detail::DetailParser;
pub use listing::ListingParser;
pub use normalize::{clean_text, digits_only, to_count};

use thiserror::Error;

/// A hard-coded selector failed to compile
#[derive(Debug, Error)]
#[error("Invalid selector '{selector}': {message}")]
pub struct SelectorError {
    pub selector: String,
    pub message: String,
}
