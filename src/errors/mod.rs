//! Centralized error handling for manifest concatenation
//!
//! Every stage of the pipeline reports failures through [`ConcatError`]. No
//! stage recovers locally: the first error aborts the whole invocation and is
//! handed back to the caller unchanged.
//!
//! # Error Categories
//!
//! - **Validation Errors**: malformed input, raised before any network activity
//! - **Request Errors**: transport failures and unaccepted HTTP status codes
//! - **Parse Errors**: manifest documents the dialect parsers could not read
//! - **Compatibility Errors**: sources without a usable rendition, or audio
//!   pairing that differs between sources
//!
//! # Usage
//!
//! ```rust
//! use manifest_concat::errors::{ConcatError, ConcatResult};
//!
//! fn check(urls: &[&str]) -> ConcatResult<()> {
//!     if urls.is_empty() {
//!         return Err(ConcatError::validation("No sources provided"));
//!     }
//!     Ok(())
//! }
//!
//! assert_eq!(check(&[]).unwrap_err().to_string(), "No sources provided");
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using ConcatError
pub type ConcatResult<T> = Result<T, ConcatError>;
