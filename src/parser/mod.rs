//! Dialect parsers
//!
//! Each adapter turns one fetched document into the normalized model with
//! every URI resolved against the document's URL.

pub mod dash;
pub mod hls;
