pub mod assembler;
pub mod audio;
pub mod codec;
pub mod combiner;
pub mod concat;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod models;
pub mod normalizer;
pub mod parser;
pub mod resolver;
pub mod selection;
pub mod utils;

pub use concat::{ConcatRequest, ManifestConcatenator};
pub use errors::{ConcatError, ConcatResult};
