//! Utility modules shared across the pipeline
//!
//! URL handling, status code matching and the HTTP client collaborator.

pub mod http_client;
pub mod status_code_matcher;
pub mod url;

// Re-export commonly used types for convenience
pub use http_client::{HttpClient, HttpResponse, ReqwestHttpClient};
pub use url::UrlUtils;
