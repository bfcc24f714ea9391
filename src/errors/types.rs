//! Error type definitions for manifest concatenation

use thiserror::Error;

use crate::models::Dialect;

/// Top-level error type
///
/// Variants follow the order in which a concatenation run can fail:
/// input validation, network fetches, manifest parsing, and finally the
/// compatibility checks performed once all manifests are known.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConcatError {
    /// Invalid caller input. Displayed verbatim.
    #[error("{message}")]
    Validation { message: String },

    /// Transport failure (`status` is `None`) or an unaccepted status code
    #[error("Request failed for {url}: {message}")]
    Request {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// Manifest document could not be parsed by the dialect parser
    #[error("Parse error ({dialect}) for {url}: {message}")]
    Parse {
        dialect: Dialect,
        url: String,
        message: String,
    },

    /// Declared mime type maps to no known dialect
    #[error("Unsupported mime type: {mime_type}")]
    UnsupportedMimeType { mime_type: String },

    /// Sources cannot be combined into one playback timeline
    #[error("Compatibility error: {message}")]
    Compatibility { message: String },

    /// A collaborator could not be constructed from configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Convenience methods for creating common error types
impl ConcatError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a compatibility error
    pub fn compatibility<S: Into<String>>(message: S) -> Self {
        Self::Compatibility {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a request error for a failure that never produced a response
    pub fn transport<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Request {
            url: url.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Create a request error for a response with an unaccepted status code
    pub fn status<U: Into<String>>(url: U, status: u16) -> Self {
        Self::Request {
            url: url.into(),
            status: Some(status),
            message: format!("unexpected HTTP status {status}"),
        }
    }

    /// Create a parse error
    pub fn parse<U: Into<String>, M: Into<String>>(dialect: Dialect, url: U, message: M) -> Self {
        Self::Parse {
            dialect,
            url: url.into(),
            message: message.into(),
        }
    }

    /// URL of the offending request, for request errors
    pub fn request_url(&self) -> Option<&str> {
        match self {
            Self::Request { url, .. } => Some(url),
            _ => None,
        }
    }
}
