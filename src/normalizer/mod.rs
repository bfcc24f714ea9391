//! Manifest normalization
//!
//! Dispatches a fetched document to the parser of its declared dialect.

use tracing::debug;

use crate::errors::{ConcatError, ConcatResult};
use crate::models::{Dialect, NormalizedManifest};
use crate::parser::{dash, hls};

/// Normalize the document fetched from `url`
///
/// DASH documents always become master manifests with resolved segment
/// lists. HLS master playlists keep their renditions unresolved; HLS media
/// playlists become media manifests resolved against `url`.
pub fn normalize(url: &str, manifest_text: &str, mime_type: &str) -> ConcatResult<NormalizedManifest> {
    let dialect = Dialect::from_mime_type(mime_type).ok_or_else(|| ConcatError::UnsupportedMimeType {
        mime_type: mime_type.to_string(),
    })?;

    debug!("Normalizing {} manifest from {}", dialect, url);

    match dialect {
        Dialect::Hls => hls::parse(manifest_text, url),
        Dialect::Dash => dash::parse(manifest_text, url).map(NormalizedManifest::Master),
    }
}
