//! Lazy segment-list resolution
//!
//! HLS master playlists only reference their renditions' media playlists.
//! Once renditions are selected, the ones still lacking segments are fetched
//! in a second phase and filled in.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::errors::ConcatResult;
use crate::fetch::FetchCoordinator;
use crate::models::{MediaManifest, Rendition};
use crate::parser::hls;

/// Fetch and attach segment lists for every unresolved rendition
///
/// Renditions that already carry segments are left untouched. Unresolved
/// renditions sharing a resolved URI are fetched once and all receive the
/// same segment list.
pub async fn resolve_segments(
    coordinator: &FetchCoordinator,
    renditions: &mut [Rendition],
) -> ConcatResult<()> {
    let mut pending: Vec<String> = Vec::new();
    for rendition in renditions.iter().filter(|r| !r.is_resolved()) {
        if !pending.contains(&rendition.resolved_uri) {
            pending.push(rendition.resolved_uri.clone());
        }
    }

    if pending.is_empty() {
        debug!("All selected renditions already carry segments");
        return Ok(());
    }

    info!("Resolving segment lists for {} playlist(s)", pending.len());
    let bodies = coordinator.fetch_all(&pending).await?;

    let mut media_by_uri: HashMap<&str, MediaManifest> = HashMap::with_capacity(pending.len());
    for uri in &pending {
        let body = bodies.get(uri).map(String::as_str).unwrap_or_default();
        media_by_uri.insert(uri.as_str(), hls::parse_media(body, uri)?);
    }

    for rendition in renditions.iter_mut().filter(|r| !r.is_resolved()) {
        if let Some(media) = media_by_uri.get(rendition.resolved_uri.as_str()) {
            rendition.segments = Some(media.segments.clone());
            rendition.target_duration = Some(media.target_duration);
        }
    }

    Ok(())
}
