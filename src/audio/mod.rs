//! Demuxed audio pairing
//!
//! Every selected video rendition is paired with the default audio rendition
//! of the AUDIO group it references. Either every source pairs or none does:
//! a combined stream cannot switch between muxed and demuxed audio midway.

use tracing::{debug, info};

use crate::errors::{ConcatError, ConcatResult};
use crate::models::{Attributes, MediaGroups, NormalizedManifest, Rendition};

/// Default demuxed audio rendition for `video`, if any
///
/// Tracks are scanned in declaration order. The first default track that is
/// either a leaf rendition or carries nested renditions wins; default tracks
/// with neither are muxed placeholders and are skipped.
pub fn default_audio_rendition(
    video: &Rendition,
    media_groups: Option<&MediaGroups>,
) -> Option<Rendition> {
    let group_id = video.attributes.audio.as_deref()?;
    let group = media_groups?.audio_group(group_id)?;

    for track in group.tracks.iter().filter(|track| track.default) {
        if let Some(resolved_uri) = &track.resolved_uri {
            let uri = track.uri.clone().unwrap_or_else(|| resolved_uri.clone());
            return Some(Rendition::unresolved(
                uri,
                resolved_uri.clone(),
                Attributes::default(),
            ));
        }
        if let Some(first) = track.playlists.as_ref().and_then(|nested| nested.first()) {
            return Some(first.clone());
        }
        debug!("Skipping muxed audio placeholder {} in group {}", track.name, group_id);
    }

    None
}

/// Pair every source's selected video rendition with its audio rendition
///
/// Returns an empty list when no source has demuxed audio, one rendition per
/// source when all do, and an error otherwise.
pub fn pair_audio(
    manifests: &[NormalizedManifest],
    videos: &[Rendition],
) -> ConcatResult<Vec<Rendition>> {
    let paired: Vec<Option<Rendition>> = manifests
        .iter()
        .zip(videos)
        .map(|(manifest, video)| default_audio_rendition(video, manifest.media_groups()))
        .collect();

    let found = paired.iter().filter(|audio| audio.is_some()).count();
    if found == 0 {
        info!("No demuxed audio found, treating sources as muxed");
        return Ok(Vec::new());
    }
    if found != videos.len() {
        return Err(ConcatError::compatibility(format!(
            "Found demuxed audio for {} of {} sources; all or none must have it",
            found,
            videos.len()
        )));
    }

    info!("Paired demuxed audio for all {} sources", found);
    Ok(paired.into_iter().flatten().collect())
}
