//! Playlist combination
//!
//! Splices the segment lists of same-role renditions (all video or all
//! audio) into one playlist. Each junction between renditions is marked as a
//! discontinuity and starts a new timeline.

use crate::models::{Attributes, COMBINED_PLAYLIST_URI, CombinedPlaylist, Rendition};

/// Combine renditions, in order, into one playlist
///
/// Inputs are never modified; segments are copied before being renumbered.
/// `uri_suffix` keeps the audio playlist's URI distinct from the video one.
pub fn combine_playlists(renditions: &[Rendition], uri_suffix: Option<&str>) -> CombinedPlaylist {
    let mut segments = Vec::new();
    let mut discontinuity_starts = Vec::new();
    let mut timeline = 0;

    for (index, rendition) in renditions.iter().enumerate() {
        let mut copied = rendition.segments.clone().unwrap_or_default();
        if index > 0
            && let Some(first) = copied.first_mut()
        {
            first.discontinuity = true;
        }

        for mut segment in copied {
            if segments.is_empty() {
                segment.discontinuity = false;
            } else if segment.discontinuity {
                timeline += 1;
                discontinuity_starts.push(segments.len());
            }
            segment.timeline = timeline;
            segments.push(segment);
        }
    }

    let target_duration = renditions
        .iter()
        .map(|rendition| {
            rendition.target_duration.unwrap_or_else(|| {
                rendition
                    .segments
                    .iter()
                    .flatten()
                    .map(|segment| segment.duration)
                    .fold(0.0, f64::max)
            })
        })
        .fold(0.0, f64::max);

    let attributes = Attributes {
        bandwidth: renditions
            .iter()
            .filter_map(|r| r.attributes.bandwidth)
            .max(),
        resolution: renditions.iter().find_map(|r| r.attributes.resolution),
        codecs: renditions
            .iter()
            .find_map(|r| r.attributes.codecs.clone()),
        audio: None,
    };

    let uri = format!("{}{}", COMBINED_PLAYLIST_URI, uri_suffix.unwrap_or_default());

    CombinedPlaylist {
        resolved_uri: uri.clone(),
        uri,
        attributes,
        segments,
        target_duration,
        discontinuity_starts,
        discontinuity_sequence: 0,
        media_sequence: 0,
        end_list: true,
    }
}
