//! Master manifest assembly

use std::collections::BTreeMap;

use crate::models::{
    COMBINED_AUDIO_GROUP, COMBINED_AUDIO_TRACK_NAME, COMBINED_AUDIO_TRACK_URI,
    COMBINED_MANIFEST_URI, CombinedAudioTrack, CombinedManifest, CombinedMediaGroups,
    CombinedPlaylist,
};

/// Wrap the combined video playlist, and the combined audio playlist when
/// audio is demuxed, into the synthetic master manifest
///
/// The audio track declares an empty language so the player never compares
/// languages across the spliced sources.
pub fn construct_master_manifest(
    mut video: CombinedPlaylist,
    audio: Option<CombinedPlaylist>,
) -> CombinedManifest {
    let mut media_groups = CombinedMediaGroups::default();

    if let Some(audio) = audio {
        video.attributes.audio = Some(COMBINED_AUDIO_GROUP.to_string());

        let track = CombinedAudioTrack {
            autoselect: true,
            default: true,
            language: String::new(),
            uri: COMBINED_AUDIO_TRACK_URI.to_string(),
            playlists: vec![audio],
        };
        media_groups.audio.insert(
            COMBINED_AUDIO_GROUP.to_string(),
            BTreeMap::from([(COMBINED_AUDIO_TRACK_NAME.to_string(), track)]),
        );
    }

    CombinedManifest {
        uri: COMBINED_MANIFEST_URI.to_string(),
        media_groups,
        playlists: vec![video],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combiner::combine_playlists;
    use crate::models::{AUDIO_PLAYLIST_SUFFIX, Attributes, Rendition, Segment};

    fn playlist(suffix: Option<&str>) -> CombinedPlaylist {
        let rendition = Rendition {
            segments: Some(vec![Segment {
                uri: "0.ts".to_string(),
                resolved_uri: "http://example.com/0.ts".to_string(),
                duration: 10.0,
                discontinuity: false,
                timeline: 0,
                map: None,
            }]),
            ..Rendition::unresolved("a.m3u8", "http://example.com/a.m3u8", Attributes::default())
        };
        combine_playlists(&[rendition], suffix)
    }

    #[test]
    fn test_video_only() {
        let manifest = construct_master_manifest(playlist(None), None);

        assert_eq!(manifest.uri, "combined-manifest");
        assert_eq!(manifest.playlists.len(), 1);
        assert!(manifest.media_groups.audio.is_empty());
        assert_eq!(manifest.video_playlist().unwrap().attributes.audio, None);
        assert!(manifest.audio_playlist().is_none());
    }

    #[test]
    fn test_with_demuxed_audio() {
        let manifest =
            construct_master_manifest(playlist(None), Some(playlist(Some(AUDIO_PLAYLIST_SUFFIX))));

        let video = manifest.video_playlist().unwrap();
        assert_eq!(video.attributes.audio.as_deref(), Some("audio"));

        let track = &manifest.media_groups.audio["audio"]["default"];
        assert!(track.default);
        assert!(track.autoselect);
        assert_eq!(track.language, "");
        assert_eq!(track.uri, "combined-audio-playlists");
        assert_eq!(manifest.audio_playlist().unwrap().uri, "combined-playlist-audio");
    }

    #[test]
    fn test_serialized_shape() {
        let manifest =
            construct_master_manifest(playlist(None), Some(playlist(Some(AUDIO_PLAYLIST_SUFFIX))));
        let value = serde_json::to_value(&manifest).unwrap();

        assert_eq!(value["uri"], "combined-manifest");
        assert_eq!(value["playlists"][0]["attributes"]["AUDIO"], "audio");
        assert_eq!(value["playlists"][0]["endList"], true);
        assert_eq!(value["playlists"][0]["targetDuration"], 10.0);
        for group in ["VIDEO", "CLOSED-CAPTIONS", "SUBTITLES"] {
            assert_eq!(value["mediaGroups"][group], serde_json::json!({}));
        }
        assert_eq!(
            value["mediaGroups"]["AUDIO"]["audio"]["default"]["playlists"][0]["resolvedUri"],
            "combined-playlist-audio"
        );
    }
}
