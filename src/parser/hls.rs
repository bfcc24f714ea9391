//! HLS playlist adapter
//!
//! Parses playlists with `m3u8-rs` and maps them onto the normalized model.
//! Master playlists become renditions whose segment lists are left unfetched;
//! media playlists become segment lists with every URI resolved against the
//! playlist's own URL.

use m3u8_rs::{AlternativeMediaType, MasterPlaylist, MediaPlaylist, Playlist};
use std::collections::BTreeMap;
use tracing::debug;

use crate::errors::{ConcatError, ConcatResult};
use crate::models::{
    Attributes, AudioGroup, AudioTrack, Dialect, InitSegment, MasterManifest, MediaGroups,
    MediaManifest, NormalizedManifest, Rendition, Resolution, Segment,
};
use crate::utils::UrlUtils;

/// Longest parser message carried into an error; nom echoes the remaining input
const MAX_ERROR_LEN: usize = 200;

/// Parse an HLS document fetched from `base_url`
pub fn parse(manifest_text: &str, base_url: &str) -> ConcatResult<NormalizedManifest> {
    match m3u8_rs::parse_playlist_res(manifest_text.as_bytes()) {
        Ok(Playlist::MasterPlaylist(master)) => Ok(NormalizedManifest::Master(
            master_manifest(master, base_url),
        )),
        Ok(Playlist::MediaPlaylist(media)) => Ok(NormalizedManifest::Media(media_manifest(
            media, base_url,
        ))),
        Err(e) => {
            let message: String = e.to_string().chars().take(MAX_ERROR_LEN).collect();
            Err(ConcatError::parse(Dialect::Hls, base_url, message))
        }
    }
}

/// Parse a document that must be a media playlist
pub fn parse_media(manifest_text: &str, base_url: &str) -> ConcatResult<MediaManifest> {
    match parse(manifest_text, base_url)? {
        NormalizedManifest::Media(media) => Ok(media),
        NormalizedManifest::Master(_) => Err(ConcatError::parse(
            Dialect::Hls,
            base_url,
            "expected a media playlist, found a master playlist",
        )),
    }
}

fn master_manifest(master: MasterPlaylist, base_url: &str) -> MasterManifest {
    let playlists: Vec<Rendition> = master
        .variants
        .into_iter()
        .filter(|variant| !variant.is_i_frame)
        .map(|variant| {
            let resolved_uri = UrlUtils::resolve(base_url, &variant.uri);
            let attributes = Attributes {
                bandwidth: Some(variant.bandwidth),
                resolution: variant.resolution.map(|r| Resolution {
                    width: r.width,
                    height: r.height,
                }),
                codecs: variant.codecs,
                audio: variant.audio,
            };
            Rendition::unresolved(variant.uri, resolved_uri, attributes)
        })
        .collect();

    let mut audio: BTreeMap<String, AudioGroup> = BTreeMap::new();
    for alternative in master.alternatives {
        if alternative.media_type != AlternativeMediaType::Audio {
            continue;
        }

        let resolved_uri = alternative
            .uri
            .as_deref()
            .map(|uri| UrlUtils::resolve(base_url, uri));
        audio
            .entry(alternative.group_id)
            .or_default()
            .tracks
            .push(AudioTrack {
                name: alternative.name,
                language: alternative.language,
                default: alternative.default,
                autoselect: alternative.autoselect,
                uri: alternative.uri,
                resolved_uri,
                playlists: None,
            });
    }

    debug!(
        "Parsed HLS master playlist with {} rendition(s) and {} audio group(s)",
        playlists.len(),
        audio.len()
    );

    MasterManifest {
        playlists,
        media_groups: MediaGroups { audio },
    }
}

fn media_manifest(media: MediaPlaylist, base_url: &str) -> MediaManifest {
    let mut timeline = 0;
    let mut current_map: Option<InitSegment> = None;
    let mut segments = Vec::with_capacity(media.segments.len());

    for (index, segment) in media.segments.into_iter().enumerate() {
        if segment.discontinuity && index > 0 {
            timeline += 1;
        }

        // EXT-X-MAP applies to every following segment until replaced
        if let Some(map) = segment.map {
            current_map = Some(InitSegment {
                resolved_uri: UrlUtils::resolve(base_url, &map.uri),
                uri: map.uri,
            });
        }

        segments.push(Segment {
            resolved_uri: UrlUtils::resolve(base_url, &segment.uri),
            uri: segment.uri,
            duration: f64::from(segment.duration),
            discontinuity: segment.discontinuity,
            timeline,
            map: current_map.clone(),
        });
    }

    debug!("Parsed HLS media playlist with {} segment(s)", segments.len());

    MediaManifest {
        segments,
        attributes: Attributes::default(),
        resolved_uri: base_url.to_string(),
        target_duration: media.target_duration as f64,
        end_list: media.end_list,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U
#EXT-X-VERSION:4
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aud\",NAME=\"English\",LANGUAGE=\"en\",DEFAULT=YES,AUTOSELECT=YES,URI=\"audio/en.m3u8\"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aud\",NAME=\"Deutsch\",LANGUAGE=\"de\",DEFAULT=NO,AUTOSELECT=YES,URI=\"audio/de.m3u8\"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID=\"subs\",NAME=\"English\",URI=\"subs/en.m3u8\"
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360,CODECS=\"avc1.4d401e\",AUDIO=\"aud\"
low/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720,CODECS=\"avc1.4d401f\",AUDIO=\"aud\"
https://cdn.example.com/high/index.m3u8
#EXT-X-I-FRAME-STREAM-INF:BANDWIDTH=100000,URI=\"iframes.m3u8\"
";

    const MEDIA: &str = "#EXTM3U
#EXT-X-VERSION:6
#EXT-X-TARGETDURATION:10
#EXT-X-MEDIA-SEQUENCE:0
#EXT-X-MAP:URI=\"init.mp4\"
#EXTINF:10.0,
seg0.m4s
#EXTINF:9.5,
seg1.m4s
#EXT-X-DISCONTINUITY
#EXTINF:4.0,
../other/seg2.m4s
#EXT-X-ENDLIST
";

    #[test]
    fn test_master_playlist() {
        let manifest = parse(MASTER, "http://example.com/vod/master.m3u8").unwrap();
        let NormalizedManifest::Master(master) = manifest else {
            panic!("expected master manifest");
        };

        assert_eq!(master.playlists.len(), 2);
        let low = &master.playlists[0];
        assert_eq!(low.uri, "low/index.m3u8");
        assert_eq!(low.resolved_uri, "http://example.com/vod/low/index.m3u8");
        assert_eq!(low.attributes.bandwidth, Some(800_000));
        assert_eq!(low.height(), Some(360));
        assert_eq!(low.attributes.codecs.as_deref(), Some("avc1.4d401e"));
        assert_eq!(low.attributes.audio.as_deref(), Some("aud"));
        assert!(!low.is_resolved());

        assert_eq!(
            master.playlists[1].resolved_uri,
            "https://cdn.example.com/high/index.m3u8"
        );

        let group = master.media_groups.audio_group("aud").unwrap();
        let names: Vec<&str> = group.tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["English", "Deutsch"]);
        assert!(group.tracks[0].default);
        assert_eq!(
            group.tracks[0].resolved_uri.as_deref(),
            Some("http://example.com/vod/audio/en.m3u8")
        );
        assert!(master.media_groups.audio_group("subs").is_none());
    }

    #[test]
    fn test_media_playlist() {
        let manifest = parse(MEDIA, "http://example.com/vod/low/index.m3u8").unwrap();
        let NormalizedManifest::Media(media) = manifest else {
            panic!("expected media manifest");
        };

        assert_eq!(media.target_duration, 10.0);
        assert!(media.end_list);
        assert_eq!(media.resolved_uri, "http://example.com/vod/low/index.m3u8");
        assert_eq!(media.segments.len(), 3);

        let timelines: Vec<u64> = media.segments.iter().map(|s| s.timeline).collect();
        assert_eq!(timelines, vec![0, 0, 1]);
        assert!(media.segments[2].discontinuity);
        assert_eq!(
            media.segments[2].resolved_uri,
            "http://example.com/vod/other/seg2.m4s"
        );

        // The map carries forward to segments after the one it was declared on
        for segment in &media.segments {
            let map = segment.map.as_ref().unwrap();
            assert_eq!(map.resolved_uri, "http://example.com/vod/low/init.mp4");
        }
    }

    #[test]
    fn test_parse_media_rejects_master() {
        let err = parse_media(MASTER, "http://example.com/vod/master.m3u8").unwrap_err();
        assert!(matches!(err, ConcatError::Parse { dialect: Dialect::Hls, .. }));
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let err = parse("<html>not a playlist</html>", "http://example.com/x.m3u8").unwrap_err();
        assert!(matches!(err, ConcatError::Parse { .. }));
    }
}
