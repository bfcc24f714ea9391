//! Data model shared by every pipeline stage
//!
//! Input manifests of both dialects are normalized into [`NormalizedManifest`].
//! The concatenation result is a [`CombinedManifest`], serialized with the
//! field names the playback engine reads (`resolvedUri`, `mediaGroups`,
//! `targetDuration`, ...).

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// URI of the synthetic master manifest
pub const COMBINED_MANIFEST_URI: &str = "combined-manifest";
/// URI of the combined video playlist; the audio playlist appends a suffix
pub const COMBINED_PLAYLIST_URI: &str = "combined-playlist";
/// Suffix keeping the combined audio playlist URI distinct from the video one
pub const AUDIO_PLAYLIST_SUFFIX: &str = "-audio";
/// URI of the synthetic default audio track
pub const COMBINED_AUDIO_TRACK_URI: &str = "combined-audio-playlists";
/// Group id referenced by the combined video playlist's `AUDIO` attribute
pub const COMBINED_AUDIO_GROUP: &str = "audio";
/// Name of the synthetic audio track within [`COMBINED_AUDIO_GROUP`]
pub const COMBINED_AUDIO_TRACK_NAME: &str = "default";

/// Manifest dialect, decided by the declared mime type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Segment-list text format (HLS, `.m3u8`)
    Hls,
    /// XML segment-template format (DASH, `.mpd`)
    Dash,
}

impl Dialect {
    /// Map a declared mime type onto a dialect. Matching ignores case and any
    /// parameters after `;`.
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/x-mpegurl"
            | "application/vnd.apple.mpegurl"
            | "audio/mpegurl"
            | "audio/x-mpegurl" => Some(Self::Hls),
            "application/dash+xml" => Some(Self::Dash),
            _ => None,
        }
    }

    /// Canonical mime type for the dialect
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Hls => "application/x-mpegURL",
            Self::Dash => "application/dash+xml",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hls => write!(f, "hls"),
            Self::Dash => write!(f, "dash"),
        }
    }
}

/// One video to concatenate, as supplied by the caller
///
/// Both fields are optional so that incomplete input can be rejected with a
/// precise validation message rather than a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpec {
    pub url: Option<String>,
    pub mime_type: Option<String>,
}

impl SourceSpec {
    pub fn new<U: Into<String>, M: Into<String>>(url: U, mime_type: M) -> Self {
        Self {
            url: Some(url.into()),
            mime_type: Some(mime_type.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u64,
    pub height: u64,
}

/// Rendition attributes, keyed the way HLS spells them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(rename = "BANDWIDTH", skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<u64>,
    #[serde(rename = "RESOLUTION", skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(rename = "CODECS", skip_serializing_if = "Option::is_none")]
    pub codecs: Option<String>,
    #[serde(rename = "AUDIO", skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

/// Initialization segment reference (`EXT-X-MAP` or DASH `Initialization`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitSegment {
    pub uri: String,
    pub resolved_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub uri: String,
    pub resolved_uri: String,
    pub duration: f64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub discontinuity: bool,
    pub timeline: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<InitSegment>,
}

/// One concrete encoded stream
///
/// `segments` is `None` until the rendition's media playlist has been
/// fetched; DASH renditions and direct media manifests arrive resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rendition {
    pub uri: String,
    pub resolved_uri: String,
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<Segment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_duration: Option<f64>,
}

impl Rendition {
    /// Rendition whose segment list still has to be fetched
    pub fn unresolved<U: Into<String>, R: Into<String>>(
        uri: U,
        resolved_uri: R,
        attributes: Attributes,
    ) -> Self {
        Self {
            uri: uri.into(),
            resolved_uri: resolved_uri.into(),
            attributes,
            segments: None,
            target_duration: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.segments.is_some()
    }

    /// Vertical resolution, when declared
    pub fn height(&self) -> Option<u64> {
        self.attributes.resolution.map(|r| r.height)
    }
}

/// Entry of an AUDIO media group
///
/// A track is either a leaf rendition (`resolved_uri` set), a group of
/// nested renditions (`playlists` set, DASH), or a muxed placeholder that
/// carries neither.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    #[serde(skip)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub default: bool,
    pub autoselect: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlists: Option<Vec<Rendition>>,
}

/// Named tracks of one media group, kept in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioGroup {
    pub tracks: Vec<AudioTrack>,
}

impl Serialize for AudioGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.tracks.iter().map(|track| (&track.name, track)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaGroups {
    #[serde(rename = "AUDIO")]
    pub audio: BTreeMap<String, AudioGroup>,
}

impl MediaGroups {
    pub fn audio_group(&self, group_id: &str) -> Option<&AudioGroup> {
        self.audio.get(group_id)
    }
}

/// Manifest listing renditions to choose among
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterManifest {
    pub playlists: Vec<Rendition>,
    pub media_groups: MediaGroups,
}

/// Manifest describing one rendition's segments directly
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaManifest {
    pub segments: Vec<Segment>,
    pub attributes: Attributes,
    pub resolved_uri: String,
    pub target_duration: f64,
    pub end_list: bool,
}

impl MediaManifest {
    /// View this media manifest as a resolved single rendition
    pub fn into_rendition(self) -> Rendition {
        Rendition {
            uri: self.resolved_uri.clone(),
            resolved_uri: self.resolved_uri,
            attributes: self.attributes,
            segments: Some(self.segments),
            target_duration: Some(self.target_duration),
        }
    }
}

/// Result of normalizing one fetched manifest
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedManifest {
    Master(MasterManifest),
    Media(MediaManifest),
}

impl NormalizedManifest {
    /// Candidate renditions: every master playlist, or the media manifest
    /// itself as a single resolved rendition.
    pub fn renditions(&self) -> Vec<Rendition> {
        match self {
            Self::Master(master) => master.playlists.clone(),
            Self::Media(media) => vec![media.clone().into_rendition()],
        }
    }

    pub fn media_groups(&self) -> Option<&MediaGroups> {
        match self {
            Self::Master(master) => Some(&master.media_groups),
            Self::Media(_) => None,
        }
    }
}

/// Segments of several renditions spliced into one playlist
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedPlaylist {
    pub uri: String,
    pub resolved_uri: String,
    pub attributes: Attributes,
    pub segments: Vec<Segment>,
    pub target_duration: f64,
    pub discontinuity_starts: Vec<usize>,
    pub discontinuity_sequence: u64,
    pub media_sequence: u64,
    pub end_list: bool,
}

/// The synthetic default audio track of a combined manifest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedAudioTrack {
    pub autoselect: bool,
    pub default: bool,
    pub language: String,
    pub uri: String,
    pub playlists: Vec<CombinedPlaylist>,
}

/// Media groups of the combined manifest. Only AUDIO is ever populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CombinedMediaGroups {
    #[serde(rename = "AUDIO")]
    pub audio: BTreeMap<String, BTreeMap<String, CombinedAudioTrack>>,
    #[serde(rename = "VIDEO")]
    pub video: BTreeMap<String, serde_json::Value>,
    #[serde(rename = "CLOSED-CAPTIONS")]
    pub closed_captions: BTreeMap<String, serde_json::Value>,
    #[serde(rename = "SUBTITLES")]
    pub subtitles: BTreeMap<String, serde_json::Value>,
}

/// Final output: one video playlist and, optionally, one default audio track
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedManifest {
    pub uri: String,
    pub media_groups: CombinedMediaGroups,
    pub playlists: Vec<CombinedPlaylist>,
}

impl CombinedManifest {
    pub fn video_playlist(&self) -> Option<&CombinedPlaylist> {
        self.playlists.first()
    }

    pub fn audio_playlist(&self) -> Option<&CombinedPlaylist> {
        self.media_groups
            .audio
            .get(COMBINED_AUDIO_GROUP)
            .and_then(|group| group.get(COMBINED_AUDIO_TRACK_NAME))
            .and_then(|track| track.playlists.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_mime_type() {
        assert_eq!(Dialect::from_mime_type("application/x-mpegURL"), Some(Dialect::Hls));
        assert_eq!(
            Dialect::from_mime_type("application/vnd.apple.mpegurl; charset=utf-8"),
            Some(Dialect::Hls)
        );
        assert_eq!(Dialect::from_mime_type("application/dash+xml"), Some(Dialect::Dash));
        assert_eq!(Dialect::from_mime_type("video/mp4"), None);
        assert_eq!(Dialect::from_mime_type(""), None);
    }

    #[test]
    fn test_audio_group_serializes_as_ordered_map() {
        let group = AudioGroup {
            tracks: vec![
                AudioTrack {
                    name: "English".to_string(),
                    default: true,
                    ..Default::default()
                },
                AudioTrack {
                    name: "Deutsch".to_string(),
                    ..Default::default()
                },
            ],
        };

        let json = serde_json::to_string(&group).unwrap();
        assert!(json.starts_with(r#"{"English":{"#));
        assert!(json.find("English").unwrap() < json.find("Deutsch").unwrap());
    }

    #[test]
    fn test_segment_omits_false_discontinuity() {
        let segment = Segment {
            uri: "0.ts".to_string(),
            resolved_uri: "http://example.com/0.ts".to_string(),
            duration: 10.0,
            discontinuity: false,
            timeline: 0,
            map: None,
        };
        let value = serde_json::to_value(&segment).unwrap();
        assert!(value.get("discontinuity").is_none());
        assert_eq!(value["resolvedUri"], "http://example.com/0.ts");
    }
}
