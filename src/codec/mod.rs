//! Codec compatibility filtering
//!
//! Every candidate rendition is checked before selection: a rendition must
//! describe exactly one video and one audio codec, counting demuxed audio
//! declared through its default AUDIO group, and the video codec must be
//! accepted by the decoder-capability collaborator. Renditions without any
//! codec metadata are kept.
//!
//! The check is per source. Whether two sources' chosen renditions can be
//! decoded back to back is not verified here; that is left to the playback
//! engine.

use tracing::{debug, info};

use crate::config::DecoderConfig;
use crate::errors::{ConcatError, ConcatResult};
use crate::models::{MediaGroups, NormalizedManifest, Rendition};

const VIDEO_CODECS: &[&str] = &[
    "avc1", "avc3", "hvc1", "hev1", "dvh1", "dvhe", "vp08", "vp8", "vp09", "vp9", "av01", "mp4v",
    "theora",
];
const AUDIO_CODECS: &[&str] = &[
    "mp4a", "ac-3", "ec-3", "ac-4", "opus", "flac", "vorbis", "mp3", "alac", "dtsc", "dtse", "dtsh",
    "dtsl",
];
const TEXT_CODECS: &[&str] = &["wvtt", "stpp", "tx3g"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    Video,
    Audio,
    Text,
    Unknown,
}

/// Classify a single RFC 6381 codec string by its sample entry
pub fn classify(codec: &str) -> CodecKind {
    let fourcc = codec
        .trim()
        .split('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    if VIDEO_CODECS.contains(&fourcc.as_str()) {
        CodecKind::Video
    } else if AUDIO_CODECS.contains(&fourcc.as_str()) {
        CodecKind::Audio
    } else if TEXT_CODECS.contains(&fourcc.as_str()) {
        CodecKind::Text
    } else {
        CodecKind::Unknown
    }
}

/// Codecs a rendition carries, by role
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodecDescriptor {
    pub video: Vec<String>,
    pub audio: Vec<String>,
    pub other: Vec<String>,
}

impl CodecDescriptor {
    /// Parse a comma separated `CODECS` value
    pub fn parse(codecs: &str) -> Self {
        let mut descriptor = Self::default();
        for codec in codecs.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            match classify(codec) {
                CodecKind::Video => descriptor.video.push(codec.to_string()),
                CodecKind::Audio => descriptor.audio.push(codec.to_string()),
                CodecKind::Text | CodecKind::Unknown => descriptor.other.push(codec.to_string()),
            }
        }
        descriptor
    }

    pub fn count(&self) -> usize {
        self.video.len() + self.audio.len() + self.other.len()
    }

    /// Exactly one video and one audio codec, nothing else
    pub fn is_single_audio_video(&self) -> bool {
        self.count() == 2 && self.video.len() == 1 && self.audio.len() == 1
    }

    pub fn video_codec(&self) -> Option<&str> {
        self.video.first().map(String::as_str)
    }
}

/// Build the codec descriptor of a rendition
///
/// Returns `None` when the rendition declares no `CODECS`. When the
/// declaration lists no audio codec but the rendition's AUDIO group has a
/// demuxed default track, that track counts as the audio codec (using the
/// codec of its first nested rendition when known).
pub fn codec_descriptor(
    rendition: &Rendition,
    media_groups: Option<&MediaGroups>,
) -> Option<CodecDescriptor> {
    let codecs = rendition.attributes.codecs.as_deref()?;
    let mut descriptor = CodecDescriptor::parse(codecs);

    if descriptor.audio.is_empty()
        && let Some(group_id) = rendition.attributes.audio.as_deref()
        && let Some(group) = media_groups.and_then(|groups| groups.audio_group(group_id))
        && let Some(track) = group
            .tracks
            .iter()
            .find(|t| t.default && (t.resolved_uri.is_some() || t.playlists.is_some()))
    {
        let audio_codec = track
            .playlists
            .as_ref()
            .and_then(|playlists| playlists.first())
            .and_then(|nested| nested.attributes.codecs.clone())
            .unwrap_or_else(|| "mp4a".to_string());
        descriptor.audio.push(audio_codec);
    }

    Some(descriptor)
}

/// Decoder-capability collaborator
pub trait DecoderSupport: Send + Sync {
    fn is_supported(&self, video_codec: &str) -> bool;
}

/// Stand-in used when no capability query is available: accepts everything
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveDecoderSupport;

impl DecoderSupport for PermissiveDecoderSupport {
    fn is_supported(&self, _video_codec: &str) -> bool {
        true
    }
}

/// Accepts codecs whose sample entry (`avc1`, `hvc1`, ...) is listed
#[derive(Debug, Clone, Default)]
pub struct CodecAllowList {
    entries: Vec<String>,
}

impl CodecAllowList {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| entry.as_ref().trim().to_ascii_lowercase())
                .filter(|entry| !entry.is_empty())
                .collect(),
        }
    }
}

impl DecoderSupport for CodecAllowList {
    fn is_supported(&self, video_codec: &str) -> bool {
        let codec = video_codec.trim().to_ascii_lowercase();
        self.entries.iter().any(|entry| {
            codec == *entry
                || codec
                    .strip_prefix(entry.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

/// Decoder support described by configuration; no allow-list means permissive
pub fn decoder_support_from_config(config: &DecoderConfig) -> Box<dyn DecoderSupport> {
    match &config.supported_video_codecs {
        Some(codecs) => Box::new(CodecAllowList::new(codecs)),
        None => Box::new(PermissiveDecoderSupport),
    }
}

/// Whether a rendition survives the compatibility filter
pub fn is_compatible(
    rendition: &Rendition,
    media_groups: Option<&MediaGroups>,
    decoder: &dyn DecoderSupport,
) -> bool {
    let Some(descriptor) = codec_descriptor(rendition, media_groups) else {
        return true;
    };

    if !descriptor.is_single_audio_video() {
        debug!(
            "Dropping {}: expected one audio and one video codec, found {:?}",
            rendition.resolved_uri, descriptor
        );
        return false;
    }

    match descriptor.video_codec() {
        Some(video) if !decoder.is_supported(video) => {
            debug!(
                "Dropping {}: video codec {} is not supported",
                rendition.resolved_uri, video
            );
            false
        }
        _ => true,
    }
}

/// Filter every source's candidate renditions
///
/// The result holds one list per source, in source order. A source left
/// without candidates fails the whole operation.
pub fn filter_compatible(
    manifests: &[NormalizedManifest],
    decoder: &dyn DecoderSupport,
) -> ConcatResult<Vec<Vec<Rendition>>> {
    manifests
        .iter()
        .enumerate()
        .map(|(index, manifest)| {
            let candidates = manifest.renditions();
            let total = candidates.len();
            let kept: Vec<Rendition> = candidates
                .into_iter()
                .filter(|rendition| is_compatible(rendition, manifest.media_groups(), decoder))
                .collect();

            info!(
                "Source {}: {} of {} rendition(s) passed codec filtering",
                index,
                kept.len(),
                total
            );

            if kept.is_empty() {
                return Err(ConcatError::compatibility(format!(
                    "Did not find a supported playlist for source {index}"
                )));
            }
            Ok(kept)
        })
        .collect()
}
