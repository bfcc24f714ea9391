//! Top-level concatenation pipeline
//!
//! [`ManifestConcatenator::concatenate`] runs every stage in order: fetch the
//! source manifests, normalize them, filter and select one rendition per
//! source, pair demuxed audio, resolve lazily referenced segment lists,
//! combine, and assemble the synthetic master manifest. Any failure aborts
//! the whole run; there is no partial result.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::assembler::construct_master_manifest;
use crate::audio::pair_audio;
use crate::codec::{DecoderSupport, decoder_support_from_config, filter_compatible};
use crate::combiner::combine_playlists;
use crate::config::{ConcatConfig, Config};
use crate::errors::{ConcatError, ConcatResult};
use crate::fetch::FetchCoordinator;
use crate::models::{AUDIO_PLAYLIST_SUFFIX, CombinedManifest, NormalizedManifest, SourceSpec};
use crate::normalizer::normalize;
use crate::resolver::resolve_segments;
use crate::selection::{SelectionCriteria, select_per_source};
use crate::utils::{HttpClient, ReqwestHttpClient, UrlUtils};

/// One concatenation job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcatRequest {
    pub sources: Vec<SourceSpec>,
    /// Overrides the configured target resolution for this request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_vertical_resolution: Option<u32>,
}

impl ConcatRequest {
    pub fn new(sources: Vec<SourceSpec>) -> Self {
        Self {
            sources,
            target_vertical_resolution: None,
        }
    }

    pub fn with_target_vertical_resolution(mut self, target: u32) -> Self {
        self.target_vertical_resolution = Some(target);
        self
    }
}

/// A source that passed validation
#[derive(Debug)]
struct ValidSource<'a> {
    url: &'a str,
    mime_type: &'a str,
}

pub struct ManifestConcatenator {
    coordinator: FetchCoordinator,
    decoder: Box<dyn DecoderSupport>,
    settings: ConcatConfig,
}

impl ManifestConcatenator {
    /// Build a concatenator around an existing HTTP client
    pub fn new(client: Arc<dyn HttpClient>, config: &Config) -> Self {
        Self {
            coordinator: FetchCoordinator::new(client)
                .with_accepted_status_codes(config.http.accepted_status_codes.clone()),
            decoder: decoder_support_from_config(&config.decoder),
            settings: config.concat.clone(),
        }
    }

    /// Build a concatenator that fetches with reqwest
    pub fn from_config(config: &Config) -> ConcatResult<Self> {
        let client = ReqwestHttpClient::from_config(&config.http)?;
        Ok(Self::new(Arc::new(client), config))
    }

    /// Replace the decoder-capability collaborator
    pub fn with_decoder_support(mut self, decoder: Box<dyn DecoderSupport>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Concatenate the request's sources into one synthetic master manifest
    pub async fn concatenate(&self, request: ConcatRequest) -> ConcatResult<CombinedManifest> {
        let sources = validate_sources(&request.sources)?;
        let criteria = SelectionCriteria {
            target_vertical_resolution: request
                .target_vertical_resolution
                .unwrap_or(self.settings.target_vertical_resolution),
            initial_bandwidth: self.settings.initial_bandwidth,
        };

        info!(
            "Concatenating {} source(s) targeting {}p",
            sources.len(),
            criteria.target_vertical_resolution
        );

        let urls: Vec<&str> = sources.iter().map(|source| source.url).collect();
        let bodies = self.coordinator.fetch_all(&urls).await?;

        let manifests = sources
            .iter()
            .map(|source| {
                let body = bodies.get(source.url).ok_or_else(|| {
                    ConcatError::transport(source.url, "no response recorded")
                })?;
                normalize(source.url, body, source.mime_type)
            })
            .collect::<ConcatResult<Vec<NormalizedManifest>>>()?;

        let candidates = filter_compatible(&manifests, self.decoder.as_ref())?;
        let videos = select_per_source(&candidates, &criteria)?;
        let audio = pair_audio(&manifests, &videos)?;

        let source_count = videos.len();
        let mut selected = videos;
        selected.extend(audio);
        resolve_segments(&self.coordinator, &mut selected).await?;
        let audio = selected.split_off(source_count);

        let video_playlist = combine_playlists(&selected, None);
        let audio_playlist =
            (!audio.is_empty()).then(|| combine_playlists(&audio, Some(AUDIO_PLAYLIST_SUFFIX)));

        debug!(
            "Combined {} video segment(s) and {} audio segment(s)",
            video_playlist.segments.len(),
            audio_playlist.as_ref().map_or(0, |p| p.segments.len())
        );

        let manifest = construct_master_manifest(video_playlist, audio_playlist);
        info!(
            "Concatenation complete: {} source(s), demuxed audio: {}",
            source_count,
            manifest.audio_playlist().is_some()
        );
        Ok(manifest)
    }
}

/// Check the request before any network activity
///
/// Every source is checked for a URL before any is checked for a mime type,
/// so the reported message does not depend on source order. Empty strings
/// count as missing.
fn validate_sources(sources: &[SourceSpec]) -> ConcatResult<Vec<ValidSource<'_>>> {
    if sources.is_empty() {
        return Err(ConcatError::validation("No sources provided"));
    }

    let present = |value: &Option<String>| value.as_deref().filter(|v| !v.trim().is_empty()).is_some();

    if !sources.iter().all(|source| present(&source.url)) {
        return Err(ConcatError::validation("All manifests must include a URL"));
    }
    if !sources.iter().all(|source| present(&source.mime_type)) {
        return Err(ConcatError::validation("All manifests must include a mime type"));
    }

    Ok(sources
        .iter()
        .filter_map(|source| {
            let url = source.url.as_deref()?;
            debug!("Source: {}", UrlUtils::obfuscate_credentials(url));
            Some(ValidSource {
                url,
                mime_type: source.mime_type.as_deref()?,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn spec(url: Option<&str>, mime_type: Option<&str>) -> SourceSpec {
        SourceSpec {
            url: url.map(str::to_string),
            mime_type: mime_type.map(str::to_string),
        }
    }

    #[rstest]
    #[case(vec![], "No sources provided")]
    #[case(vec![spec(None, Some("application/x-mpegURL"))], "All manifests must include a URL")]
    #[case(vec![spec(Some(""), Some("application/x-mpegURL"))], "All manifests must include a URL")]
    #[case(vec![spec(Some("http://a/1.m3u8"), None)], "All manifests must include a mime type")]
    #[case(
        vec![spec(Some("http://a/1.m3u8"), None), spec(None, Some("application/x-mpegURL"))],
        "All manifests must include a URL"
    )]
    fn test_validation_messages(#[case] sources: Vec<SourceSpec>, #[case] expected: &str) {
        let err = validate_sources(&sources).unwrap_err();
        assert_eq!(err, ConcatError::validation(expected));
    }

    #[test]
    fn test_valid_sources_keep_order() {
        let sources = vec![
            spec(Some("http://a/1.m3u8"), Some("application/x-mpegURL")),
            spec(Some("http://a/2.mpd"), Some("application/dash+xml")),
        ];
        let valid = validate_sources(&sources).unwrap();
        let urls: Vec<&str> = valid.iter().map(|s| s.url).collect();
        assert_eq!(urls, vec!["http://a/1.m3u8", "http://a/2.mpd"]);
        assert_eq!(valid[1].mime_type, "application/dash+xml");
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: ConcatRequest = serde_json::from_str(
            r#"{"sources":[{"url":"http://a/1.m3u8","mimeType":"application/x-mpegURL"}],"targetVerticalResolution":480}"#,
        )
        .unwrap();
        assert_eq!(request.target_vertical_resolution, Some(480));
        assert_eq!(
            request.sources[0],
            SourceSpec::new("http://a/1.m3u8", "application/x-mpegURL")
        );
    }
}
