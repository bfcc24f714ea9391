//! DASH MPD adapter
//!
//! Deserializes the subset of a static MPD needed to enumerate segments and
//! expands every representation into a fully resolved segment list. Video
//! representations become master renditions; audio adaptation sets become
//! tracks of a single AUDIO media group, each carrying its representations
//! as nested renditions.

use quick_xml::de::from_str;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;
use tracing::debug;

use crate::codec::{CodecKind, classify};
use crate::errors::{ConcatError, ConcatResult};
use crate::models::{
    Attributes, AudioGroup, AudioTrack, Dialect, InitSegment, MasterManifest, MediaGroups,
    Rendition, Resolution, Segment,
};
use crate::utils::UrlUtils;

/// Group id every video rendition of an MPD references
const AUDIO_GROUP_ID: &str = "audio";
/// Track label for audio adaptation sets without `@lang`
const DEFAULT_AUDIO_LABEL: &str = "main";
const MAX_ERROR_LEN: usize = 200;
/// Absorbs rounding when a period is an exact multiple of the segment duration
const DURATION_EPSILON: f64 = 1e-6;
/// Upper bound on segments expanded from one representation's template
pub const MAX_TEMPLATE_SEGMENTS: u64 = 100_000;

const TEMPLATE_IDENTIFIER_PATTERN: &str = r"\$(RepresentationID|Number|Time|Bandwidth)?(?:%0(\d+)d)?\$";
const ISO_DURATION_PATTERN: &str = r"^P(?:(\d+(?:\.\d+)?)Y)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)W)?(?:(\d+(?:\.\d+)?)D)?(?:T(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?$";

#[derive(Debug, Deserialize)]
struct Mpd {
    #[serde(rename = "@type")]
    presentation_type: Option<String>,
    #[serde(rename = "@mediaPresentationDuration")]
    media_presentation_duration: Option<String>,
    #[serde(rename = "BaseURL", default)]
    base_urls: Vec<BaseUrl>,
    #[serde(rename = "Period", default)]
    periods: Vec<Period>,
}

#[derive(Debug, Deserialize)]
struct BaseUrl {
    #[serde(rename = "$text", default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct Period {
    #[serde(rename = "@start")]
    start: Option<String>,
    #[serde(rename = "@duration")]
    duration: Option<String>,
    #[serde(rename = "BaseURL", default)]
    base_urls: Vec<BaseUrl>,
    #[serde(rename = "AdaptationSet", default)]
    adaptation_sets: Vec<AdaptationSet>,
}

#[derive(Debug, Default, Deserialize)]
struct AdaptationSet {
    #[serde(rename = "@contentType")]
    content_type: Option<String>,
    #[serde(rename = "@mimeType")]
    mime_type: Option<String>,
    #[serde(rename = "@lang")]
    lang: Option<String>,
    #[serde(rename = "@codecs")]
    codecs: Option<String>,
    #[serde(rename = "@width")]
    width: Option<u64>,
    #[serde(rename = "@height")]
    height: Option<u64>,
    #[serde(rename = "BaseURL", default)]
    base_urls: Vec<BaseUrl>,
    #[serde(rename = "SegmentTemplate")]
    segment_template: Option<SegmentTemplate>,
    #[serde(rename = "SegmentList")]
    segment_list: Option<SegmentList>,
    #[serde(rename = "Representation", default)]
    representations: Vec<Representation>,
}

#[derive(Debug, Default, Deserialize)]
struct Representation {
    #[serde(rename = "@id", default)]
    id: String,
    #[serde(rename = "@bandwidth")]
    bandwidth: Option<u64>,
    #[serde(rename = "@width")]
    width: Option<u64>,
    #[serde(rename = "@height")]
    height: Option<u64>,
    #[serde(rename = "@codecs")]
    codecs: Option<String>,
    #[serde(rename = "@mimeType")]
    mime_type: Option<String>,
    #[serde(rename = "BaseURL", default)]
    base_urls: Vec<BaseUrl>,
    #[serde(rename = "SegmentTemplate")]
    segment_template: Option<SegmentTemplate>,
    #[serde(rename = "SegmentList")]
    segment_list: Option<SegmentList>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SegmentTemplate {
    #[serde(rename = "@media")]
    media: Option<String>,
    #[serde(rename = "@initialization")]
    initialization: Option<String>,
    #[serde(rename = "@startNumber")]
    start_number: Option<u64>,
    #[serde(rename = "@timescale")]
    timescale: Option<u64>,
    #[serde(rename = "@duration")]
    duration: Option<u64>,
    #[serde(rename = "SegmentTimeline")]
    segment_timeline: Option<SegmentTimeline>,
}

impl SegmentTemplate {
    /// Fill attributes missing here from the enclosing adaptation set's template
    fn inherit(&self, parent: Option<&SegmentTemplate>) -> SegmentTemplate {
        let Some(parent) = parent else {
            return self.clone();
        };

        SegmentTemplate {
            media: self.media.clone().or_else(|| parent.media.clone()),
            initialization: self
                .initialization
                .clone()
                .or_else(|| parent.initialization.clone()),
            start_number: self.start_number.or(parent.start_number),
            timescale: self.timescale.or(parent.timescale),
            duration: self.duration.or(parent.duration),
            segment_timeline: self
                .segment_timeline
                .clone()
                .or_else(|| parent.segment_timeline.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SegmentTimeline {
    #[serde(rename = "S", default)]
    entries: Vec<TimelineEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct TimelineEntry {
    #[serde(rename = "@t")]
    t: Option<u64>,
    #[serde(rename = "@d")]
    d: u64,
    #[serde(rename = "@r")]
    r: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SegmentList {
    #[serde(rename = "@timescale")]
    timescale: Option<u64>,
    #[serde(rename = "@duration")]
    duration: Option<u64>,
    #[serde(rename = "Initialization")]
    initialization: Option<SourceUrl>,
    #[serde(rename = "SegmentURL", default)]
    segment_urls: Vec<SegmentUrl>,
}

#[derive(Debug, Deserialize)]
struct SourceUrl {
    #[serde(rename = "@sourceURL")]
    source_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SegmentUrl {
    #[serde(rename = "@media", default)]
    media: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Video,
    Audio,
}

/// Chain of `BaseURL` prefixes, outermost first, applied to the MPD's own URL
struct BaseChain<'a> {
    document_url: &'a str,
    prefixes: Vec<&'a str>,
}

impl BaseChain<'_> {
    fn resolve(&self, reference: &str) -> String {
        UrlUtils::resolve_chain(self.document_url, self.prefixes.iter().copied(), reference)
    }

    /// The innermost base itself
    fn base(&self) -> String {
        match self.prefixes.split_last() {
            Some((last, outer)) => {
                UrlUtils::resolve_chain(self.document_url, outer.iter().copied(), last)
            }
            None => self.document_url.to_string(),
        }
    }
}

/// Renditions keyed by representation id, kept in first-seen order
#[derive(Default)]
struct RenditionSet {
    renditions: Vec<Rendition>,
    by_id: HashMap<String, usize>,
}

impl RenditionSet {
    /// Append one period's segments, marking the period boundary
    fn append(
        &mut self,
        id: &str,
        resolved_uri: String,
        attributes: Attributes,
        mut segments: Vec<Segment>,
    ) {
        match self.by_id.get(id) {
            Some(&index) => {
                let existing = self.renditions[index].segments.get_or_insert_with(Vec::new);
                if !existing.is_empty()
                    && let Some(first) = segments.first_mut()
                {
                    first.discontinuity = true;
                }
                existing.extend(segments);
            }
            None => {
                self.by_id.insert(id.to_string(), self.renditions.len());
                self.renditions.push(Rendition {
                    uri: id.to_string(),
                    resolved_uri,
                    attributes,
                    segments: Some(segments),
                    target_duration: None,
                });
            }
        }
    }

    fn into_renditions(self) -> Vec<Rendition> {
        self.renditions
            .into_iter()
            .map(|mut rendition| {
                rendition.target_duration = rendition
                    .segments
                    .as_ref()
                    .map(|segments| segments.iter().map(|s| s.duration).fold(0.0, f64::max));
                rendition
            })
            .collect()
    }
}

struct AudioSet {
    label: String,
    language: Option<String>,
    renditions: RenditionSet,
}

/// Expands `$Identifier$` placeholders in segment templates
struct TemplateExpander {
    identifier: Regex,
}

impl TemplateExpander {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            identifier: Regex::new(TEMPLATE_IDENTIFIER_PATTERN)?,
        })
    }

    fn expand(
        &self,
        template: &str,
        representation: &Representation,
        number: Option<u64>,
        time: Option<u64>,
    ) -> String {
        self.identifier
            .replace_all(template, |caps: &Captures| {
                let width = caps
                    .get(2)
                    .and_then(|w| w.as_str().parse::<usize>().ok())
                    .unwrap_or(0);
                let value = match caps.get(1).map(|m| m.as_str()) {
                    None => return "$".to_string(),
                    Some("RepresentationID") => return representation.id.clone(),
                    Some("Number") => number,
                    Some("Time") => time,
                    Some("Bandwidth") => representation.bandwidth,
                    Some(_) => None,
                };
                match value {
                    Some(value) => format!("{value:0width$}"),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn template_segments(
        &self,
        template: &SegmentTemplate,
        representation: &Representation,
        chain: &BaseChain<'_>,
        period_duration: Option<f64>,
        timeline: u64,
    ) -> Result<Vec<Segment>, String> {
        let media = template
            .media
            .as_deref()
            .ok_or_else(|| format!("SegmentTemplate of {} has no @media", representation.id))?;
        let timescale = template.timescale.unwrap_or(1).max(1);
        let start_number = template.start_number.unwrap_or(1);

        // (number, time, duration in seconds)
        let mut entries: Vec<(u64, u64, f64)> = Vec::new();
        if let Some(segment_timeline) = &template.segment_timeline {
            let period_end = period_duration.map(|d| d * timescale as f64);
            let mut time = 0;
            let mut number = start_number;
            for entry in &segment_timeline.entries {
                if let Some(t) = entry.t {
                    time = t;
                }
                let repeats = match entry.r.unwrap_or(0) {
                    r if r >= 0 => r as u64,
                    // Negative repeat runs until the end of the period
                    _ => match period_end {
                        Some(end) if entry.d > 0 => {
                            let remaining = (end - time as f64) / entry.d as f64;
                            (remaining - DURATION_EPSILON).ceil().max(1.0) as u64 - 1
                        }
                        _ => 0,
                    },
                };
                if entries.len() as u64 + repeats >= MAX_TEMPLATE_SEGMENTS {
                    return Err(too_many_segments(representation));
                }
                for _ in 0..=repeats {
                    entries.push((number, time, entry.d as f64 / timescale as f64));
                    number += 1;
                    time += entry.d;
                }
            }
        } else if let Some(duration) = template.duration.filter(|d| *d > 0) {
            let period_duration = period_duration.ok_or_else(|| {
                format!(
                    "cannot count segments of {} without a period duration",
                    representation.id
                )
            })?;
            let segment_duration = duration as f64 / timescale as f64;
            let count = (period_duration / segment_duration - DURATION_EPSILON)
                .ceil()
                .max(0.0) as u64;
            if count > MAX_TEMPLATE_SEGMENTS {
                return Err(too_many_segments(representation));
            }
            for index in 0..count {
                let remaining = period_duration - index as f64 * segment_duration;
                entries.push((
                    start_number + index,
                    index * duration,
                    segment_duration.min(remaining),
                ));
            }
        } else {
            return Err(format!(
                "SegmentTemplate of {} needs a SegmentTimeline or @duration",
                representation.id
            ));
        }

        let map = template.initialization.as_deref().map(|init| {
            let uri = self.expand(init, representation, None, None);
            InitSegment {
                resolved_uri: chain.resolve(&uri),
                uri,
            }
        });

        Ok(entries
            .into_iter()
            .map(|(number, time, duration)| {
                let uri = self.expand(media, representation, Some(number), Some(time));
                Segment {
                    resolved_uri: chain.resolve(&uri),
                    uri,
                    duration,
                    discontinuity: false,
                    timeline,
                    map: map.clone(),
                }
            })
            .collect())
    }
}

fn list_segments(
    list: &SegmentList,
    chain: &BaseChain<'_>,
    period_duration: Option<f64>,
    timeline: u64,
) -> Vec<Segment> {
    let timescale = list.timescale.unwrap_or(1).max(1) as f64;
    let duration = match list.duration {
        Some(duration) => duration as f64 / timescale,
        None => period_duration
            .map(|p| p / list.segment_urls.len().max(1) as f64)
            .unwrap_or(0.0),
    };
    let map = list
        .initialization
        .as_ref()
        .and_then(|init| init.source_url.clone())
        .map(|uri| InitSegment {
            resolved_uri: chain.resolve(&uri),
            uri,
        });

    list.segment_urls
        .iter()
        .map(|segment_url| Segment {
            uri: segment_url.media.clone(),
            resolved_uri: chain.resolve(&segment_url.media),
            duration,
            discontinuity: false,
            timeline,
            map: map.clone(),
        })
        .collect()
}

/// Parse an MPD fetched from `base_url` into a master manifest
pub fn parse(manifest_text: &str, base_url: &str) -> ConcatResult<MasterManifest> {
    let parse_error = |message: String| ConcatError::parse(Dialect::Dash, base_url, message);

    let mpd: Mpd = from_str(manifest_text)
        .map_err(|e| parse_error(e.to_string().chars().take(MAX_ERROR_LEN).collect()))?;

    if mpd.presentation_type.as_deref() == Some("dynamic") {
        return Err(parse_error("dynamic MPDs are not supported".to_string()));
    }
    if mpd.periods.is_empty() {
        return Err(parse_error("MPD contains no Period".to_string()));
    }

    let expander = TemplateExpander::new().map_err(|e| parse_error(e.to_string()))?;
    let total_duration = mpd
        .media_presentation_duration
        .as_deref()
        .and_then(parse_iso8601_duration);
    let durations = period_durations(&mpd.periods, total_duration);

    let mut video = RenditionSet::default();
    let mut audio_sets: Vec<AudioSet> = Vec::new();

    for (period_index, (period, period_duration)) in mpd.periods.iter().zip(durations).enumerate()
    {
        let timeline = period_index as u64;
        for set in &period.adaptation_sets {
            for representation in &set.representations {
                let Some(kind) = media_kind(set, representation) else {
                    debug!("Skipping non audio/video representation {}", representation.id);
                    continue;
                };

                let chain = BaseChain {
                    document_url: base_url,
                    prefixes: [
                        mpd.base_urls.first(),
                        period.base_urls.first(),
                        set.base_urls.first(),
                        representation.base_urls.first(),
                    ]
                    .into_iter()
                    .flatten()
                    .map(|base| base.url.trim())
                    .collect(),
                };

                let segments = representation_segments(
                    &expander,
                    set,
                    representation,
                    &chain,
                    period_duration,
                    timeline,
                )
                .map_err(parse_error)?;
                let attributes = representation_attributes(set, representation);

                match kind {
                    MediaKind::Video => {
                        video.append(&representation.id, chain.base(), attributes, segments)
                    }
                    MediaKind::Audio => {
                        let label = set
                            .lang
                            .clone()
                            .unwrap_or_else(|| DEFAULT_AUDIO_LABEL.to_string());
                        let index = match audio_sets.iter().position(|s| s.label == label) {
                            Some(index) => index,
                            None => {
                                audio_sets.push(AudioSet {
                                    label,
                                    language: set.lang.clone(),
                                    renditions: RenditionSet::default(),
                                });
                                audio_sets.len() - 1
                            }
                        };
                        audio_sets[index].renditions.append(
                            &representation.id,
                            chain.base(),
                            attributes,
                            segments,
                        );
                    }
                }
            }
        }
    }

    let mut playlists = video.into_renditions();
    let mut audio = BTreeMap::new();
    if !audio_sets.is_empty() {
        for playlist in &mut playlists {
            playlist.attributes.audio = Some(AUDIO_GROUP_ID.to_string());
        }

        let tracks = audio_sets
            .into_iter()
            .enumerate()
            .map(|(index, set)| AudioTrack {
                name: set.label,
                language: set.language,
                default: index == 0,
                autoselect: true,
                uri: None,
                resolved_uri: None,
                playlists: Some(set.renditions.into_renditions()),
            })
            .collect();
        audio.insert(AUDIO_GROUP_ID.to_string(), AudioGroup { tracks });
    }

    debug!(
        "Parsed MPD with {} period(s), {} video rendition(s) and {} audio track(s)",
        mpd.periods.len(),
        playlists.len(),
        audio
            .get(AUDIO_GROUP_ID)
            .map(|group: &AudioGroup| group.tracks.len())
            .unwrap_or(0)
    );

    Ok(MasterManifest {
        playlists,
        media_groups: MediaGroups { audio },
    })
}

fn too_many_segments(representation: &Representation) -> String {
    format!(
        "SegmentTemplate of {} expands to more than {} segments",
        representation.id, MAX_TEMPLATE_SEGMENTS
    )
}

fn representation_segments(
    expander: &TemplateExpander,
    set: &AdaptationSet,
    representation: &Representation,
    chain: &BaseChain<'_>,
    period_duration: Option<f64>,
    timeline: u64,
) -> Result<Vec<Segment>, String> {
    let template = match (&representation.segment_template, &set.segment_template) {
        (Some(own), parent) => Some(own.inherit(parent.as_ref())),
        (None, Some(parent)) => Some(parent.clone()),
        (None, None) => None,
    };

    if let Some(template) = template {
        return expander.template_segments(
            &template,
            representation,
            chain,
            period_duration,
            timeline,
        );
    }

    if let Some(list) = representation
        .segment_list
        .as_ref()
        .or(set.segment_list.as_ref())
    {
        return Ok(list_segments(list, chain, period_duration, timeline));
    }

    // SegmentBase or bare BaseURL: the whole representation is one segment
    Ok(vec![Segment {
        uri: representation
            .base_urls
            .last()
            .map(|base| base.url.trim().to_string())
            .unwrap_or_default(),
        resolved_uri: chain.base(),
        duration: period_duration.unwrap_or(0.0),
        discontinuity: false,
        timeline,
        map: None,
    }])
}

fn representation_attributes(set: &AdaptationSet, representation: &Representation) -> Attributes {
    let width = representation.width.or(set.width);
    let height = representation.height.or(set.height);

    Attributes {
        bandwidth: representation.bandwidth,
        resolution: width
            .zip(height)
            .map(|(width, height)| Resolution { width, height }),
        codecs: representation.codecs.clone().or_else(|| set.codecs.clone()),
        audio: None,
    }
}

fn media_kind(set: &AdaptationSet, representation: &Representation) -> Option<MediaKind> {
    let hints = [
        set.content_type.as_deref(),
        representation
            .mime_type
            .as_deref()
            .or(set.mime_type.as_deref()),
    ];
    for hint in hints.into_iter().flatten() {
        match hint.split('/').next() {
            Some("video") => return Some(MediaKind::Video),
            Some("audio") => return Some(MediaKind::Audio),
            _ => {}
        }
    }

    let codecs = representation.codecs.as_deref().or(set.codecs.as_deref())?;
    match classify(codecs.split(',').next().unwrap_or_default()) {
        CodecKind::Video => Some(MediaKind::Video),
        CodecKind::Audio => Some(MediaKind::Audio),
        CodecKind::Text | CodecKind::Unknown => None,
    }
}

/// Duration of every period in seconds, from `@duration`, the next period's
/// `@start`, or the presentation duration for the last period
fn period_durations(periods: &[Period], total_duration: Option<f64>) -> Vec<Option<f64>> {
    let mut durations = Vec::with_capacity(periods.len());
    let mut next_start = Some(0.0);

    for (index, period) in periods.iter().enumerate() {
        let start = period
            .start
            .as_deref()
            .and_then(parse_iso8601_duration)
            .or(next_start);
        let duration = period
            .duration
            .as_deref()
            .and_then(parse_iso8601_duration)
            .or_else(|| {
                let end = match periods.get(index + 1) {
                    Some(next) => next.start.as_deref().and_then(parse_iso8601_duration),
                    None => total_duration,
                };
                Some(end? - start?)
            });

        next_start = start.zip(duration).map(|(start, duration)| start + duration);
        durations.push(duration);
    }

    durations
}

/// Parse an ISO 8601 duration (`PT1M30.5S`) into seconds
///
/// Years and months are taken as 365 and 30 days.
pub fn parse_iso8601_duration(value: &str) -> Option<f64> {
    const UNIT_SECONDS: [f64; 7] = [
        365.0 * 86_400.0,
        30.0 * 86_400.0,
        7.0 * 86_400.0,
        86_400.0,
        3_600.0,
        60.0,
        1.0,
    ];

    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(ISO_DURATION_PATTERN).ok())
        .as_ref()?;
    let caps = pattern.captures(value.trim())?;

    Some(
        UNIT_SECONDS
            .iter()
            .enumerate()
            .map(|(index, unit)| {
                caps.get(index + 1)
                    .and_then(|m| m.as_str().parse::<f64>().ok())
                    .unwrap_or(0.0)
                    * unit
            })
            .sum(),
    )
}
