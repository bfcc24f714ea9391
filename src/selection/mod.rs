//! Rendition selection
//!
//! Picks one rendition per source, steering towards a target vertical
//! resolution and falling back to a bandwidth estimate when resolutions are
//! not declared.

use std::cmp::Ordering;
use tracing::debug;

use crate::errors::{ConcatError, ConcatResult};
use crate::models::Rendition;

/// Selection parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionCriteria {
    pub target_vertical_resolution: u32,
    pub initial_bandwidth: u64,
}

impl SelectionCriteria {
    /// Order `candidate` relative to `current`; `Less` means the candidate is
    /// preferred. Equal distances compare `Equal` so the earlier rendition is kept.
    fn compare(&self, candidate: &Rendition, current: &Rendition) -> Ordering {
        let target = u64::from(self.target_vertical_resolution);

        match (candidate.height(), current.height()) {
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(a), Some(b)) => a.abs_diff(target).cmp(&b.abs_diff(target)),
            (None, None) => {
                let bandwidth = |r: &Rendition| r.attributes.bandwidth.unwrap_or(0);
                bandwidth(candidate)
                    .abs_diff(self.initial_bandwidth)
                    .cmp(&bandwidth(current).abs_diff(self.initial_bandwidth))
            }
        }
    }
}

/// Choose one rendition out of a source's compatible candidates
pub fn select_rendition<'a>(
    candidates: &'a [Rendition],
    criteria: &SelectionCriteria,
) -> Option<&'a Rendition> {
    candidates.iter().reduce(|best, candidate| {
        if criteria.compare(candidate, best) == Ordering::Less {
            candidate
        } else {
            best
        }
    })
}

/// Select one rendition per source, in source order
pub fn select_per_source(
    candidates_per_source: &[Vec<Rendition>],
    criteria: &SelectionCriteria,
) -> ConcatResult<Vec<Rendition>> {
    candidates_per_source
        .iter()
        .enumerate()
        .map(|(index, candidates)| {
            let selected = select_rendition(candidates, criteria).ok_or_else(|| {
                ConcatError::compatibility(format!(
                    "Did not find a supported playlist for source {index}"
                ))
            })?;
            debug!(
                "Source {}: selected {} (resolution {:?}, bandwidth {:?})",
                index,
                selected.resolved_uri,
                selected.attributes.resolution,
                selected.attributes.bandwidth
            );
            Ok(selected.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attributes, Resolution};
    use rstest::rstest;

    fn rendition(name: &str, height: Option<u64>, bandwidth: u64) -> Rendition {
        Rendition::unresolved(
            name,
            format!("http://example.com/{name}"),
            Attributes {
                bandwidth: Some(bandwidth),
                resolution: height.map(|height| Resolution {
                    width: height * 16 / 9,
                    height,
                }),
                ..Default::default()
            },
        )
    }

    const CRITERIA: SelectionCriteria = SelectionCriteria {
        target_vertical_resolution: 720,
        initial_bandwidth: 4_194_304,
    };

    #[test]
    fn test_nearest_resolution_wins() {
        let candidates = vec![
            rendition("1", Some(1), 100),
            rendition("719", Some(719), 100),
            rendition("722", Some(722), 100),
        ];
        let selected = select_rendition(&candidates, &CRITERIA).unwrap();
        assert_eq!(selected.uri, "719");

        // Order of candidates does not matter
        let reversed: Vec<Rendition> = candidates.into_iter().rev().collect();
        assert_eq!(select_rendition(&reversed, &CRITERIA).unwrap().uri, "719");
    }

    #[test]
    fn test_every_source_gets_the_same_pick() {
        let source = vec![
            rendition("1", Some(1), 100),
            rendition("719", Some(719), 100),
            rendition("722", Some(722), 100),
        ];
        let selected = select_per_source(&[source.clone(), source.clone(), source], &CRITERIA).unwrap();
        assert!(selected.iter().all(|r| r.uri == "719"));
    }

    #[test]
    fn test_equal_distance_keeps_first_seen() {
        let candidates = vec![rendition("710", Some(710), 1), rendition("730", Some(730), 1)];
        assert_eq!(select_rendition(&candidates, &CRITERIA).unwrap().uri, "710");
    }

    #[rstest]
    #[case(vec![rendition("none", None, 4_194_304), rendition("tiny", Some(144), 1)], "tiny")]
    #[case(vec![rendition("tiny", Some(144), 1), rendition("none", None, 4_194_304)], "tiny")]
    fn test_declared_resolution_preferred(#[case] candidates: Vec<Rendition>, #[case] expected: &str) {
        assert_eq!(select_rendition(&candidates, &CRITERIA).unwrap().uri, expected);
    }

    #[test]
    fn test_bandwidth_fallback() {
        let candidates = vec![
            rendition("low", None, 800_000),
            rendition("mid", None, 4_000_000),
            rendition("high", None, 8_000_000),
        ];
        assert_eq!(select_rendition(&candidates, &CRITERIA).unwrap().uri, "mid");

        let criteria = SelectionCriteria {
            initial_bandwidth: 10_000_000,
            ..CRITERIA
        };
        assert_eq!(select_rendition(&candidates, &criteria).unwrap().uri, "high");
    }

    #[test]
    fn test_single_candidate_selected() {
        let candidates = vec![rendition("only", None, 1)];
        assert_eq!(select_rendition(&candidates, &CRITERIA).unwrap().uri, "only");
    }

    #[test]
    fn test_empty_source_is_an_error() {
        let err = select_per_source(&[vec![]], &CRITERIA).unwrap_err();
        assert!(matches!(err, ConcatError::Compatibility { .. }));
    }
}
