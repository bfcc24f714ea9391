//! Concurrent manifest fetching with fail-fast semantics
//!
//! A [`FetchCoordinator`] runs one phase of fetches: every distinct URL is
//! requested concurrently and the phase ends exactly once, either with all
//! bodies or with the first failure observed. Fetches still in flight when a
//! failure arrives are dropped; whatever they would have produced is never
//! seen by the caller.

use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::{ConcatError, ConcatResult};
use crate::utils::HttpClient;
use crate::utils::UrlUtils;
use crate::utils::status_code_matcher::{DEFAULT_ACCEPTED_STATUS_CODES, is_status_acceptable};

/// Bodies of a completed phase, keyed by the requested URL
pub type FetchResults = HashMap<String, String>;

pub struct FetchCoordinator {
    client: Arc<dyn HttpClient>,
    accepted_status_codes: Vec<String>,
}

impl FetchCoordinator {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self {
            client,
            accepted_status_codes: DEFAULT_ACCEPTED_STATUS_CODES
                .iter()
                .map(|code| code.to_string())
                .collect(),
        }
    }

    /// Replace the status patterns a response must match to count as success
    pub fn with_accepted_status_codes(mut self, codes: Vec<String>) -> Self {
        self.accepted_status_codes = codes;
        self
    }

    /// Fetch every URL concurrently
    ///
    /// Duplicate URLs are requested once. Completions are consumed one at a
    /// time from a single stream, so the result map needs no locking. On the
    /// first transport error or unaccepted status the stream is dropped,
    /// cancelling the remaining requests.
    pub async fn fetch_all<S: AsRef<str>>(&self, urls: &[S]) -> ConcatResult<FetchResults> {
        let mut pending: Vec<&str> = Vec::with_capacity(urls.len());
        for url in urls {
            let url = url.as_ref();
            if !pending.contains(&url) {
                pending.push(url);
            }
        }

        debug!(
            "Fetching {} manifest(s) ({} requested)",
            pending.len(),
            urls.len()
        );

        let mut in_flight: FuturesUnordered<_> = pending
            .iter()
            .map(|url| self.fetch_one(url))
            .collect();

        let mut results = FetchResults::with_capacity(pending.len());
        while let Some(outcome) = in_flight.next().await {
            match outcome {
                Ok((url, body)) => {
                    results.insert(url, body);
                }
                Err(e) => {
                    warn!(
                        "Manifest fetch failed, abandoning {} outstanding request(s): {}",
                        in_flight.len(),
                        e
                    );
                    return Err(e);
                }
            }
        }

        Ok(results)
    }

    async fn fetch_one(&self, url: &str) -> ConcatResult<(String, String)> {
        let response = self.client.get(url).await?;

        if !is_status_acceptable(response.status, &self.accepted_status_codes) {
            debug!(
                "Rejecting status {} from {}",
                response.status,
                UrlUtils::obfuscate_credentials(url)
            );
            return Err(ConcatError::status(url, response.status));
        }

        Ok((url.to_string(), response.body))
    }
}
