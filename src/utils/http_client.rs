use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::HttpConfig;
use crate::errors::{ConcatError, ConcatResult};
use crate::utils::url::UrlUtils;

/// Status code and body of a completed request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new<B: Into<String>>(status: u16, body: B) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// HTTP client collaborator used for every manifest fetch
///
/// Implementations report any response they receive, whatever its status;
/// deciding which statuses count as success is the caller's job. Only
/// failures that produced no response at all are errors here.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str) -> ConcatResult<HttpResponse>;
}

/// Default implementation of HttpClient using reqwest
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create new HTTP client with default settings
    pub fn new() -> ConcatResult<Self> {
        Self::from_config(&HttpConfig::default())
    }

    /// Create new HTTP client from configuration. Only a connection timeout is
    /// applied unless a total request timeout is configured.
    pub fn from_config(config: &HttpConfig) -> ConcatResult<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone());

        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| {
            ConcatError::configuration(format!("Failed to create HTTP client: {e}"))
        })?;

        Ok(Self { client })
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> ConcatResult<HttpResponse> {
        let safe_url = UrlUtils::obfuscate_credentials(url);
        debug!("Fetching manifest from: {}", safe_url);

        let response = self.client.get(url).send().await.map_err(|e| {
            // reqwest embeds the URL in its message
            let obfuscated_msg = UrlUtils::obfuscate_credentials(&e.to_string());
            ConcatError::transport(url, obfuscated_msg)
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ConcatError::transport(url, format!("Failed to read response: {e}")))?;

        debug!(
            "Fetched {} characters from {} (status {})",
            body.len(),
            safe_url,
            status
        );
        Ok(HttpResponse { status, body })
    }
}
