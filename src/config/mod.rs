use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::{ConcatError, ConcatResult};
use crate::utils::status_code_matcher::DEFAULT_ACCEPTED_STATUS_CODES;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub concat: ConcatConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
}

/// Rendition selection tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcatConfig {
    /// Vertical resolution the selector steers towards
    #[serde(default = "default_target_vertical_resolution")]
    pub target_vertical_resolution: u32,
    /// Bandwidth estimate (bits/s) used when no rendition declares a resolution
    #[serde(default = "default_initial_bandwidth")]
    pub initial_bandwidth: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout", with = "duration_serde::duration")]
    pub connect_timeout: Duration,
    /// Total request timeout; unset means the request may take as long as it needs
    #[serde(
        default,
        with = "duration_serde::option_duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_timeout: Option<Duration>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Exact codes ("206") or wildcard classes ("2xx")
    #[serde(default = "default_accepted_status_codes")]
    pub accepted_status_codes: Vec<String>,
}

/// Decoder capability settings
///
/// Without an allow-list the capability query counts as unavailable and every
/// video codec is accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecoderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_video_codecs: Option<Vec<String>>,
}

fn default_target_vertical_resolution() -> u32 {
    DEFAULT_TARGET_VERTICAL_RESOLUTION
}

fn default_initial_bandwidth() -> u64 {
    DEFAULT_INITIAL_BANDWIDTH
}

fn default_connect_timeout() -> Duration {
    humantime::parse_duration(DEFAULT_CONNECT_TIMEOUT).unwrap_or(Duration::from_secs(10))
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accepted_status_codes() -> Vec<String> {
    DEFAULT_ACCEPTED_STATUS_CODES
        .iter()
        .map(|code| code.to_string())
        .collect()
}

impl Default for ConcatConfig {
    fn default() -> Self {
        Self {
            target_vertical_resolution: default_target_vertical_resolution(),
            initial_bandwidth: default_initial_bandwidth(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            request_timeout: None,
            user_agent: default_user_agent(),
            accepted_status_codes: default_accepted_status_codes(),
        }
    }
}

impl Config {
    /// Load configuration: built-in defaults, then the TOML file when it
    /// exists, then `MANIFEST_CONCAT_*` environment variables.
    pub fn load_from_file(config_file: &str) -> ConcatResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if Path::new(config_file).exists() {
            info!("Loading configuration from: {}", config_file);
            figment = figment.merge(Toml::file(config_file));
        } else {
            debug!("Config file {} not found, using defaults", config_file);
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).split(ENV_SECTION_SEPARATOR))
            .extract()
            .map_err(|e| ConcatError::configuration(e.to_string()))
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> ConcatResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConcatError::configuration(e.to_string()))
    }
}
