/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Rendition selection defaults
pub const DEFAULT_TARGET_VERTICAL_RESOLUTION: u32 = 720;
pub const DEFAULT_INITIAL_BANDWIDTH: u64 = 4_194_304; // playback engine's initial estimate, bits/s

// HTTP client defaults
pub const DEFAULT_CONNECT_TIMEOUT: &str = "10s";
pub const DEFAULT_USER_AGENT: &str = concat!("manifest-concat/", env!("CARGO_PKG_VERSION"));

// Environment overrides, e.g. MANIFEST_CONCAT_CONCAT__INITIAL_BANDWIDTH=1000000
pub const ENV_PREFIX: &str = "MANIFEST_CONCAT_";
pub const ENV_SECTION_SEPARATOR: &str = "__";
