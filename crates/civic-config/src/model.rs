// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Civic report-intake bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Civic configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CivicConfig {
    /// Bot identity and logging.
    #[serde(default)]
    pub bot: BotConfig,

    /// Telegram Bot API settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Per-identity lane and shutdown settings.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Reporting platform API settings.
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Report submission rate limiting.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Account link code settings.
    #[serde(default)]
    pub linking: LinkingConfig,

    /// Reverse geocoding settings.
    #[serde(default)]
    pub geocoding: GeocodingConfig,

    /// Service area boundary settings.
    #[serde(default)]
    pub boundary: BoundaryConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Photo download settings.
    #[serde(default)]
    pub attachments: AttachmentConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name used in logs and the health report.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_bot_name() -> String {
    "civic".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required by `civic serve`.
    #[serde(default)]
    pub bot_token: Option<String>,
}

/// Dispatcher lane configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Events buffered per identity before the reader waits.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,

    /// Seconds an identity lane may sit idle before it is retired.
    #[serde(default = "default_lane_idle_secs")]
    pub lane_idle_secs: u64,

    /// Seconds to wait for in-flight lanes on shutdown.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: default_mailbox_capacity(),
            lane_idle_secs: default_lane_idle_secs(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

fn default_mailbox_capacity() -> usize {
    32
}

fn default_lane_idle_secs() -> u64 {
    600
}

fn default_drain_timeout_secs() -> u64 {
    30
}

/// Reporting platform API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    /// Base URL of the platform REST API, without a trailing slash.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Service token sent as a bearer credential. `None` sends no header.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Public web frontend, used to build account and report links.
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_token: None,
            frontend_url: default_frontend_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_api_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_frontend_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Sliding-window rate limit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Reports allowed per identity within one window.
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Tracked identity count above which empty histories are swept.
    #[serde(default = "default_sweep_threshold")]
    pub sweep_threshold: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            sweep_threshold: default_sweep_threshold(),
        }
    }
}

fn default_max_requests() -> usize {
    5
}

fn default_window_secs() -> u64 {
    3600
}

fn default_sweep_threshold() -> usize {
    100
}

/// Link code configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LinkingConfig {
    /// Seconds a freshly issued link code stays redeemable.
    #[serde(default = "default_code_ttl_secs")]
    pub code_ttl_secs: u64,
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: default_code_ttl_secs(),
        }
    }
}

fn default_code_ttl_secs() -> u64 {
    900
}

/// Reverse geocoding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeocodingConfig {
    /// Disable to skip address lookups entirely.
    #[serde(default = "default_geocoding_enabled")]
    pub enabled: bool,

    /// Nominatim-compatible reverse lookup endpoint.
    #[serde(default = "default_geocoding_endpoint")]
    pub endpoint: String,

    /// User-Agent header. Public Nominatim rejects anonymous clients.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Preferred language for address components.
    #[serde(default = "default_language")]
    pub language: String,

    /// Lookup timeout in seconds.
    #[serde(default = "default_geocoding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            enabled: default_geocoding_enabled(),
            endpoint: default_geocoding_endpoint(),
            user_agent: default_user_agent(),
            language: default_language(),
            timeout_secs: default_geocoding_timeout_secs(),
        }
    }
}

fn default_geocoding_enabled() -> bool {
    true
}

fn default_geocoding_endpoint() -> String {
    "https://nominatim.openstreetmap.org/reverse".to_string()
}

fn default_user_agent() -> String {
    concat!("civic-bot/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_language() -> String {
    "id".to_string()
}

fn default_geocoding_timeout_secs() -> u64 {
    10
}

/// Service area boundary configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BoundaryConfig {
    /// GeoJSON file describing the service area. `None` accepts every location.
    #[serde(default)]
    pub geojson_path: Option<String>,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("civic").join("civic.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("civic.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Photo download configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AttachmentConfig {
    /// Per-attempt download timeout in seconds.
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Extra attempts after a failed download.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            download_timeout_secs: default_download_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_download_timeout_secs() -> u64 {
    20
}

fn default_max_retries() -> u32 {
    1
}
