// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates constraints serde cannot express: parseable URLs, positive
//! windows and limits, non-empty paths, and known log levels.

use reqwest::Url;

use crate::diagnostic::ConfigError;
use crate::model::CivicConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Lower bound for `linking.code_ttl_secs`.
const MIN_CODE_TTL_SECS: u64 = 60;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation instead of stopping at the first.
pub fn validate_config(config: &CivicConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.bot.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::validation(format!(
            "bot.log_level `{}` is not one of {}",
            config.bot.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if let Some(token) = &config.telegram.bot_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::validation(
            "telegram.bot_token must not be empty when set",
        ));
    }

    check_url(&mut errors, "platform.api_base_url", &config.platform.api_base_url);
    check_url(&mut errors, "platform.frontend_url", &config.platform.frontend_url);
    if config.geocoding.enabled {
        check_url(&mut errors, "geocoding.endpoint", &config.geocoding.endpoint);
    }

    let positives = [
        ("platform.request_timeout_secs", config.platform.request_timeout_secs),
        ("rate_limit.window_secs", config.rate_limit.window_secs),
        ("geocoding.timeout_secs", config.geocoding.timeout_secs),
        ("attachments.download_timeout_secs", config.attachments.download_timeout_secs),
        ("dispatcher.lane_idle_secs", config.dispatcher.lane_idle_secs),
    ];
    for (key, value) in positives {
        if value == 0 {
            errors.push(ConfigError::validation(format!("{key} must be greater than 0")));
        }
    }

    if config.rate_limit.max_requests == 0 {
        errors.push(ConfigError::validation(
            "rate_limit.max_requests must be at least 1",
        ));
    }

    if config.rate_limit.sweep_threshold == 0 {
        errors.push(ConfigError::validation(
            "rate_limit.sweep_threshold must be at least 1",
        ));
    }

    if config.linking.code_ttl_secs < MIN_CODE_TTL_SECS {
        errors.push(ConfigError::validation(format!(
            "linking.code_ttl_secs must be at least {MIN_CODE_TTL_SECS}, got {}",
            config.linking.code_ttl_secs
        )));
    }

    if config.dispatcher.mailbox_capacity == 0 {
        errors.push(ConfigError::validation(
            "dispatcher.mailbox_capacity must be at least 1",
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    if let Some(path) = &config.boundary.geojson_path
        && path.trim().is_empty()
    {
        errors.push(ConfigError::validation(
            "boundary.geojson_path must not be empty when set",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ConfigError>, key: &str, value: &str) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ConfigError::validation(format!(
            "{key} must use http or https, got `{}`",
            url.scheme()
        ))),
        Err(e) => errors.push(ConfigError::validation(format!(
            "{key} `{value}` is not a valid URL: {e}"
        ))),
    }
}
