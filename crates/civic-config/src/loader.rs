// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./civic.toml` > `~/.config/civic/civic.toml` > `/etc/civic/civic.toml`
//! with environment variable overrides via the `CIVIC_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CivicConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG: &str = "/etc/civic/civic.toml";

/// Configuration file in the working directory.
pub const LOCAL_CONFIG: &str = "civic.toml";

/// Sections addressable through `CIVIC_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &[
    "bot",
    "telegram",
    "dispatcher",
    "platform",
    "rate_limit",
    "linking",
    "geocoding",
    "boundary",
    "storage",
    "attachments",
];

/// The per-user XDG configuration file, if a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("civic/civic.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/civic/civic.toml` (system-wide)
/// 3. `~/.config/civic/civic.toml` (user XDG config)
/// 4. `./civic.toml` (local directory)
/// 5. `CIVIC_*` environment variables
pub fn load_config() -> Result<CivicConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<CivicConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CivicConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CivicConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CivicConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CivicConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Maps a lowercased, prefix-stripped env key onto a dotted config path.
///
/// Section names themselves contain underscores (`rate_limit`), so the key is
/// matched against the known sections instead of split on `_`:
/// `rate_limit_max_requests` becomes `rate_limit.max_requests` and
/// `telegram_bot_token` becomes `telegram.bot_token`.
pub fn map_env_key(key: &str) -> String {
    // Longest section first so `rate_limit` wins over a hypothetical `rate`.
    let mut sections: Vec<&str> = ENV_SECTIONS.to_vec();
    sections.sort_by_key(|s| std::cmp::Reverse(s.len()));

    for section in sections {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
            .filter(|rest| !rest.is_empty())
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("CIVIC_").map(|key| map_env_key(key.as_str()).into())
}
