// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Civic report-intake bot.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, `CIVIC_*` environment variable overrides, and
//! diagnostic error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use civic_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Rate limit: {}/window", config.rate_limit.max_requests);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::CivicConfig;

/// Loads configuration from the XDG hierarchy and validates it.
///
/// Extraction errors become diagnostics with source spans and "did you mean"
/// suggestions; semantic validation reports every violation at once.
pub fn load_and_validate() -> Result<CivicConfig, Vec<ConfigError>> {
    checked(loader::load_config(), collect_toml_sources)
}

/// Loads configuration from an explicit file and validates it.
pub fn load_and_validate_path(
    path: &std::path::Path,
) -> Result<CivicConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_path(path), || {
        std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default()
    })
}

/// Loads configuration from a TOML string and validates it.
pub fn load_and_validate_str(toml_content: &str) -> Result<CivicConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Validates an extracted config, or maps the extraction error onto the
/// TOML sources it came from. Sources are only read on failure.
fn checked(
    loaded: Result<CivicConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<CivicConfig, Vec<ConfigError>> {
    let config = loaded.map_err(|err| diagnostic::figment_to_config_errors(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Collect TOML source file contents for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut sources = Vec::new();

    if let Ok(content) = std::fs::read_to_string(loader::LOCAL_CONFIG) {
        let path = std::env::current_dir()
            .map(|d| d.join(loader::LOCAL_CONFIG).display().to_string())
            .unwrap_or_else(|_| loader::LOCAL_CONFIG.to_string());
        sources.push((path, content));
    }

    if let Some(path) = loader::user_config_path()
        && let Ok(content) = std::fs::read_to_string(&path)
    {
        sources.push((path.display().to_string(), content));
    }

    if let Ok(content) = std::fs::read_to_string(loader::SYSTEM_CONFIG) {
        sources.push((loader::SYSTEM_CONFIG.to_string(), content));
    }

    sources
}
