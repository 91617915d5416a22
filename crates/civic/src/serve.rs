// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `civic serve` command implementation.
//!
//! Wires SQLite link-code storage, the platform API client, the service area
//! boundary, the geocoder and the Telegram channel into a [`BotDispatcher`],
//! then serves conversations until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use civic_config::CivicConfig;
use civic_config::model::{BoundaryConfig, GeocodingConfig};
use civic_core::{
    BoundaryCheck, ChannelAdapter, CivicError, HealthStatus, PluginAdapter, ReverseGeocoder,
};
use civic_geo::{
    BoundaryValidator, DisabledGeocoder, GeoJsonFileBoundary, NominatimGeocoder, OpenBoundary,
};
use civic_intake::shutdown;
use civic_intake::{
    BotDispatcher, Destinations, DispatcherParts, GuardChain, IntakeMachine, MemorySessionStore,
    SlidingWindowLimiter,
};
use civic_linking::AccountLinkDirectory;
use civic_platform::PlatformClient;
use civic_storage::{Database, SqliteLinkCodeStore};
use civic_telegram::{TelegramAttachmentFetcher, TelegramChannel};
use tracing::{error, info, warn};

/// Runs the `civic serve` command.
pub async fn run_serve(config: CivicConfig) -> Result<(), CivicError> {
    info!(name = %config.bot.name, "starting civic serve");

    let db = Database::open(&config.storage).await?;
    let codes = Arc::new(SqliteLinkCodeStore::new(&db));

    let platform = Arc::new(PlatformClient::new(&config.platform)?);
    match platform.health_check().await {
        Ok(HealthStatus::Healthy) => {
            info!(url = %config.platform.api_base_url, "platform API reachable")
        }
        Ok(status) => warn!(?status, "platform API not healthy; continuing"),
        Err(e) => warn!(error = %e, "platform health check failed; continuing"),
    }

    let boundary = build_boundary(&config.boundary).await?;
    let geocoder = build_geocoder(&config.geocoding)?;

    let mut channel = TelegramChannel::new(config.telegram.clone()).map_err(|e| {
        error!(error = %e, "failed to initialize Telegram channel");
        eprintln!(
            "error: Telegram bot token required. Set telegram.bot_token or CIVIC_TELEGRAM_BOT_TOKEN"
        );
        e
    })?;
    let fetcher = Arc::new(TelegramAttachmentFetcher::new(
        channel.bot().clone(),
        &config.attachments,
    ));
    channel.connect().await?;
    let channel = Arc::new(channel);

    let link_ttl = Duration::from_secs(config.linking.code_ttl_secs);
    let links = Arc::new(
        AccountLinkDirectory::new(codes, platform.clone(), link_ttl).with_notifier(channel.clone()),
    );
    let limiter = Arc::new(SlidingWindowLimiter::from_config(&config.rate_limit));
    let destinations = Destinations::new(&config.platform.frontend_url);
    let machine = IntakeMachine::new(
        boundary,
        geocoder,
        platform.clone(),
        fetcher,
        links.clone(),
        destinations.clone(),
    );

    let dispatcher = Arc::new(BotDispatcher::new(DispatcherParts {
        channel: channel.clone(),
        machine,
        guard: GuardChain::new(links.clone(), limiter),
        links,
        sessions: Arc::new(MemorySessionStore::new()),
        destinations,
        link_ttl,
    }));

    info!(
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        "dispatcher ready"
    );

    let cancel = shutdown::install_signal_handler();
    dispatcher.run(cancel, &config.dispatcher).await?;

    channel.shutdown().await?;
    info!("civic serve shutdown complete");
    Ok(())
}

/// Builds the boundary check. A configured GeoJSON file is loaded eagerly so
/// a broken file stops startup; without one every location is accepted.
pub async fn build_boundary(
    config: &BoundaryConfig,
) -> Result<Arc<dyn BoundaryCheck>, CivicError> {
    match &config.geojson_path {
        Some(path) => {
            let validator = BoundaryValidator::new(Arc::new(GeoJsonFileBoundary::new(path)));
            validator.preload().await?;
            Ok(Arc::new(validator))
        }
        None => {
            warn!("boundary.geojson_path not set; every location is accepted");
            Ok(Arc::new(OpenBoundary))
        }
    }
}

fn build_geocoder(config: &GeocodingConfig) -> Result<Arc<dyn ReverseGeocoder>, CivicError> {
    if !config.enabled {
        info!("reverse geocoding disabled by configuration");
        return Ok(Arc::new(DisabledGeocoder));
    }
    Ok(Arc::new(NominatimGeocoder::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_core::GeoPoint;

    const BANDUNG: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": { "name": "Bandung" },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[107.5, -7.0], [107.8, -7.0], [107.8, -6.8], [107.5, -6.8], [107.5, -7.0]]]
            }
        }]
    }"#;

    #[tokio::test]
    async fn boundary_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bandung.geojson");
        std::fs::write(&path, BANDUNG).unwrap();

        let config = BoundaryConfig {
            geojson_path: Some(path.to_string_lossy().into_owned()),
        };
        let boundary = build_boundary(&config).await.unwrap();
        assert!(boundary.contains(GeoPoint::new(-6.921, 107.607)).await.unwrap());
        assert!(!boundary.contains(GeoPoint::new(-6.2, 106.816)).await.unwrap());
    }

    #[tokio::test]
    async fn missing_boundary_file_fails_startup() {
        let config = BoundaryConfig {
            geojson_path: Some("/nonexistent/boundary.geojson".into()),
        };
        assert!(build_boundary(&config).await.is_err());
    }

    #[tokio::test]
    async fn no_boundary_accepts_everything() {
        let boundary = build_boundary(&BoundaryConfig::default()).await.unwrap();
        assert!(boundary.contains(GeoPoint::new(51.5, -0.12)).await.unwrap());
    }

    #[tokio::test]
    async fn disabled_geocoding_yields_no_address() {
        let config = GeocodingConfig {
            enabled: false,
            ..GeocodingConfig::default()
        };
        let geocoder = build_geocoder(&config).unwrap();
        assert_eq!(geocoder.lookup(GeoPoint::new(-6.921, 107.607)).await, None);
    }
}
