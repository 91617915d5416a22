// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reverse geocoding against a Nominatim-compatible endpoint.

use std::time::Duration;

use async_trait::async_trait;
use civic_config::model::GeocodingConfig;
use civic_core::{CivicError, GeoPoint, ReverseGeocoder};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<AddressParts>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AddressParts {
    road: Option<String>,
    house_number: Option<String>,
    neighbourhood: Option<String>,
    suburb: Option<String>,
    village: Option<String>,
    city_district: Option<String>,
    city: Option<String>,
    town: Option<String>,
    county: Option<String>,
}

/// Best-effort coordinate to address lookup.
///
/// Never retries and never fails: network errors, non-2xx responses,
/// malformed payloads and empty results all yield `None`.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    endpoint: String,
    language: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodingConfig) -> Result<Self, CivicError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CivicError::Upstream {
                message: format!("failed to build geocoding client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            language: config.language.clone(),
        })
    }

    async fn request(&self, point: GeoPoint) -> Result<ReverseResponse, reqwest::Error> {
        let lat = point.latitude.to_string();
        let lon = point.longitude.to_string();
        self.client
            .get(&self.endpoint)
            .query(&[
                ("format", "jsonv2"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("zoom", "18"),
                ("addressdetails", "1"),
                ("accept-language", self.language.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn lookup(&self, point: GeoPoint) -> Option<String> {
        let response = match self.request(point).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "reverse geocoding failed");
                return None;
            }
        };
        if let Some(error) = &response.error {
            debug!(%error, "reverse geocoding returned no result");
            return None;
        }
        short_address(&response)
    }
}

/// Geocoder used when lookups are disabled. Every location is shown by its
/// coordinates.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledGeocoder;

#[async_trait]
impl ReverseGeocoder for DisabledGeocoder {
    async fn lookup(&self, _point: GeoPoint) -> Option<String> {
        None
    }
}

/// Builds "road number, locality, city", falling back to the first three
/// components of `display_name`.
fn short_address(response: &ReverseResponse) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    if let Some(addr) = &response.address {
        if let Some(road) = non_empty(&addr.road) {
            match non_empty(&addr.house_number) {
                Some(number) => parts.push(format!("{road} {number}")),
                None => parts.push(road.to_string()),
            }
        }
        let locality = [&addr.suburb, &addr.village, &addr.neighbourhood, &addr.city_district]
            .into_iter()
            .find_map(non_empty);
        let city = [&addr.city, &addr.town, &addr.county]
            .into_iter()
            .find_map(non_empty);
        parts.extend(locality.into_iter().chain(city).map(str::to_string));
    }

    if parts.is_empty()
        && let Some(display) = non_empty(&response.display_name)
    {
        parts = display
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .take(3)
            .map(str::to_string)
            .collect();
    }

    parts.dedup();
    (!parts.is_empty()).then(|| parts.join(", "))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn geocoder(server: &MockServer) -> NominatimGeocoder {
        let config = GeocodingConfig {
            endpoint: format!("{}/reverse", server.uri()),
            user_agent: "civic-test/1.0".into(),
            timeout_secs: 2,
            ..GeocodingConfig::default()
        };
        NominatimGeocoder::new(&config).unwrap()
    }

    fn parse(body: serde_json::Value) -> ReverseResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn short_address_prefers_structured_parts() {
        let response = parse(serde_json::json!({
            "address": {
                "road": "Jalan Merdeka",
                "house_number": "12",
                "suburb": "Gambir",
                "city": "Jakarta Pusat"
            },
            "display_name": "12, Jalan Merdeka, Gambir, Jakarta Pusat, Indonesia"
        }));
        assert_eq!(
            short_address(&response).as_deref(),
            Some("Jalan Merdeka 12, Gambir, Jakarta Pusat")
        );
    }

    #[test]
    fn short_address_falls_back_to_display_name() {
        let response = parse(serde_json::json!({
            "address": {},
            "display_name": "Monas, Gambir, Jakarta Pusat, DKI Jakarta, Indonesia"
        }));
        assert_eq!(
            short_address(&response).as_deref(),
            Some("Monas, Gambir, Jakarta Pusat")
        );
    }

    #[test]
    fn empty_response_has_no_address() {
        assert_eq!(short_address(&parse(serde_json::json!({}))), None);
    }

    #[tokio::test]
    async fn lookup_sends_coordinates_and_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("format", "jsonv2"))
            .and(query_param("lat", "-6.2"))
            .and(query_param("lon", "106.8"))
            .and(query_param("accept-language", "id"))
            .and(header("user-agent", "civic-test/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "address": {"road": "Jalan Thamrin", "city": "Jakarta"}
            })))
            .mount(&server)
            .await;

        let address = geocoder(&server).lookup(GeoPoint::new(-6.2, 106.8)).await;
        assert_eq!(address.as_deref(), Some("Jalan Thamrin, Jakarta"));
    }

    #[tokio::test]
    async fn upstream_error_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(geocoder(&server).lookup(GeoPoint::new(0.0, 0.0)).await, None);
    }

    #[tokio::test]
    async fn nominatim_error_body_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"error": "Unable to geocode"})),
            )
            .mount(&server)
            .await;

        assert_eq!(geocoder(&server).lookup(GeoPoint::new(0.0, 0.0)).await, None);
    }

    #[tokio::test]
    async fn malformed_payload_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        assert_eq!(geocoder(&server).lookup(GeoPoint::new(0.0, 0.0)).await, None);
    }

    #[tokio::test]
    async fn disabled_geocoder_never_resolves() {
        assert_eq!(DisabledGeocoder.lookup(GeoPoint::new(-6.9, 107.6)).await, None);
    }
}
