// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the platform API.
//!
//! Requests are bounded by `platform.request_timeout_secs` and never retried:
//! report creation is not idempotent, and lookups are cheap for the user to
//! repeat. Error bodies carry a `message` that is surfaced verbatim.

use std::time::Duration;

use async_trait::async_trait;
use civic_config::model::PlatformConfig;
use civic_core::{
    AccountDirectory, Category, CivicError, ExternalId, HealthStatus, LinkedUser, NewReport,
    PluginAdapter, Report, ReportsService,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::types::{
    BindRequest, CategoryDto, Envelope, ErrorBody, LinkedUserDto, ReportDto, TelegramBindingDto,
};

/// Client for the municipal platform's REST API.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl PlatformClient {
    pub fn new(config: &PlatformConfig) -> Result<Self, CivicError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| CivicError::Config(format!("invalid platform.api_token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let timeout = Duration::from_secs(config.request_timeout_secs);
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| CivicError::Upstream {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn transport_error(&self, e: reqwest::Error) -> CivicError {
        if e.is_timeout() {
            CivicError::Timeout {
                duration: self.timeout,
            }
        } else {
            CivicError::Upstream {
                message: format!("platform request failed: {e}"),
                source: Some(Box::new(e)),
            }
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, CivicError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        debug!(status = %response.status(), url = %response.url(), "platform response");
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T, CivicError> {
        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }
        let envelope: Envelope<T> = response.json().await.map_err(|e| CivicError::Upstream {
            message: format!("malformed platform response: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(envelope.into_inner())
    }
}

/// Builds an error from a non-2xx response, preferring the body's `message`.
async fn upstream_error(response: Response) -> CivicError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.message.joined())
        .ok()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("platform returned {status}"));
    CivicError::Upstream {
        message,
        source: None,
    }
}

fn report_form(report: NewReport) -> Result<Form, CivicError> {
    let mut form = Form::new()
        .text("title", report.title)
        .text("description", report.description)
        .text("latitude", report.location.latitude.to_string())
        .text("longitude", report.location.longitude.to_string())
        .text("categoryId", report.category_id)
        .text("isAnonymous", report.is_anonymous.to_string())
        .text("userId", report.user_id);
    if let Some(address) = report.address {
        form = form.text("address", address);
    }
    for image in report.images {
        let part = Part::bytes(image.bytes)
            .file_name(image.filename)
            .mime_str(&image.content_type)
            .map_err(|e| CivicError::Attachment {
                message: format!("invalid content type {}: {e}", image.content_type),
                source: Some(Box::new(e)),
            })?;
        form = form.part("images", part);
    }
    Ok(form)
}

#[async_trait]
impl ReportsService for PlatformClient {
    async fn create_report(&self, report: NewReport) -> Result<Report, CivicError> {
        let images = report.images.len();
        let form = report_form(report)?;
        let response = self
            .send(self.client.post(self.url("/reports")).multipart(form))
            .await?;
        let dto: ReportDto = self.decode(response).await?;
        info!(report_id = %dto.id, status = %dto.status, images, "report created");
        Ok(Report {
            id: dto.id,
            status: dto.status,
        })
    }

    async fn list_categories(&self) -> Result<Vec<Category>, CivicError> {
        let response = self.send(self.client.get(self.url("/categories"))).await?;
        let categories: Vec<CategoryDto> = self.decode(response).await?;
        Ok(categories
            .into_iter()
            .map(|c| Category {
                id: c.id,
                name: c.name,
            })
            .collect())
    }
}

#[async_trait]
impl AccountDirectory for PlatformClient {
    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<LinkedUser>, CivicError> {
        let url = self.url(&format!("/telegram/users/{external_id}"));
        let response = self.send(self.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let dto: LinkedUserDto = self.decode(response).await?;
        Ok(Some(LinkedUser {
            user_id: dto.user_id,
            email_verified: dto.is_email_verified,
        }))
    }

    async fn external_id_of(&self, user_id: &str) -> Result<Option<ExternalId>, CivicError> {
        let url = self.url(&format!("/users/{user_id}/telegram"));
        let response = self.send(self.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let dto: TelegramBindingDto = self.decode(response).await?;
        Ok(dto.telegram_id.map(ExternalId))
    }

    async fn bind(
        &self,
        user_id: &str,
        external_id: &ExternalId,
        external_username: Option<&str>,
    ) -> Result<(), CivicError> {
        let url = self.url(&format!("/users/{user_id}/telegram"));
        let body = BindRequest {
            telegram_id: external_id.as_str(),
            telegram_username: external_username,
        };
        let response = self.send(self.client.post(url).json(&body)).await?;
        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for PlatformClient {
    fn name(&self) -> &str {
        "platform"
    }

    async fn health_check(&self) -> Result<HealthStatus, CivicError> {
        Ok(match self.list_categories().await {
            Ok(categories) if categories.is_empty() => {
                HealthStatus::Degraded("platform has no report categories".into())
            }
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), CivicError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use civic_core::{Attachment, GeoPoint};
    use wiremock::matchers::{body_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer, token: Option<&str>) -> PlatformClient {
        PlatformClient::new(&PlatformConfig {
            api_base_url: format!("{}/api/", server.uri()),
            api_token: token.map(str::to_string),
            request_timeout_secs: 2,
            ..PlatformConfig::default()
        })
        .unwrap()
    }

    fn report() -> NewReport {
        NewReport {
            title: "Lampu jalan mati".into(),
            description: "Sudah tiga malam gelap total".into(),
            location: GeoPoint::new(-6.2, 106.8),
            address: Some("Jalan Merdeka".into()),
            category_id: "3".into(),
            is_anonymous: true,
            user_id: "u-1".into(),
            images: vec![Attachment {
                bytes: vec![0xFF, 0xD8, 0xFF],
                content_type: "image/jpeg".into(),
                filename: "file_1.jpg".into(),
            }],
        }
    }

    #[tokio::test]
    async fn lists_categories_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/categories"))
            .and(header("authorization", "Bearer svc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "name": "Jalan Rusak"},
                {"id": "2", "name": "Sampah"}
            ])))
            .mount(&server)
            .await;

        let categories = client(&server, Some("svc")).list_categories().await.unwrap();
        assert_eq!(
            categories,
            vec![
                Category { id: "1".into(), name: "Jalan Rusak".into() },
                Category { id: "2".into(), name: "Sampah".into() },
            ]
        );
    }

    #[tokio::test]
    async fn create_report_posts_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/reports"))
            .and(body_string_contains("name=\"categoryId\""))
            .and(body_string_contains("name=\"images\"; filename=\"file_1.jpg\""))
            .and(body_string_contains("Jalan Merdeka"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"id": 99, "status": "PENDING"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let created = client(&server, None).create_report(report()).await.unwrap();
        assert_eq!(created, Report { id: "99".into(), status: "PENDING".into() });
    }

    #[tokio::test]
    async fn create_report_error_message_is_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/reports"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"message": "Category not found"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, None).create_report(report()).await.unwrap_err();
        assert_eq!(err.to_string(), "Category not found");
    }

    #[tokio::test]
    async fn error_without_body_names_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/categories"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = client(&server, None).list_categories().await.unwrap_err();
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn unknown_telegram_user_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/telegram/users/4242"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let found = client(&server, None)
            .find_by_external_id(&"4242".into())
            .await
            .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn linked_telegram_user_resolves() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/telegram/users/4242"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"userId": "u-1", "isEmailVerified": true}),
            ))
            .mount(&server)
            .await;

        let found = client(&server, None)
            .find_by_external_id(&"4242".into())
            .await
            .unwrap();
        assert_eq!(
            found,
            Some(LinkedUser { user_id: "u-1".into(), email_verified: true })
        );
    }

    #[tokio::test]
    async fn bind_posts_identity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/u-1/telegram"))
            .and(body_json(serde_json::json!({
                "telegramId": "4242",
                "telegramUsername": "alice"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server, None)
            .bind("u-1", &"4242".into(), Some("alice"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn slow_platform_times_out_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/categories"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([]))
                    .set_delay(Duration::from_secs(5)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, None).list_categories().await.unwrap_err();
        assert!(matches!(err, CivicError::Timeout { .. }));
    }
}
