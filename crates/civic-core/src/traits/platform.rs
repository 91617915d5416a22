// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contracts consumed from the municipal platform.

use async_trait::async_trait;

use crate::error::CivicError;
use crate::types::{Category, ExternalId, LinkedUser, NewReport, Report};

/// The platform's Reports and Categories services.
#[async_trait]
pub trait ReportsService: Send + Sync {
    /// Persists a complete report, uploading its images.
    async fn create_report(&self, report: NewReport) -> Result<Report, CivicError>;

    /// Lists the categories a citizen may file under.
    async fn list_categories(&self) -> Result<Vec<Category>, CivicError>;
}

/// The platform's account directory, as far as chat linking is concerned.
///
/// A chat identity maps to at most one platform user and vice versa.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Resolves the platform user bound to a chat identity.
    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<LinkedUser>, CivicError>;

    /// Returns the chat identity bound to a platform user, if any.
    async fn external_id_of(&self, user_id: &str) -> Result<Option<ExternalId>, CivicError>;

    /// Binds a chat identity to a platform user.
    async fn bind(
        &self,
        user_id: &str,
        external_id: &ExternalId,
        external_username: Option<&str>,
    ) -> Result<(), CivicError>;
}
