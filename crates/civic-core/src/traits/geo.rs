// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Geographic collaborators: boundary containment and reverse geocoding.

use async_trait::async_trait;

use crate::error::CivicError;
use crate::types::GeoPoint;

/// Point-in-boundary test against the municipal service area.
#[async_trait]
pub trait BoundaryCheck: Send + Sync {
    /// Returns `true` iff `point` lies inside the service area.
    async fn contains(&self, point: GeoPoint) -> Result<bool, CivicError>;
}

/// Best-effort coordinate to address lookup.
///
/// Implementations absorb every failure and return `None`; an address is
/// advisory and never blocks a conversation.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn lookup(&self, point: GeoPoint) -> Option<String>;
}
