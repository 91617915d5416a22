// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait for long-lived network adapters.

use async_trait::async_trait;

use crate::error::CivicError;
use crate::types::HealthStatus;

/// Identity, health and lifecycle shared by the chat channel and the
/// platform client.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, CivicError>;

    /// Gracefully shuts down the adapter, releasing any held resources.
    async fn shutdown(&self) -> Result<(), CivicError>;
}
