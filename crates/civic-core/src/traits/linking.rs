// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence for one-time linking codes.

use async_trait::async_trait;

use crate::error::CivicError;
use crate::types::LinkCode;

/// Storage for [`LinkCode`] records. Records are never deleted.
#[async_trait]
pub trait LinkCodeStore: Send + Sync {
    /// Persists a freshly issued code.
    async fn insert(&self, code: &LinkCode) -> Result<(), CivicError>;

    /// Returns the most recently issued record carrying `code`, if any.
    async fn find_latest(&self, code: &str) -> Result<Option<LinkCode>, CivicError>;

    /// Atomically marks the most recent record for `code` as used by
    /// `user_id`. Returns `false` if it was already used.
    async fn claim(&self, code: &str, user_id: &str) -> Result<bool, CivicError>;
}
