// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;

use crate::error::CivicError;
use crate::types::Attachment;

/// Resolves a chat-native photo reference into downloadable bytes.
///
/// Any failure is a hard failure: callers treat it as fatal for the whole
/// batch of photos being uploaded.
#[async_trait]
pub trait AttachmentFetcher: Send + Sync {
    async fn fetch(&self, reference: &str) -> Result<Attachment, CivicError>;
}
