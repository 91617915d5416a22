// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat channel traits (Telegram and test doubles).

use async_trait::async_trait;

use crate::error::CivicError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ExternalId, InboundEvent, MessageId, Reply};

/// Adapter for a bidirectional chat platform.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Establishes a connection to the chat platform and starts receiving.
    async fn connect(&mut self) -> Result<(), CivicError>;

    /// Sends a reply to the private chat of `recipient`.
    async fn send(&self, recipient: &ExternalId, reply: &Reply) -> Result<MessageId, CivicError>;

    /// Acknowledges an inline button press, optionally with a short toast.
    async fn answer_button(&self, callback_id: &str, text: Option<&str>)
    -> Result<(), CivicError>;

    /// Receives the next inbound event.
    async fn receive(&self) -> Result<InboundEvent, CivicError>;
}

/// Fire-and-forget notification to a chat identity outside any conversation.
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    async fn notify(&self, recipient: &ExternalId, text: &str) -> Result<(), CivicError>;
}
