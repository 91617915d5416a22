// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for the Civic report-intake bot.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide:
//! long polling for private messages and button presses, HTML replies with
//! inline or reply keyboards, and photo downloads through
//! [`TelegramAttachmentFetcher`].

pub mod handler;
pub mod keyboard;
pub mod media;

use async_trait::async_trait;
use civic_config::model::TelegramConfig;
use civic_core::{
    ChannelAdapter, ChatNotifier, CivicError, ExternalId, HealthStatus, InboundEvent, MessageId,
    PluginAdapter, Reply,
};
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::{CallbackQueryId, ChatId, ParseMode};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub use media::TelegramAttachmentFetcher;

/// Inbound queue depth between the polling task and `receive`.
const INBOUND_CAPACITY: usize = 100;

/// Telegram channel adapter implementing [`ChannelAdapter`].
pub struct TelegramChannel {
    bot: Bot,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundEvent>>,
    inbound_tx: mpsc::Sender<InboundEvent>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: TelegramConfig) -> Result<Self, CivicError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            CivicError::Config("telegram.bot_token is required for Telegram adapter".into())
        })?;

        if token.trim().is_empty() {
            return Err(CivicError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);

        Ok(Self {
            bot,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

fn chat_id(recipient: &ExternalId) -> Result<ChatId, CivicError> {
    recipient
        .as_str()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|e| CivicError::Channel {
            message: format!("invalid Telegram chat id '{recipient}'"),
            source: Some(Box::new(e)),
        })
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn health_check(&self) -> Result<HealthStatus, CivicError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), CivicError> {
        debug!("Telegram channel shutting down");
        if let Some(handle) = &self.polling_handle {
            handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    async fn connect(&mut self) -> Result<(), CivicError> {
        if self.polling_handle.is_some() {
            return Ok(());
        }

        let bot = self.bot.clone();
        let message_tx = self.inbound_tx.clone();
        let callback_tx = self.inbound_tx.clone();

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let messages = Update::filter_message().endpoint(move |msg: Message| {
                let tx = message_tx.clone();
                async move {
                    if !handler::is_dm(&msg) {
                        debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
                        return respond(());
                    }

                    match handler::to_inbound_event(&msg) {
                        Some(event) => {
                            if tx.send(event).await.is_err() {
                                warn!("inbound channel closed, dropping message");
                            }
                        }
                        None => {
                            debug!(msg_id = msg.id.0, "ignoring unsupported message type");
                        }
                    }
                    respond(())
                }
            });

            let callbacks = Update::filter_callback_query().endpoint(move |query: CallbackQuery| {
                let tx = callback_tx.clone();
                async move {
                    if let Some(event) = handler::callback_event(&query) {
                        if tx.send(event).await.is_err() {
                            warn!("inbound channel closed, dropping button press");
                        }
                    }
                    respond(())
                }
            });

            let tree = dptree::entry().branch(messages).branch(callbacks);

            Dispatcher::builder(bot, tree)
                .default_handler(|_| async {})
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn send(&self, recipient: &ExternalId, reply: &Reply) -> Result<MessageId, CivicError> {
        let chat_id = chat_id(recipient)?;
        let markup = reply.markup.as_ref().map(keyboard::render);

        let mut request = self
            .bot
            .send_message(chat_id, reply.text.clone())
            .parse_mode(ParseMode::Html);
        if let Some(markup) = markup.clone() {
            request = request.reply_markup(markup);
        }

        let sent = match request.await {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "HTML send failed, retrying as plain text");
                let mut plain = self.bot.send_message(chat_id, reply.text.clone());
                if let Some(markup) = markup {
                    plain = plain.reply_markup(markup);
                }
                plain.await.map_err(|e| CivicError::Channel {
                    message: format!("failed to send message: {e}"),
                    source: Some(Box::new(e)),
                })?
            }
        };

        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn answer_button(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), CivicError> {
        let mut request = self
            .bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()));
        if let Some(text) = text {
            request = request.text(text);
        }
        request.await.map_err(|e| CivicError::Channel {
            message: format!("failed to answer button press: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, CivicError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| CivicError::Channel {
            message: "inbound channel closed".into(),
            source: None,
        })
    }
}

#[async_trait]
impl ChatNotifier for TelegramChannel {
    async fn notify(&self, recipient: &ExternalId, text: &str) -> Result<(), CivicError> {
        self.send(recipient, &Reply::text(text)).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_requires_token() {
        let result = TelegramChannel::new(TelegramConfig::default());
        assert!(matches!(result, Err(CivicError::Config(msg)) if msg.contains("bot_token")));
    }

    #[test]
    fn new_rejects_blank_token() {
        let config = TelegramConfig {
            bot_token: Some("  ".into()),
        };
        assert!(matches!(
            TelegramChannel::new(config),
            Err(CivicError::Config(msg)) if msg.contains("empty")
        ));
    }

    #[test]
    fn new_with_token_succeeds() {
        let config = TelegramConfig {
            bot_token: Some("123456:ABC-DEF".into()),
        };
        let channel = TelegramChannel::new(config).unwrap();
        assert_eq!(channel.name(), "telegram");
        assert!(channel.polling_handle.is_none());
    }

    #[test]
    fn chat_id_parses_numeric_ids() {
        assert_eq!(chat_id(&ExternalId::from("4242")).unwrap(), ChatId(4242));
        assert_eq!(chat_id(&ExternalId::from(-100123i64)).unwrap(), ChatId(-100123));
        assert!(matches!(
            chat_id(&ExternalId::from("not-a-number")),
            Err(CivicError::Channel { .. })
        ));
    }

    #[tokio::test]
    async fn receive_yields_queued_events() {
        let config = TelegramConfig {
            bot_token: Some("123456:ABC-DEF".into()),
        };
        let channel = TelegramChannel::new(config).unwrap();
        let event = InboundEvent {
            sender: civic_core::ChatIdentity {
                id: ExternalId::from("4242"),
                username: None,
                display_name: "Siti".into(),
            },
            kind: civic_core::EventKind::Text("hello".into()),
        };
        channel.inbound_tx.send(event.clone()).await.unwrap();
        assert_eq!(channel.receive().await.unwrap(), event);
    }
}
