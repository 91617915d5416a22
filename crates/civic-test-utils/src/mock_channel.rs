// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound events
//! and captured outbound replies and button answers.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use civic_core::{
    ChannelAdapter, ChatNotifier, CivicError, ExternalId, HealthStatus, InboundEvent, MessageId,
    PluginAdapter, Reply,
};

/// A reply captured by [`MockChannel::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReply {
    pub to: ExternalId,
    pub reply: Reply,
}

/// A button acknowledgement captured by [`MockChannel::answer_button`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonAnswer {
    pub callback_id: String,
    pub text: Option<String>,
}

/// A mock chat channel for testing.
///
/// - **inbound**: events injected via `inject()` are returned by `receive()`
/// - **sent**: replies passed to `send()` and `notify()` are captured
/// - **answers**: button acknowledgements are captured
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<InboundEvent>>>,
    sent: Arc<Mutex<Vec<SentReply>>>,
    answers: Arc<Mutex<Vec<ButtonAnswer>>>,
    notify: Arc<Notify>,
    closed: AtomicBool,
    fail_sends: AtomicBool,
    next_id: AtomicU64,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            answers: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            closed: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        }
    }

    /// Queues an event for the next `receive()`.
    pub async fn inject(&self, event: InboundEvent) {
        self.inbound.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// Makes `receive()` fail once the queue is empty.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Makes every subsequent `send()` fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<SentReply> {
        self.sent.lock().await.clone()
    }

    /// Replies sent to `to`, oldest first.
    pub async fn replies_to(&self, to: &ExternalId) -> Vec<Reply> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|s| &s.to == to)
            .map(|s| s.reply.clone())
            .collect()
    }

    pub async fn answers(&self) -> Vec<ButtonAnswer> {
        self.answers.lock().await.clone()
    }

    /// Drops all captured replies and answers.
    pub async fn clear(&self) {
        self.sent.lock().await.clear();
        self.answers.lock().await.clear();
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    async fn health_check(&self) -> Result<HealthStatus, CivicError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CivicError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    async fn connect(&mut self) -> Result<(), CivicError> {
        Ok(())
    }

    async fn send(&self, recipient: &ExternalId, reply: &Reply) -> Result<MessageId, CivicError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(CivicError::Channel {
                message: "mock send failure".into(),
                source: None,
            });
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().await.push(SentReply {
            to: recipient.clone(),
            reply: reply.clone(),
        });
        Ok(MessageId(format!("mock-msg-{id}")))
    }

    async fn answer_button(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), CivicError> {
        self.answers.lock().await.push(ButtonAnswer {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
        });
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, CivicError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(CivicError::Channel {
                    message: "mock channel closed".into(),
                    source: None,
                });
            }
            self.notify.notified().await;
        }
    }
}

#[async_trait]
impl ChatNotifier for MockChannel {
    async fn notify(&self, recipient: &ExternalId, text: &str) -> Result<(), CivicError> {
        self.send(recipient, &Reply::text(text)).await.map(|_| ())
    }
}
