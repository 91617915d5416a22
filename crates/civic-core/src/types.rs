// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the intake engine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The chat platform's identifier for a user, independent of the platform
/// account id. Telegram numeric ids are carried in their decimal form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalId(pub String);

impl ExternalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExternalId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for ExternalId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

/// Unique identifier for a message sent through a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Snapshot of the sender of an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatIdentity {
    pub id: ExternalId,
    /// Platform handle without the leading `@`, if the user has one.
    pub username: Option<String>,
    /// Human-readable name as shown by the chat client.
    pub display_name: String,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for GeoPoint {
    /// Formats as `lat, lon` with six decimal places.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// A report category as listed by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// A downloaded photo ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub filename: String,
}

/// Everything the platform needs to create a report.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub title: String,
    pub description: String,
    pub location: GeoPoint,
    pub address: Option<String>,
    pub category_id: String,
    pub is_anonymous: bool,
    pub user_id: String,
    pub images: Vec<Attachment>,
}

/// A report as acknowledged by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub status: String,
}

/// A platform account bound to a chat identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedUser {
    pub user_id: String,
    pub email_verified: bool,
}

/// A one-time code binding a chat identity to a platform account.
///
/// Codes are never deleted: consumption flips `used` and records `user_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCode {
    pub code: String,
    pub external_id: ExternalId,
    pub external_username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub user_id: Option<String>,
}

impl LinkCode {
    /// True while the code is unused and `now` is before its expiry.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.used && now < self.expires_at
    }
}

// --- Inbound events ---

/// Slash commands understood by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Command {
    Start,
    Help,
    Link,
    NewReport,
    Cancel,
    Done,
}

/// One resolution variant of a shared photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoVariant {
    /// Opaque chat-native file reference.
    pub reference: String,
    pub width: u32,
}

/// What the user did.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Command(Command),
    Text(String),
    Location(GeoPoint),
    Photo(Vec<PhotoVariant>),
    /// An inline button press. `callback_id` must be acknowledged.
    Button { callback_id: String, payload: String },
}

/// A channel-agnostic inbound chat event.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub sender: ChatIdentity,
    pub kind: EventKind,
}

/// Decoded inline button payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    LinkAccount,
    StartNewReport,
    AnonymousYes,
    AnonymousNo,
    ConfirmYes,
    Cancel,
    Category(String),
}

impl ButtonAction {
    const CATEGORY_PREFIX: &'static str = "category_";

    /// Decodes a callback payload. Unknown payloads yield `None`.
    pub fn parse(payload: &str) -> Option<Self> {
        match payload {
            "link_account" => Some(Self::LinkAccount),
            "start_newreport" => Some(Self::StartNewReport),
            "anonymous_yes" => Some(Self::AnonymousYes),
            "anonymous_no" => Some(Self::AnonymousNo),
            "confirm_yes" => Some(Self::ConfirmYes),
            "cancel" => Some(Self::Cancel),
            other => other
                .strip_prefix(Self::CATEGORY_PREFIX)
                .filter(|id| !id.is_empty())
                .map(|id| Self::Category(id.to_string())),
        }
    }

    /// Encodes the action as a callback payload.
    pub fn payload(&self) -> String {
        match self {
            Self::LinkAccount => "link_account".into(),
            Self::StartNewReport => "start_newreport".into(),
            Self::AnonymousYes => "anonymous_yes".into(),
            Self::AnonymousNo => "anonymous_no".into(),
            Self::ConfirmYes => "confirm_yes".into(),
            Self::Cancel => "cancel".into(),
            Self::Category(id) => format!("{}{id}", Self::CATEGORY_PREFIX),
        }
    }
}

// --- Outbound replies ---

/// Where an inline button leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonTarget {
    Callback(String),
    Url(String),
}

/// A button attached to a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub target: ButtonTarget,
}

impl InlineButton {
    pub fn action(text: impl Into<String>, action: &ButtonAction) -> Self {
        Self {
            text: text.into(),
            target: ButtonTarget::Callback(action.payload()),
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target: ButtonTarget::Url(url.into()),
        }
    }
}

/// A key on the persistent reply keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardKey {
    pub text: String,
    /// Pressing the key shares the user's location instead of sending text.
    pub request_location: bool,
}

impl KeyboardKey {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_location: false,
        }
    }

    pub fn location(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_location: true,
        }
    }
}

/// Interactive markup attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    Inline(Vec<Vec<InlineButton>>),
    Keyboard(Vec<Vec<KeyboardKey>>),
    RemoveKeyboard,
}

/// An outbound reply. `text` is HTML-formatted; user-supplied content must be
/// passed through [`escape_html`] before being embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub markup: Option<Markup>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: None,
        }
    }

    pub fn with_markup(mut self, markup: Markup) -> Self {
        self.markup = Some(markup);
        self
    }

    /// Callback payloads of all inline buttons, in row order.
    pub fn callback_payloads(&self) -> Vec<&str> {
        match &self.markup {
            Some(Markup::Inline(rows)) => rows
                .iter()
                .flatten()
                .filter_map(|b| match &b.target {
                    ButtonTarget::Callback(p) => Some(p.as_str()),
                    ButtonTarget::Url(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Escapes HTML special characters for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}
