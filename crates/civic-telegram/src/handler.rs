// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Update filtering and conversion into channel-agnostic events.
//!
//! Only private chats are served. Messages carrying text, a location or a
//! photo become [`InboundEvent`]s; everything else is dropped.

use std::str::FromStr;

use civic_core::{
    ChatIdentity, Command, EventKind, ExternalId, GeoPoint, InboundEvent, PhotoVariant,
};
use teloxide::prelude::*;
use teloxide::types::{ChatKind, User};

/// Checks whether the message is from a private (DM) chat.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

/// Maps a Telegram user to a chat identity keyed by the numeric user id.
pub fn to_identity(user: &User) -> ChatIdentity {
    ChatIdentity {
        id: ExternalId(user.id.0.to_string()),
        username: user.username.clone(),
        display_name: user.full_name(),
    }
}

/// Parses a slash command, accepting the `/command@botname args` form.
///
/// Returns `None` for plain text and for commands the bot does not know, so
/// those reach the conversation as text.
pub fn parse_command(text: &str) -> Option<Command> {
    let head = text.trim_start().strip_prefix('/')?.split_whitespace().next()?;
    let name = head.split('@').next().unwrap_or(head);
    Command::from_str(&name.to_ascii_lowercase()).ok()
}

/// Extracts the event payload from a message.
pub fn event_kind(msg: &Message) -> Option<EventKind> {
    if let Some(text) = msg.text() {
        return Some(match parse_command(text) {
            Some(command) => EventKind::Command(command),
            None => EventKind::Text(text.to_string()),
        });
    }

    if let Some(location) = msg.location() {
        return Some(EventKind::Location(GeoPoint::new(
            location.latitude,
            location.longitude,
        )));
    }

    if let Some(sizes) = msg.photo() {
        let variants: Vec<PhotoVariant> = sizes
            .iter()
            .map(|size| PhotoVariant {
                reference: size.file.id.to_string(),
                width: size.width,
            })
            .collect();
        if !variants.is_empty() {
            return Some(EventKind::Photo(variants));
        }
    }

    None
}

/// Converts a private message into an inbound event.
///
/// Messages without a sender or without supported content yield `None`.
pub fn to_inbound_event(msg: &Message) -> Option<InboundEvent> {
    let sender = msg.from.as_ref()?;
    Some(InboundEvent {
        sender: to_identity(sender),
        kind: event_kind(msg)?,
    })
}

/// Converts an inline button press into an inbound event.
///
/// Presses without callback data (game buttons) yield `None`.
pub fn callback_event(query: &CallbackQuery) -> Option<InboundEvent> {
    let payload = query.data.clone()?;
    Some(InboundEvent {
        sender: to_identity(&query.from),
        kind: EventKind::Button {
            callback_id: query.id.0.clone(),
            payload,
        },
    })
}
