// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering of reply markup into Telegram keyboards.

use civic_core::{ButtonTarget, InlineButton, KeyboardKey, Markup};
use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
    KeyboardRemove, ReplyMarkup,
};
use tracing::warn;

/// Converts channel-agnostic markup into a Telegram reply markup.
pub fn render(markup: &Markup) -> ReplyMarkup {
    match markup {
        Markup::Inline(rows) => ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(
            rows.iter()
                .map(|row| row.iter().filter_map(inline_button).collect::<Vec<_>>()),
        )),
        Markup::Keyboard(rows) => ReplyMarkup::Keyboard(
            KeyboardMarkup::new(
                rows.iter()
                    .map(|row| row.iter().map(keyboard_button).collect::<Vec<_>>()),
            )
            .resize_keyboard(),
        ),
        Markup::RemoveKeyboard => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
    }
}

// Buttons whose URL does not parse are dropped rather than failing the send.
fn inline_button(button: &InlineButton) -> Option<InlineKeyboardButton> {
    match &button.target {
        ButtonTarget::Callback(payload) => Some(InlineKeyboardButton::callback(
            button.text.clone(),
            payload.clone(),
        )),
        ButtonTarget::Url(url) => match url.parse::<reqwest::Url>() {
            Ok(url) => Some(InlineKeyboardButton::url(button.text.clone(), url)),
            Err(e) => {
                warn!(url = %url, error = %e, "dropping inline button with invalid url");
                None
            }
        },
    }
}

fn keyboard_button(key: &KeyboardKey) -> KeyboardButton {
    let button = KeyboardButton::new(key.text.clone());
    if key.request_location {
        button.request(ButtonRequest::Location)
    } else {
        button
    }
}
