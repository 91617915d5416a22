// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply texts and markup sent to citizens.
//!
//! Every user-supplied string passes through [`escape_html`] before being
//! embedded; replies are rendered in HTML parse mode.

use std::time::Duration;

use civic_core::{
    escape_html, ButtonAction, Category, InlineButton, KeyboardKey, Markup, Reply, Report,
};

use crate::session::{Draft, PhotoSet, Place, MAX_PHOTOS};

/// Persistent keyboard key that cancels the conversation.
pub const CANCEL_KEY: &str = "❌ Cancel";
/// Persistent keyboard key that finishes the Photos step.
pub const DONE_KEY: &str = "✅ Done";

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MIN_CHARS: usize = 10;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

/// Web application links offered in replies.
///
/// Local deployments get the address as copyable monospace text, since chat
/// clients refuse to open `localhost` URLs from buttons.
#[derive(Debug, Clone)]
pub struct Destinations {
    frontend_url: String,
    local: bool,
}

impl Destinations {
    pub fn new(frontend_url: &str) -> Self {
        let frontend_url = frontend_url.trim_end_matches('/').to_string();
        let local = frontend_url.contains("localhost") || frontend_url.contains("127.0.0.1");
        Self {
            frontend_url,
            local,
        }
    }

    pub fn is_local(&self) -> bool {
        self.local
    }

    pub fn link_account(&self, code: &str) -> String {
        format!("{}/link-telegram?code={code}", self.frontend_url)
    }

    pub fn register(&self) -> String {
        format!("{}/register", self.frontend_url)
    }

    pub fn report(&self, id: &str) -> String {
        format!("{}/reports/{id}", self.frontend_url)
    }

    pub fn map(&self) -> String {
        format!("{}/map", self.frontend_url)
    }

    /// Attaches `links` to `text`: URL buttons in production, monospace
    /// addresses appended to the text in local mode. `extra` rows are
    /// appended after the link buttons in both modes.
    fn attach(
        &self,
        mut text: String,
        links: &[(&str, String)],
        extra: Vec<Vec<InlineButton>>,
    ) -> Reply {
        let mut rows = Vec::new();
        if self.local {
            for (label, url) in links {
                text.push_str(&format!("\n\n{label}:\n<code>{}</code>", escape_html(url)));
            }
        } else {
            rows.extend(
                links
                    .iter()
                    .map(|(label, url)| vec![InlineButton::url(*label, url.clone())]),
            );
        }
        rows.extend(extra);
        if rows.is_empty() {
            Reply::text(text)
        } else {
            Reply::text(text).with_markup(Markup::Inline(rows))
        }
    }
}

fn cancel_row() -> Vec<InlineButton> {
    vec![InlineButton::action("❌ Cancel", &ButtonAction::Cancel)]
}

fn cancel_keyboard() -> Markup {
    Markup::Keyboard(vec![vec![KeyboardKey::text(CANCEL_KEY)]])
}

/// "hour", "2 hours", "30 minutes".
pub fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    let (n, unit) = if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if n == 1 {
        unit.to_string()
    } else {
        format!("{n} {unit}s")
    }
}

// --- Commands ---

pub fn welcome(name: &str, linked: bool) -> Reply {
    let name = escape_html(name);
    if linked {
        Reply::text(format!(
            "👋 Welcome back, <b>{name}</b>!\n\nYour account is linked. Tap below or send /newreport to report an issue in your city."
        ))
        .with_markup(Markup::Inline(vec![vec![InlineButton::action(
            "📝 New report",
            &ButtonAction::StartNewReport,
        )]]))
    } else {
        Reply::text(format!(
            "👋 Hello, <b>{name}</b>!\n\nThis bot files reports about public facilities and infrastructure. Link your Telegram account to your platform account first."
        ))
        .with_markup(Markup::Inline(vec![vec![InlineButton::action(
            "🔗 Link account",
            &ButtonAction::LinkAccount,
        )]]))
    }
}

pub fn help() -> Reply {
    Reply::text(
        "<b>Commands</b>\n\
         /start - show the welcome message\n\
         /link - link your Telegram account\n\
         /newreport - file a new report\n\
         /done - finish sending photos\n\
         /cancel - cancel the report in progress\n\
         /help - show this help\n\n\
         A report takes seven steps: location, title, description, category, photos (1 to 3), anonymity, confirmation.",
    )
}

pub fn link_code(destinations: &Destinations, code: &str, ttl: Duration) -> Reply {
    let minutes = ttl.as_secs().div_ceil(60);
    let text = format!(
        "🔗 Your link code is <code>{code}</code>\n\nEnter it on the web application within {minutes} minutes. The code can be used once."
    );
    destinations.attach(
        text,
        &[
            ("🔗 Link account", destinations.link_account(code)),
            ("📝 Register", destinations.register()),
        ],
        Vec::new(),
    )
}

pub fn already_linked() -> Reply {
    Reply::text("✅ Your Telegram account is already linked. Send /newreport to file a report.")
}

pub fn link_first(destinations: &Destinations) -> Reply {
    destinations.attach(
        "⚠️ Your Telegram account is not linked yet. Link it to your platform account before filing a report.".to_string(),
        &[("📝 Register", destinations.register())],
        vec![vec![InlineButton::action(
            "🔗 Link account",
            &ButtonAction::LinkAccount,
        )]],
    )
}

pub fn verify_email() -> Reply {
    Reply::text(
        "📧 Please verify your email address on the web application before filing a report.",
    )
}

pub fn rate_limited(max: usize, window: Duration) -> Reply {
    Reply::text(format!(
        "⏳ You can file at most {max} reports per {}. Please try again later.",
        describe_window(window)
    ))
}

pub fn cancelled() -> Reply {
    Reply::text("❌ Report cancelled.").with_markup(Markup::RemoveKeyboard)
}

pub fn nothing_to_cancel() -> Reply {
    Reply::text("There is no report in progress.")
}

pub fn no_session_hint() -> Reply {
    Reply::text("Send /newreport to file a report or /help to see all commands.")
}

/// A command failed; any report in progress is untouched.
pub fn try_again_later() -> Reply {
    Reply::text("⚠️ That didn't work right now. Please try again in a moment.")
}

pub fn generic_error() -> Reply {
    Reply::text("⚠️ Something went wrong. The report in progress was discarded, please start again with /newreport.")
        .with_markup(Markup::RemoveKeyboard)
}

// --- Intake steps ---

pub fn location_prompt() -> Reply {
    Reply::text(
        "📍 <b>Step 1/7: Location</b>\n\nShare the location of the issue using the button below or the attachment menu.",
    )
    .with_markup(Markup::Keyboard(vec![
        vec![KeyboardKey::location("📍 Send location")],
        vec![KeyboardKey::text(CANCEL_KEY)],
    ]))
}

pub fn location_expected() -> Reply {
    Reply::text("📍 Please share a location, not text. Use the 📍 Send location button.")
}

pub fn outside_boundary() -> Reply {
    Reply::text("🚫 That location is outside the service area. Please share a location inside the city.")
}

pub fn boundary_unavailable() -> Reply {
    Reply::text("⚠️ Could not verify that location right now. Please try sharing it again.")
}

pub fn title_prompt(place: &Place) -> Reply {
    Reply::text(format!(
        "✅ Location: {}\n\n✏️ <b>Step 2/7: Title</b>\n\nSend a short title for the report (at most {TITLE_MAX_CHARS} characters).",
        escape_html(&place.label())
    ))
    .with_markup(cancel_keyboard())
}

pub fn title_invalid() -> Reply {
    Reply::text(format!(
        "⚠️ The title must be between 1 and {TITLE_MAX_CHARS} characters."
    ))
}

pub fn description_prompt() -> Reply {
    Reply::text(format!(
        "📝 <b>Step 3/7: Description</b>\n\nDescribe the issue ({DESCRIPTION_MIN_CHARS} to {DESCRIPTION_MAX_CHARS} characters)."
    ))
}

pub fn description_invalid() -> Reply {
    Reply::text(format!(
        "⚠️ The description must be between {DESCRIPTION_MIN_CHARS} and {DESCRIPTION_MAX_CHARS} characters."
    ))
}

pub fn category_prompt(categories: &[Category]) -> Reply {
    let mut rows: Vec<Vec<InlineButton>> = categories
        .iter()
        .map(|c| {
            vec![InlineButton::action(
                c.name.clone(),
                &ButtonAction::Category(c.id.clone()),
            )]
        })
        .collect();
    rows.push(cancel_row());
    Reply::text("🏷️ <b>Step 4/7: Category</b>\n\nChoose the category that fits best.")
        .with_markup(Markup::Inline(rows))
}

pub fn no_categories() -> Reply {
    Reply::text("⚠️ No categories are available right now, so the report cannot be filed. Please try again later.")
        .with_markup(Markup::RemoveKeyboard)
}

pub fn categories_unavailable() -> Reply {
    Reply::text("⚠️ Could not load categories. Please try again later with /newreport.")
        .with_markup(Markup::RemoveKeyboard)
}

/// Toast shown when a selected category has disappeared.
pub const CATEGORY_GONE: &str = "This category is no longer available. Please choose another.";
/// Toast shown when the category list could not be re-checked.
pub const CATEGORY_CHECK_FAILED: &str = "⚠️ Could not check the category. Please try again.";

pub fn photos_prompt(category: &Category) -> Reply {
    Reply::text(format!(
        "✅ Category: {}\n\n📸 <b>Step 5/7: Photos</b>\n\nSend 1 to {MAX_PHOTOS} photos of the issue, then tap {DONE_KEY}.",
        escape_html(&category.name)
    ))
    .with_markup(Markup::Keyboard(vec![
        vec![KeyboardKey::text(DONE_KEY)],
        vec![KeyboardKey::text(CANCEL_KEY)],
    ]))
}

pub fn photo_received(count: usize) -> Reply {
    if count >= MAX_PHOTOS {
        Reply::text(format!(
            "📸 Photo {count}/{MAX_PHOTOS} received. Tap {DONE_KEY} to continue."
        ))
    } else {
        Reply::text(format!(
            "📸 Photo {count}/{MAX_PHOTOS} received. Send more or tap {DONE_KEY}."
        ))
    }
}

pub fn photo_limit() -> Reply {
    Reply::text(format!(
        "⚠️ You can attach at most {MAX_PHOTOS} photos. Tap {DONE_KEY} to continue."
    ))
}

pub fn photos_required() -> Reply {
    Reply::text("⚠️ Please send at least one photo before continuing.")
}

pub fn photos_saved(photos: &PhotoSet) -> Reply {
    Reply::text(format!("✅ {} photo(s) saved.", photos.len())).with_markup(Markup::RemoveKeyboard)
}

pub fn anonymity_prompt() -> Reply {
    Reply::text("🕶️ <b>Step 6/7: Anonymity</b>\n\nShould the report hide your name from other citizens?")
        .with_markup(Markup::Inline(vec![
            vec![
                InlineButton::action("🕶️ Yes, anonymous", &ButtonAction::AnonymousYes),
                InlineButton::action("👤 No, show my name", &ButtonAction::AnonymousNo),
            ],
            cancel_row(),
        ]))
}

pub fn summary(draft: &Draft, photos: &PhotoSet, anonymous: bool) -> Reply {
    let text = format!(
        "📋 <b>Step 7/7: Confirm</b>\n\n\
         <b>Title:</b> {}\n\
         <b>Description:</b> {}\n\
         <b>Location:</b> {}\n\
         <b>Category:</b> {}\n\
         <b>Photos:</b> {}\n\
         <b>Anonymous:</b> {}\n\n\
         Submit this report?",
        escape_html(&draft.title),
        escape_html(&draft.description),
        escape_html(&draft.place.label()),
        escape_html(&draft.category.name),
        photos.len(),
        if anonymous { "Yes" } else { "No" },
    );
    Reply::text(text).with_markup(Markup::Inline(vec![
        vec![InlineButton::action("✅ Submit", &ButtonAction::ConfirmYes)],
        cancel_row(),
    ]))
}

pub fn submitted(destinations: &Destinations, report: &Report) -> Reply {
    let text = format!(
        "✅ <b>Report submitted!</b>\n\nReport ID: <code>{}</code>\nStatus: {}\n\nThank you for helping improve your city.",
        escape_html(&report.id),
        escape_html(&report.status)
    );
    destinations.attach(
        text,
        &[
            ("🔎 View report", destinations.report(&report.id)),
            ("🗺️ Open map", destinations.map()),
        ],
        Vec::new(),
    )
}

pub fn submit_failed(reason: &str) -> Reply {
    Reply::text(format!(
        "❌ Failed to submit report: {}",
        escape_html(reason)
    ))
    .with_markup(Markup::RemoveKeyboard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_core::{ButtonTarget, GeoPoint};

    fn url_buttons(reply: &Reply) -> Vec<String> {
        match &reply.markup {
            Some(Markup::Inline(rows)) => rows
                .iter()
                .flatten()
                .filter_map(|b| match &b.target {
                    ButtonTarget::Url(u) => Some(u.clone()),
                    ButtonTarget::Callback(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn local_frontend_renders_links_as_code() {
        let dest = Destinations::new("http://localhost:5173/");
        assert!(dest.is_local());
        let reply = link_code(&dest, "123456", Duration::from_secs(900));
        assert!(reply.text.contains("<code>http://localhost:5173/link-telegram?code=123456</code>"));
        assert!(url_buttons(&reply).is_empty());
        assert!(reply.text.contains("15 minutes"));
    }

    #[test]
    fn public_frontend_renders_link_buttons() {
        let dest = Destinations::new("https://lapor.example.go.id");
        assert!(!dest.is_local());
        let report = Report {
            id: "r-1".into(),
            status: "PENDING".into(),
        };
        let reply = submitted(&dest, &report);
        assert_eq!(
            url_buttons(&reply),
            vec![
                "https://lapor.example.go.id/reports/r-1".to_string(),
                "https://lapor.example.go.id/map".to_string()
            ]
        );
        assert!(!reply.text.contains("https://"));
    }

    #[test]
    fn loopback_address_counts_as_local() {
        assert!(Destinations::new("http://127.0.0.1:8080").is_local());
    }

    #[test]
    fn photo_counter_distinguishes_last_photo() {
        assert!(photo_received(1).text.contains("Send more"));
        assert!(photo_received(2).text.contains("Send more"));
        let last = photo_received(3).text;
        assert!(last.contains("3/3"));
        assert!(!last.contains("Send more"));
    }

    #[test]
    fn summary_escapes_user_text_and_falls_back_to_coordinates() {
        let draft = Draft {
            place: Place {
                point: GeoPoint::new(-6.914744, 107.60981),
                address: None,
            },
            title: "<b>pothole</b>".into(),
            description: "deep & wide hole".into(),
            category: Category {
                id: "1".into(),
                name: "Roads".into(),
            },
        };
        let reply = summary(&draft, &PhotoSet::default(), true);
        assert!(reply.text.contains("&lt;b&gt;pothole&lt;/b&gt;"));
        assert!(reply.text.contains("deep &amp; wide hole"));
        assert!(reply.text.contains("-6.914744, 107.609810"));
        assert_eq!(reply.callback_payloads(), vec!["confirm_yes", "cancel"]);
    }

    #[test]
    fn category_prompt_lists_every_category_then_cancel() {
        let categories = vec![
            Category {
                id: "1".into(),
                name: "Roads".into(),
            },
            Category {
                id: "2".into(),
                name: "Lighting".into(),
            },
        ];
        assert_eq!(
            category_prompt(&categories).callback_payloads(),
            vec!["category_1", "category_2", "cancel"]
        );
    }

    #[test]
    fn window_descriptions() {
        assert_eq!(describe_window(Duration::from_secs(3600)), "hour");
        assert_eq!(describe_window(Duration::from_secs(7200)), "2 hours");
        assert_eq!(describe_window(Duration::from_secs(1800)), "30 minutes");
        assert_eq!(describe_window(Duration::from_secs(45)), "45 seconds");
    }

    #[test]
    fn rate_limit_reply_embeds_cap() {
        let reply = rate_limited(5, Duration::from_secs(3600));
        assert!(reply.text.contains("at most 5 reports per hour"));
    }

    #[test]
    fn submit_failure_is_verbatim_but_escaped() {
        let reply = submit_failed("Category <7> not found");
        assert_eq!(
            reply.text,
            "❌ Failed to submit report: Category &lt;7&gt; not found"
        );
    }
}
