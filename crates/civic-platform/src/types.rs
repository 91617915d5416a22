// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the platform API.

use serde::{Deserialize, Deserializer, Serialize};

/// Some endpoints wrap their payload in `{"data": ...}`, others return it bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(inner) => inner,
        }
    }
}

/// Ids arrive as JSON numbers or strings depending on the entity.
pub fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(i64),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Text(s) => s,
        Repr::Number(n) => n.to_string(),
    })
}

fn flexible_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "flexible_id")] String);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(id)| id))
}

#[derive(Debug, Deserialize)]
pub struct CategoryDto {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportDto {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "PENDING".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedUserDto {
    #[serde(deserialize_with = "flexible_id")]
    pub user_id: String,
    #[serde(default)]
    pub is_email_verified: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramBindingDto {
    #[serde(default, deserialize_with = "flexible_opt_id")]
    pub telegram_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindRequest<'a> {
    pub telegram_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_username: Option<&'a str>,
}

/// Error body. `message` is a string, or a list of validation messages.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: ErrorMessage,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

impl ErrorMessage {
    pub fn joined(self) -> String {
        match self {
            Self::One(message) => message,
            Self::Many(messages) => messages.join("; "),
        }
    }
}
