// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Civic report-intake bot.

use thiserror::Error;

/// The primary error type used across all Civic adapter traits and core operations.
#[derive(Debug, Error)]
pub enum CivicError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chat channel errors (send failure, malformed update, closed inbound queue).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Municipal platform or geocoder errors. `message` carries the upstream
    /// reason as reported by the remote service.
    #[error("{message}")]
    Upstream {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Photo attachment could not be resolved or downloaded.
    #[error("attachment error: {message}")]
    Attachment {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Account linking rejected the request.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Reasons an account-linking operation is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// No code with this value was ever issued.
    #[error("link code not found")]
    UnknownCode,

    /// The code exists but its 15-minute validity has passed.
    #[error("link code has expired")]
    CodeExpired,

    /// The code was already consumed.
    #[error("link code has already been used")]
    CodeAlreadyUsed,

    /// The chat identity is already bound to a platform account.
    #[error("this Telegram account is already linked")]
    IdentityAlreadyLinked,

    /// The platform account already has a chat identity bound to it.
    #[error("this platform account is already linked to a Telegram account")]
    AccountAlreadyLinked,

    /// Could not allocate a code that is not currently active.
    #[error("could not allocate a unique link code")]
    CodeSpaceExhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_displays_message_verbatim() {
        let err = CivicError::Upstream {
            message: "Category not found".into(),
            source: None,
        };
        assert_eq!(err.to_string(), "Category not found");
    }

    #[test]
    fn link_error_is_transparent() {
        let err: CivicError = LinkError::CodeExpired.into();
        assert_eq!(err.to_string(), "link code has expired");
        assert!(matches!(err, CivicError::Link(LinkError::CodeExpired)));
    }
}
