// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Issuing, consuming and resolving account links.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use civic_core::{
    AccountDirectory, ChatNotifier, CivicError, ExternalId, LinkCode, LinkCodeStore, LinkError,
    LinkedUser,
};
use rand::Rng;
use tracing::{info, warn};

/// How many random codes are drawn before giving up on finding a free one.
pub const MAX_CODE_DRAWS: usize = 10;

/// Sent to the chat identity once its link code has been redeemed.
pub const LINKED_NOTICE: &str =
    "✅ Your Telegram account is now linked. Send /newreport to file a report.";

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Issues and consumes one-time link codes and resolves linked accounts.
pub struct AccountLinkDirectory {
    codes: Arc<dyn LinkCodeStore>,
    accounts: Arc<dyn AccountDirectory>,
    notifier: Option<Arc<dyn ChatNotifier>>,
    ttl: Duration,
    clock: Clock,
}

impl AccountLinkDirectory {
    pub fn new(
        codes: Arc<dyn LinkCodeStore>,
        accounts: Arc<dyn AccountDirectory>,
        ttl: std::time::Duration,
    ) -> Self {
        Self {
            codes,
            accounts,
            notifier: None,
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::minutes(15)),
            clock: Arc::new(Utc::now),
        }
    }

    /// Notifies the chat identity after a successful [`consume_code`](Self::consume_code).
    pub fn with_notifier(mut self, notifier: Arc<dyn ChatNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Issues a fresh 6-digit code for `identity`.
    ///
    /// Fails with [`LinkError::IdentityAlreadyLinked`] if the identity already
    /// resolves to an account. Earlier pending codes for the same identity
    /// stay valid until they expire.
    pub async fn issue_code(
        &self,
        identity: &ExternalId,
        display_name: Option<&str>,
    ) -> Result<LinkCode, CivicError> {
        if self.accounts.find_by_external_id(identity).await?.is_some() {
            return Err(LinkError::IdentityAlreadyLinked.into());
        }

        let now = (self.clock)();
        for _ in 0..MAX_CODE_DRAWS {
            let code = draw_code();
            let taken = self
                .codes
                .find_latest(&code)
                .await?
                .is_some_and(|existing| existing.is_active_at(now));
            if taken {
                continue;
            }

            let record = LinkCode {
                code,
                external_id: identity.clone(),
                external_username: display_name.map(str::to_string),
                created_at: now,
                expires_at: now + self.ttl,
                used: false,
                user_id: None,
            };
            self.codes.insert(&record).await?;
            info!(identity = %identity, expires_at = %record.expires_at, "link code issued");
            return Ok(record);
        }

        Err(LinkError::CodeSpaceExhausted.into())
    }

    /// Redeems `code` on behalf of platform user `user_id`.
    ///
    /// The code is claimed before the binding is written, so a concurrent
    /// second redemption of the same code always fails. If the binding then
    /// fails the code stays used and a new one must be issued.
    pub async fn consume_code(&self, code: &str, user_id: &str) -> Result<LinkCode, CivicError> {
        let code = code.trim();
        let record = self
            .codes
            .find_latest(code)
            .await?
            .ok_or(LinkError::UnknownCode)?;

        if record.used {
            return Err(LinkError::CodeAlreadyUsed.into());
        }
        if (self.clock)() >= record.expires_at {
            return Err(LinkError::CodeExpired.into());
        }
        if self.accounts.external_id_of(user_id).await?.is_some() {
            return Err(LinkError::AccountAlreadyLinked.into());
        }
        if self
            .accounts
            .find_by_external_id(&record.external_id)
            .await?
            .is_some()
        {
            return Err(LinkError::IdentityAlreadyLinked.into());
        }

        if !self.codes.claim(code, user_id).await? {
            return Err(LinkError::CodeAlreadyUsed.into());
        }
        self.accounts
            .bind(user_id, &record.external_id, record.external_username.as_deref())
            .await?;
        info!(identity = %record.external_id, user_id, "account linked");

        if let Some(notifier) = &self.notifier
            && let Err(e) = notifier.notify(&record.external_id, LINKED_NOTICE).await
        {
            warn!(identity = %record.external_id, error = %e, "link notification failed");
        }

        Ok(LinkCode {
            used: true,
            user_id: Some(user_id.to_string()),
            ..record
        })
    }

    /// The platform user bound to `identity`, if any.
    pub async fn resolve(&self, identity: &ExternalId) -> Result<Option<LinkedUser>, CivicError> {
        self.accounts.find_by_external_id(identity).await
    }

    pub async fn resolve_user_id(&self, identity: &ExternalId) -> Result<Option<String>, CivicError> {
        Ok(self.resolve(identity).await?.map(|user| user.user_id))
    }

    pub async fn is_linked(&self, identity: &ExternalId) -> Result<bool, CivicError> {
        Ok(self.resolve(identity).await?.is_some())
    }
}

fn draw_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::memory::{MemoryAccountDirectory, MemoryLinkCodeStore};

    struct Fixture {
        codes: Arc<MemoryLinkCodeStore>,
        accounts: Arc<MemoryAccountDirectory>,
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                codes: Arc::new(MemoryLinkCodeStore::new()),
                accounts: Arc::new(MemoryAccountDirectory::new()),
                now: Arc::new(Mutex::new(Utc::now())),
            }
        }

        fn directory(&self) -> AccountLinkDirectory {
            let now = self.now.clone();
            AccountLinkDirectory::new(
                self.codes.clone(),
                self.accounts.clone(),
                std::time::Duration::from_secs(900),
            )
            .with_clock(Arc::new(move || *now.lock().unwrap()))
        }

        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(ExternalId, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl ChatNotifier for RecordingNotifier {
        async fn notify(&self, recipient: &ExternalId, text: &str) -> Result<(), CivicError> {
            if self.fail {
                return Err(CivicError::Channel {
                    message: "blocked by user".into(),
                    source: None,
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((recipient.clone(), text.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn issued_code_is_six_digits_with_fifteen_minute_expiry() {
        let fx = Fixture::new();
        let code = fx.directory().issue_code(&"t1".into(), Some("bob")).await.unwrap();
        assert_eq!(code.code.len(), 6);
        assert!(code.code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(code.expires_at - code.created_at, Duration::minutes(15));
        assert_eq!(code.external_username.as_deref(), Some("bob"));
        assert!(!code.used);
    }

    #[tokio::test]
    async fn linked_identity_cannot_issue() {
        let fx = Fixture::new();
        let dir = fx.directory();
        dir.issue_code(&"t1".into(), Some("bob")).await.unwrap();
        dir.issue_code(&"t1".into(), Some("bob")).await.unwrap();

        fx.accounts.register_user("u1", true);
        let code = dir.issue_code(&"t1".into(), Some("bob")).await.unwrap();
        dir.consume_code(&code.code, "u1").await.unwrap();

        let err = dir.issue_code(&"t1".into(), Some("bob")).await.unwrap_err();
        assert!(matches!(err, CivicError::Link(LinkError::IdentityAlreadyLinked)));
    }

    #[tokio::test]
    async fn code_is_consumed_exactly_once() {
        let fx = Fixture::new();
        fx.accounts.register_user("u1", true);
        fx.accounts.register_user("u2", true);
        let dir = fx.directory();
        let code = dir.issue_code(&"t1".into(), None).await.unwrap();

        let consumed = dir.consume_code(&code.code, "u1").await.unwrap();
        assert!(consumed.used);
        assert_eq!(consumed.user_id.as_deref(), Some("u1"));

        let err = dir.consume_code(&code.code, "u2").await.unwrap_err();
        assert!(matches!(err, CivicError::Link(LinkError::CodeAlreadyUsed)));
    }

    #[tokio::test]
    async fn second_consume_fails_even_when_first_failed() {
        let fx = Fixture::new();
        let dir = fx.directory();
        let code = dir.issue_code(&"t1".into(), None).await.unwrap();

        // "ghost" is not a platform user, so binding fails after the claim.
        assert!(dir.consume_code(&code.code, "ghost").await.is_err());

        fx.accounts.register_user("u1", true);
        let err = dir.consume_code(&code.code, "u1").await.unwrap_err();
        assert!(matches!(err, CivicError::Link(LinkError::CodeAlreadyUsed)));
    }

    #[tokio::test]
    async fn unknown_code_is_rejected() {
        let fx = Fixture::new();
        let err = fx.directory().consume_code("000000", "u1").await.unwrap_err();
        assert!(matches!(err, CivicError::Link(LinkError::UnknownCode)));
    }

    #[tokio::test]
    async fn expired_code_is_rejected() {
        let fx = Fixture::new();
        fx.accounts.register_user("u1", true);
        let dir = fx.directory();
        let code = dir.issue_code(&"t1".into(), None).await.unwrap();

        fx.advance(Duration::minutes(15));
        let err = dir.consume_code(&code.code, "u1").await.unwrap_err();
        assert!(matches!(err, CivicError::Link(LinkError::CodeExpired)));
        assert!(!dir.is_linked(&"t1".into()).await.unwrap());
    }

    #[tokio::test]
    async fn account_with_identity_cannot_link_again() {
        let fx = Fixture::new();
        fx.accounts.insert_linked(&"t0".into(), "u1", true);
        let dir = fx.directory();
        let code = dir.issue_code(&"t1".into(), None).await.unwrap();

        let err = dir.consume_code(&code.code, "u1").await.unwrap_err();
        assert!(matches!(err, CivicError::Link(LinkError::AccountAlreadyLinked)));
        // The rejected code is still redeemable by another account.
        fx.accounts.register_user("u2", true);
        dir.consume_code(&code.code, "u2").await.unwrap();
    }

    #[tokio::test]
    async fn identity_linked_meanwhile_is_rejected() {
        let fx = Fixture::new();
        fx.accounts.register_user("u2", true);
        let dir = fx.directory();
        let code = dir.issue_code(&"t1".into(), None).await.unwrap();
        fx.accounts.insert_linked(&"t1".into(), "u1", true);

        let err = dir.consume_code(&code.code, "u2").await.unwrap_err();
        assert!(matches!(err, CivicError::Link(LinkError::IdentityAlreadyLinked)));
    }

    #[tokio::test]
    async fn notification_is_sent_after_link() {
        let fx = Fixture::new();
        fx.accounts.register_user("u1", true);
        let notifier = Arc::new(RecordingNotifier::default());
        let dir = fx.directory().with_notifier(notifier.clone());
        let code = dir.issue_code(&"t1".into(), None).await.unwrap();
        dir.consume_code(&format!(" {} ", code.code), "u1").await.unwrap();

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.as_str(), "t1");
        assert_eq!(sent[0].1, LINKED_NOTICE);
    }

    #[tokio::test]
    async fn notification_failure_is_not_raised() {
        let fx = Fixture::new();
        fx.accounts.register_user("u1", true);
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let dir = fx.directory().with_notifier(notifier);
        let code = dir.issue_code(&"t1".into(), None).await.unwrap();
        assert!(dir.consume_code(&code.code, "u1").await.is_ok());
        assert!(dir.is_linked(&"t1".into()).await.unwrap());
    }

    #[tokio::test]
    async fn lookups_are_idempotent() {
        let fx = Fixture::new();
        fx.accounts.insert_linked(&"t1".into(), "u1", false);
        let dir = fx.directory();

        let first = dir.resolve(&"t1".into()).await.unwrap();
        let second = dir.resolve(&"t1".into()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(dir.resolve_user_id(&"t1".into()).await.unwrap().as_deref(), Some("u1"));
        assert!(dir.is_linked(&"t1".into()).await.unwrap());
        assert!(!dir.is_linked(&"t2".into()).await.unwrap());
    }
}
