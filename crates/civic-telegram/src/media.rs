// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Photo downloads from Telegram servers.
//!
//! A photo reference is a Telegram file id. It is resolved with `getFile` and
//! the bytes are downloaded from the returned path. Each attempt runs under
//! the configured timeout; failed attempts are retried up to
//! `attachments.max_retries` times.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use civic_config::model::AttachmentConfig;
use civic_core::media::{filename_from_path, sniff_content_type};
use civic_core::{Attachment, AttachmentFetcher, CivicError};
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::FileId;
use tracing::{debug, warn};

/// Downloads photos shared in Telegram chats.
pub struct TelegramAttachmentFetcher {
    bot: Bot,
    timeout: Duration,
    max_retries: u32,
}

impl TelegramAttachmentFetcher {
    pub fn new(bot: Bot, config: &AttachmentConfig) -> Self {
        Self {
            bot,
            timeout: Duration::from_secs(config.download_timeout_secs),
            max_retries: config.max_retries,
        }
    }

    async fn download(&self, reference: &str) -> Result<Attachment, CivicError> {
        let file = self
            .bot
            .get_file(FileId(reference.to_string()))
            .await
            .map_err(|e| CivicError::Attachment {
                message: format!("failed to get file info: {e}"),
                source: Some(Box::new(e)),
            })?;

        let mut bytes = Vec::new();
        self.bot
            .download_file(&file.path, &mut bytes)
            .await
            .map_err(|e| CivicError::Attachment {
                message: format!("failed to download file: {e}"),
                source: Some(Box::new(e)),
            })?;

        debug!(file_id = %reference, size = bytes.len(), "downloaded photo from Telegram");
        Ok(Attachment {
            content_type: sniff_content_type(&bytes).to_string(),
            filename: filename_from_path(&file.path),
            bytes,
        })
    }
}

#[async_trait]
impl AttachmentFetcher for TelegramAttachmentFetcher {
    async fn fetch(&self, reference: &str) -> Result<Attachment, CivicError> {
        with_retries(self.max_retries, self.timeout, || self.download(reference)).await
    }
}

/// Runs `attempt` until it succeeds, giving up after `max_retries` extra
/// attempts. Each attempt is bounded by `timeout`.
pub(crate) async fn with_retries<T, F, Fut>(
    max_retries: u32,
    timeout: Duration,
    mut attempt: F,
) -> Result<T, CivicError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CivicError>>,
{
    let mut tries = 0;
    loop {
        let err = match tokio::time::timeout(timeout, attempt()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => CivicError::Timeout { duration: timeout },
        };
        if tries >= max_retries {
            return Err(err);
        }
        tries += 1;
        warn!(error = %err, attempt = tries, "photo download failed, retrying");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn failure() -> CivicError {
        CivicError::Attachment {
            message: "connection reset".into(),
            source: None,
        }
    }

    #[tokio::test]
    async fn first_success_is_returned() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retries(1, Duration::from_secs(1), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, CivicError>(7)
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_is_retried_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retries(1, Duration::from_secs(1), || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(failure())
            } else {
                Ok("bytes")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "bytes");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retries(2, Duration::from_secs(1), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(failure())
        })
        .await;
        assert!(matches!(result, Err(CivicError::Attachment { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempt_times_out() {
        let result: Result<(), _> = with_retries(0, Duration::from_secs(20), || async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(matches!(
            result,
            Err(CivicError::Timeout { duration }) if duration == Duration::from_secs(20)
        ));
    }

    #[test]
    fn fetcher_takes_limits_from_config() {
        let config = AttachmentConfig {
            download_timeout_secs: 5,
            max_retries: 3,
        };
        let fetcher = TelegramAttachmentFetcher::new(Bot::new("123456:TEST"), &config);
        assert_eq!(fetcher.timeout, Duration::from_secs(5));
        assert_eq!(fetcher.max_retries, 3);
    }
}
