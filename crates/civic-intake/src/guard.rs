// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gates run before a report conversation may start.

use std::sync::Arc;
use std::time::Duration;

use civic_core::{CivicError, ExternalId, LinkedUser};
use civic_linking::AccountLinkDirectory;
use tracing::debug;

use crate::limiter::RateLimiter;

/// Outcome of the guard chain for one start attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admitted(LinkedUser),
    NotLinked,
    EmailUnverified,
    RateLimited { max: usize, window: Duration },
}

/// Link check followed by the rate limiter. Neither gate touches sessions.
pub struct GuardChain {
    links: Arc<AccountLinkDirectory>,
    limiter: Arc<dyn RateLimiter>,
}

impl GuardChain {
    pub fn new(links: Arc<AccountLinkDirectory>, limiter: Arc<dyn RateLimiter>) -> Self {
        Self { links, limiter }
    }

    /// Runs both gates in order. Only an admitted attempt consumes a
    /// rate-limit slot.
    pub async fn admit(&self, identity: &ExternalId) -> Result<Admission, CivicError> {
        let user = match self.links.resolve(identity).await? {
            None => return Ok(Admission::NotLinked),
            Some(user) if !user.email_verified => return Ok(Admission::EmailUnverified),
            Some(user) => user,
        };

        if !self.limiter.allow(identity.as_str()) {
            debug!(identity = %identity, "report start rate limited");
            return Ok(Admission::RateLimited {
                max: self.limiter.max_requests(),
                window: self.limiter.window(),
            });
        }

        Ok(Admission::Admitted(user))
    }
}
