// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory link code store and account directory.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use civic_core::{AccountDirectory, CivicError, ExternalId, LinkCode, LinkCodeStore, LinkedUser};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Append-only list of issued codes.
#[derive(Debug, Default)]
pub struct MemoryLinkCodeStore {
    records: Mutex<Vec<LinkCode>>,
}

impl MemoryLinkCodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record ever issued, oldest first.
    pub fn records(&self) -> Vec<LinkCode> {
        lock(&self.records).clone()
    }
}

#[async_trait]
impl LinkCodeStore for MemoryLinkCodeStore {
    async fn insert(&self, code: &LinkCode) -> Result<(), CivicError> {
        lock(&self.records).push(code.clone());
        Ok(())
    }

    async fn find_latest(&self, code: &str) -> Result<Option<LinkCode>, CivicError> {
        Ok(lock(&self.records)
            .iter()
            .rev()
            .find(|r| r.code == code)
            .cloned())
    }

    async fn claim(&self, code: &str, user_id: &str) -> Result<bool, CivicError> {
        let mut records = lock(&self.records);
        match records.iter_mut().rev().find(|r| r.code == code) {
            Some(record) if !record.used => {
                record.used = true;
                record.user_id = Some(user_id.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Debug, Default)]
struct Accounts {
    /// user id -> email verified
    users: HashMap<String, bool>,
    by_external: HashMap<ExternalId, String>,
    by_user: HashMap<String, ExternalId>,
}

/// Account directory holding platform users and their chat bindings.
///
/// `bind` enforces the one-to-one mapping in both directions.
#[derive(Debug, Default)]
pub struct MemoryAccountDirectory {
    accounts: Mutex<Accounts>,
    outage: Mutex<Option<String>>,
}

impl MemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a platform user. Re-registering updates the verification flag.
    pub fn register_user(&self, user_id: &str, email_verified: bool) {
        lock(&self.accounts)
            .users
            .insert(user_id.to_string(), email_verified);
    }

    /// Registers a user and binds `external_id` to it in one step.
    pub fn insert_linked(&self, external_id: &ExternalId, user_id: &str, email_verified: bool) {
        let mut accounts = lock(&self.accounts);
        accounts.users.insert(user_id.to_string(), email_verified);
        accounts
            .by_external
            .insert(external_id.clone(), user_id.to_string());
        accounts
            .by_user
            .insert(user_id.to_string(), external_id.clone());
    }

    /// Makes every lookup fail with `message` until called with `None`.
    pub fn fail_lookups(&self, message: Option<&str>) {
        *lock(&self.outage) = message.map(str::to_string);
    }

    fn check_outage(&self) -> Result<(), CivicError> {
        match lock(&self.outage).as_ref() {
            Some(message) => Err(CivicError::Upstream {
                message: message.clone(),
                source: None,
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AccountDirectory for MemoryAccountDirectory {
    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<LinkedUser>, CivicError> {
        self.check_outage()?;
        let accounts = lock(&self.accounts);
        Ok(accounts.by_external.get(external_id).map(|user_id| LinkedUser {
            user_id: user_id.clone(),
            email_verified: accounts.users.get(user_id).copied().unwrap_or(false),
        }))
    }

    async fn external_id_of(&self, user_id: &str) -> Result<Option<ExternalId>, CivicError> {
        self.check_outage()?;
        Ok(lock(&self.accounts).by_user.get(user_id).cloned())
    }

    async fn bind(
        &self,
        user_id: &str,
        external_id: &ExternalId,
        _external_username: Option<&str>,
    ) -> Result<(), CivicError> {
        let mut accounts = lock(&self.accounts);
        if !accounts.users.contains_key(user_id) {
            return Err(CivicError::Upstream {
                message: "User not found".into(),
                source: None,
            });
        }
        if accounts.by_user.contains_key(user_id) {
            return Err(civic_core::LinkError::AccountAlreadyLinked.into());
        }
        if accounts.by_external.contains_key(external_id) {
            return Err(civic_core::LinkError::IdentityAlreadyLinked.into());
        }
        accounts
            .by_external
            .insert(external_id.clone(), user_id.to_string());
        accounts
            .by_user
            .insert(user_id.to_string(), external_id.clone());
        Ok(())
    }
}
