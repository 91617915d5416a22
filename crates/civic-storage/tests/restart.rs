// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending link codes survive a database reopen.

use std::sync::Arc;
use std::time::Duration;

use civic_config::model::StorageConfig;
use civic_core::{CivicError, LinkError};
use civic_linking::{AccountLinkDirectory, MemoryAccountDirectory};
use civic_storage::{Database, SqliteLinkCodeStore};

#[tokio::test]
async fn code_issued_before_restart_is_redeemable_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        database_path: dir.path().join("civic.db").to_string_lossy().into_owned(),
        wal_mode: true,
    };
    let accounts = Arc::new(MemoryAccountDirectory::new());
    accounts.register_user("u1", true);

    let db = Database::open(&config).await.unwrap();
    let links = AccountLinkDirectory::new(
        Arc::new(SqliteLinkCodeStore::new(&db)),
        accounts.clone(),
        Duration::from_secs(900),
    );
    let issued = links.issue_code(&"4242".into(), Some("alice")).await.unwrap();
    drop(links);
    db.close().await.unwrap();

    let db = Database::open(&config).await.unwrap();
    let links = AccountLinkDirectory::new(
        Arc::new(SqliteLinkCodeStore::new(&db)),
        accounts.clone(),
        Duration::from_secs(900),
    );
    links.consume_code(&issued.code, "u1").await.unwrap();
    assert!(links.is_linked(&"4242".into()).await.unwrap());

    let err = links.consume_code(&issued.code, "u1").await.unwrap_err();
    assert!(matches!(err, CivicError::Link(LinkError::CodeAlreadyUsed)));
}
