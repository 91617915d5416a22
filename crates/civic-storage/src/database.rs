// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and migrations.
//!
//! All statements run on tokio-rusqlite's single background thread, which
//! serializes writes. Share the [`Database`] rather than opening more
//! connections to the same file.

use std::path::Path;

use civic_config::model::StorageConfig;
use civic_core::CivicError;
use tracing::{debug, info};

use crate::migrations::run_migrations;

/// Convert a tokio-rusqlite error into `CivicError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> CivicError {
    CivicError::Storage {
        source: Box::new(e),
    }
}

/// Unwraps errors raised inside a `call` closure that already returns `CivicError`.
fn flatten(e: tokio_rusqlite::Error<CivicError>) -> CivicError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        _ => CivicError::Storage {
            source: "database connection closed".into(),
        },
    }
}

/// An open, migrated SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database file named in `config`.
    pub async fn open(config: &StorageConfig) -> Result<Self, CivicError> {
        let path = Path::new(&config.database_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CivicError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| CivicError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.initialize(config.wal_mode).await?;
        info!(path = %config.database_path, wal = config.wal_mode, "database opened");
        Ok(db)
    }

    /// Opens a private in-memory database with the schema applied.
    pub async fn open_in_memory() -> Result<Self, CivicError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| CivicError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.initialize(false).await?;
        Ok(db)
    }

    async fn initialize(&self, wal_mode: bool) -> Result<(), CivicError> {
        self.conn
            .call(move |conn| -> Result<(), CivicError> {
                let storage = |e: rusqlite::Error| CivicError::Storage {
                    source: Box::new(e),
                };
                if wal_mode {
                    let mode: String = conn
                        .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
                        .map_err(storage)?;
                    debug!(journal_mode = %mode, "journal mode set");
                }
                conn.execute_batch(
                    "PRAGMA synchronous = NORMAL;
                     PRAGMA foreign_keys = ON;
                     PRAGMA busy_timeout = 5000;",
                )
                .map_err(storage)?;
                run_migrations(conn)
            })
            .await
            .map_err(flatten)
    }

    /// The underlying connection, for stores built on this database.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Closes the connection, flushing the WAL.
    pub async fn close(self) -> Result<(), CivicError> {
        self.conn.close().await.map_err(map_tr_err)
    }
}
