// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `link_codes` table access.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use civic_core::{CivicError, ExternalId, LinkCode, LinkCodeStore};
use rusqlite::types::Type;
use rusqlite::OptionalExtension;

use crate::database::{map_tr_err, Database};

const SELECT_COLUMNS: &str = "SELECT code, telegram_id, telegram_username, created_at, \
     expires_at, used, user_id FROM link_codes";

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_code(row: &rusqlite::Row<'_>) -> rusqlite::Result<LinkCode> {
    Ok(LinkCode {
        code: row.get(0)?,
        external_id: ExternalId(row.get(1)?),
        external_username: row.get(2)?,
        created_at: parse_timestamp(row, 3)?,
        expires_at: parse_timestamp(row, 4)?,
        used: row.get(5)?,
        user_id: row.get(6)?,
    })
}

/// SQLite-backed [`LinkCodeStore`]. Rows are never deleted.
#[derive(Clone)]
pub struct SqliteLinkCodeStore {
    conn: tokio_rusqlite::Connection,
}

impl SqliteLinkCodeStore {
    pub fn new(db: &Database) -> Self {
        Self {
            conn: db.connection().clone(),
        }
    }

    /// Every record issued to `external_id`, newest first.
    pub async fn history(&self, external_id: &ExternalId) -> Result<Vec<LinkCode>, CivicError> {
        let external_id = external_id.as_str().to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_COLUMNS} WHERE telegram_id = ?1 ORDER BY id DESC"
                ))?;
                let rows = stmt.query_map(rusqlite::params![external_id], row_to_code)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl LinkCodeStore for SqliteLinkCodeStore {
    async fn insert(&self, code: &LinkCode) -> Result<(), CivicError> {
        let record = code.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO link_codes (code, telegram_id, telegram_username, created_at, \
                     expires_at, used, user_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    rusqlite::params![
                        record.code,
                        record.external_id.as_str(),
                        record.external_username,
                        timestamp(record.created_at),
                        timestamp(record.expires_at),
                        record.used,
                        record.user_id,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn find_latest(&self, code: &str) -> Result<Option<LinkCode>, CivicError> {
        let code = code.to_string();
        self.conn
            .call(move |conn| {
                conn.query_row(
                    &format!("{SELECT_COLUMNS} WHERE code = ?1 ORDER BY id DESC LIMIT 1"),
                    rusqlite::params![code],
                    row_to_code,
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn claim(&self, code: &str, user_id: &str) -> Result<bool, CivicError> {
        let code = code.to_string();
        let user_id = user_id.to_string();
        let used_at = timestamp(Utc::now());
        let changed = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE link_codes SET used = 1, user_id = ?2, used_at = ?3 \
                     WHERE id = (SELECT id FROM link_codes WHERE code = ?1 ORDER BY id DESC LIMIT 1) \
                     AND used = 0",
                    rusqlite::params![code, user_id, used_at],
                )
            })
            .await
            .map_err(map_tr_err)?;
        Ok(changed == 1)
    }
}
