// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Civic bot.
//!
//! Link codes outlive bot restarts: a citizen who received a code just before
//! a redeploy can still redeem it. Access goes through `tokio-rusqlite` and
//! the schema is managed by embedded refinery migrations.

pub mod database;
pub mod link_codes;
pub mod migrations;

pub use database::Database;
pub use link_codes::SqliteLinkCodeStore;
