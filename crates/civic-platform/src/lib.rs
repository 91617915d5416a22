// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client for the municipal reporting platform's REST API.
//!
//! [`PlatformClient`] implements the Reports and Categories contract
//! ([`civic_core::ReportsService`]) and the chat-account directory
//! ([`civic_core::AccountDirectory`]) the intake engine consumes.

pub mod client;
pub mod types;

pub use client::PlatformClient;
