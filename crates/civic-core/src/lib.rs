// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Civic report-intake bot.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types shared by the intake engine and its adapters. Every external
//! collaborator the engine talks to (chat platform, municipal platform API,
//! boundary store, geocoder, attachment download) is reached through a trait
//! defined here.

pub mod error;
pub mod media;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{CivicError, LinkError};
pub use types::{
    escape_html, Attachment, ButtonAction, ButtonTarget, Category, ChatIdentity, Command,
    EventKind, ExternalId, GeoPoint, HealthStatus, InboundEvent, InlineButton, KeyboardKey,
    LinkCode, LinkedUser, Markup, MessageId, NewReport, PhotoVariant, Reply, Report,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    AccountDirectory, AttachmentFetcher, BoundaryCheck, ChannelAdapter, ChatNotifier,
    LinkCodeStore, PluginAdapter, ReportsService, ReverseGeocoder,
};
