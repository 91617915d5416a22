// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! The intake engine reaches every external system through one of these
//! traits. All of them use `#[async_trait]` for dynamic dispatch.

pub mod adapter;
pub mod attachment;
pub mod channel;
pub mod geo;
pub mod linking;
pub mod platform;

pub use adapter::PluginAdapter;
pub use attachment::AttachmentFetcher;
pub use channel::{ChannelAdapter, ChatNotifier};
pub use geo::{BoundaryCheck, ReverseGeocoder};
pub use linking::LinkCodeStore;
pub use platform::{AccountDirectory, ReportsService};
