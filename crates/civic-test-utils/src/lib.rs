// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Civic integration tests.
//!
//! Provides a mock channel, scriptable collaborator fakes and a harness that
//! wires a complete dispatcher without network or disk access.
//!
//! # Components
//!
//! - [`MockChannel`] - chat channel with event injection and reply capture
//! - [`FakeReports`], [`FakeBoundary`], [`FakeGeocoder`], [`FakeFetcher`]
//! - [`TestHarness`] - a dispatcher wired to all of the above

pub mod fakes;
pub mod harness;
pub mod mock_channel;

pub use fakes::{FakeBoundary, FakeFetcher, FakeGeocoder, FakeReports};
pub use harness::{TestHarness, TestHarnessBuilder, INSIDE, OUTSIDE};
pub use mock_channel::{ButtonAnswer, MockChannel, SentReply};
