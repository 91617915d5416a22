// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account linking for the Civic bot.
//!
//! A citizen proves control of a chat identity by typing a short-lived,
//! single-use code into the web application. [`AccountLinkDirectory`] issues
//! and consumes those codes and answers "which platform user is this chat
//! identity" for the rest of the engine.

pub mod directory;
pub mod memory;

pub use directory::{AccountLinkDirectory, Clock, LINKED_NOTICE, MAX_CODE_DRAWS};
pub use memory::{MemoryAccountDirectory, MemoryLinkCodeStore};
