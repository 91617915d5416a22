// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational report intake for the Civic bot.
//!
//! An inbound chat event flows through [`BotDispatcher`], which serializes
//! events per chat identity ([`lanes`]), runs the [`GuardChain`] before a
//! report may start, and feeds everything else to the [`IntakeMachine`].
//! Conversation state lives in a [`SessionStore`] as a [`Session`] value.

pub mod dispatcher;
pub mod guard;
pub mod lanes;
pub mod limiter;
pub mod machine;
pub mod messages;
pub mod session;
pub mod shutdown;
pub mod store;

pub use dispatcher::{BotDispatcher, DispatcherParts, Route};
pub use guard::{Admission, GuardChain};
pub use lanes::{LaneHandler, Lanes};
pub use limiter::{RateLimiter, SlidingWindowLimiter};
pub use machine::{IntakeInput, IntakeMachine, Transition};
pub use messages::Destinations;
pub use session::{Draft, PhotoSet, Place, Session, Step, MAX_PHOTOS};
pub use store::{MemorySessionStore, SessionStore};
