// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routes inbound chat events to commands and the intake machine.
//!
//! The dispatcher never fails: a handler error or panic is turned into a
//! generic reply and the sender's session is discarded.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use civic_config::model::DispatcherConfig;
use civic_core::{
    ButtonAction, ChannelAdapter, ChatIdentity, CivicError, Command, EventKind, ExternalId,
    InboundEvent, LinkError, Reply,
};
use civic_linking::AccountLinkDirectory;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::guard::{Admission, GuardChain};
use crate::lanes::{LaneHandler, Lanes};
use crate::machine::{IntakeInput, IntakeMachine, Transition};
use crate::messages::{self, Destinations, CANCEL_KEY, DONE_KEY};
use crate::store::SessionStore;

/// What an inbound event asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Welcome,
    Help,
    Link,
    NewReport,
    Cancel,
    Intake(IntakeInput),
    /// Unparseable button payloads.
    Ignore,
}

impl Route {
    pub fn of(kind: &EventKind) -> Self {
        match kind {
            EventKind::Command(Command::Start) => Self::Welcome,
            EventKind::Command(Command::Help) => Self::Help,
            EventKind::Command(Command::Link) => Self::Link,
            EventKind::Command(Command::NewReport) => Self::NewReport,
            EventKind::Command(Command::Cancel) => Self::Cancel,
            EventKind::Command(Command::Done) => Self::Intake(IntakeInput::Finish),
            EventKind::Text(text) if text.trim() == CANCEL_KEY => Self::Cancel,
            EventKind::Text(text) if text.trim() == DONE_KEY => Self::Intake(IntakeInput::Finish),
            EventKind::Text(text) => Self::Intake(IntakeInput::Text(text.clone())),
            EventKind::Location(point) => Self::Intake(IntakeInput::Location(*point)),
            EventKind::Photo(variants) => Self::Intake(IntakeInput::Photo(variants.clone())),
            EventKind::Button { payload, .. } => match ButtonAction::parse(payload) {
                Some(ButtonAction::LinkAccount) => Self::Link,
                Some(ButtonAction::StartNewReport) => Self::NewReport,
                Some(ButtonAction::Cancel) => Self::Cancel,
                Some(action) => Self::Intake(IntakeInput::Action(action)),
                None => Self::Ignore,
            },
        }
    }
}

/// Collaborators the dispatcher needs, gathered for construction.
pub struct DispatcherParts {
    pub channel: Arc<dyn ChannelAdapter>,
    pub machine: IntakeMachine,
    pub guard: GuardChain,
    pub links: Arc<AccountLinkDirectory>,
    pub sessions: Arc<dyn SessionStore>,
    pub destinations: Destinations,
    /// Validity of issued link codes, shown to the user.
    pub link_ttl: Duration,
}

/// Entry point for every inbound chat event.
pub struct BotDispatcher {
    channel: Arc<dyn ChannelAdapter>,
    machine: IntakeMachine,
    guard: GuardChain,
    links: Arc<AccountLinkDirectory>,
    sessions: Arc<dyn SessionStore>,
    destinations: Destinations,
    link_ttl: Duration,
}

impl BotDispatcher {
    pub fn new(parts: DispatcherParts) -> Self {
        Self {
            channel: parts.channel,
            machine: parts.machine,
            guard: parts.guard,
            links: parts.links,
            sessions: parts.sessions,
            destinations: parts.destinations,
            link_ttl: parts.link_ttl,
        }
    }

    /// Reads events from the channel until `cancel` fires or the channel
    /// closes, then drains in-flight lanes.
    pub async fn run(
        self: Arc<Self>,
        cancel: CancellationToken,
        config: &DispatcherConfig,
    ) -> Result<(), CivicError> {
        let this = self.clone();
        let handler: LaneHandler = Arc::new(move |event| {
            let dispatcher = this.clone();
            async move { dispatcher.handle(event).await }.boxed()
        });
        let lanes = Lanes::new(
            config.mailbox_capacity,
            Duration::from_secs(config.lane_idle_secs),
            handler,
        );

        info!("dispatcher running");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping dispatcher");
                    break;
                }
                event = self.channel.receive() => match event {
                    Ok(event) => {
                        lanes.dispatch(event);
                    }
                    Err(e) => {
                        error!(error = %e, "channel receive failed, stopping dispatcher");
                        break;
                    }
                },
            }
        }

        lanes
            .shutdown(Duration::from_secs(config.drain_timeout_secs))
            .await;
        info!(active_sessions = self.sessions.active(), "dispatcher stopped");
        Ok(())
    }

    /// Handles one event to completion. Button presses are always answered.
    pub async fn handle(&self, event: InboundEvent) {
        let sender = event.sender.clone();
        let callback_id = match &event.kind {
            EventKind::Button { callback_id, .. } => Some(callback_id.clone()),
            _ => None,
        };
        let route = Route::of(&event.kind);
        debug!(identity = %sender.id, ?route, "routing event");

        let ack = match AssertUnwindSafe(self.route(&sender, route))
            .catch_unwind()
            .await
        {
            Ok(Ok(ack)) => ack,
            Ok(Err(e)) => {
                error!(identity = %sender.id, error = %e, "event handling failed");
                self.teardown(&sender.id).await;
                None
            }
            Err(_) => {
                error!(identity = %sender.id, "event handler panicked");
                self.teardown(&sender.id).await;
                None
            }
        };

        if let Some(callback_id) = callback_id {
            if let Err(e) = self.channel.answer_button(&callback_id, ack.as_deref()).await {
                warn!(identity = %sender.id, error = %e, "failed to answer button press");
            }
        }
    }

    /// Returns the toast text for the triggering button, if any.
    async fn route(
        &self,
        sender: &ChatIdentity,
        route: Route,
    ) -> Result<Option<String>, CivicError> {
        match route {
            // Commands answered alongside an active report leave it intact,
            // even when they fail.
            Route::Welcome => match self.links.is_linked(&sender.id).await {
                Ok(linked) => {
                    let reply = messages::welcome(&sender.display_name, linked);
                    self.send(&sender.id, &reply).await;
                }
                Err(e) => self.command_failed(&sender.id, "start", e).await,
            },
            Route::Help => self.send(&sender.id, &messages::help()).await,
            Route::Link => {
                if let Err(e) = self.issue_link_code(sender).await {
                    self.command_failed(&sender.id, "link", e).await;
                }
            }
            Route::NewReport => self.start_report(sender).await?,
            Route::Cancel => match self.sessions.take(&sender.id) {
                Some(session) => {
                    let transition = self
                        .machine
                        .advance(sender, session, IntakeInput::Cancel)
                        .await;
                    return Ok(self.apply(&sender.id, transition).await);
                }
                None => self.send(&sender.id, &messages::nothing_to_cancel()).await,
            },
            Route::Intake(input) => match self.sessions.take(&sender.id) {
                Some(session) => {
                    let transition = self.machine.advance(sender, session, input).await;
                    return Ok(self.apply(&sender.id, transition).await);
                }
                None => {
                    if matches!(input, IntakeInput::Text(_)) {
                        self.send(&sender.id, &messages::no_session_hint()).await;
                    }
                }
            },
            Route::Ignore => {}
        }
        Ok(None)
    }

    async fn issue_link_code(&self, sender: &ChatIdentity) -> Result<(), CivicError> {
        let name = sender.username.as_deref().unwrap_or(&sender.display_name);
        match self.links.issue_code(&sender.id, Some(name)).await {
            Ok(code) => {
                let reply = messages::link_code(&self.destinations, &code.code, self.link_ttl);
                self.send(&sender.id, &reply).await;
                Ok(())
            }
            Err(CivicError::Link(LinkError::IdentityAlreadyLinked)) => {
                self.send(&sender.id, &messages::already_linked()).await;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn start_report(&self, sender: &ChatIdentity) -> Result<(), CivicError> {
        let reply = match self.guard.admit(&sender.id).await? {
            Admission::NotLinked => messages::link_first(&self.destinations),
            Admission::EmailUnverified => messages::verify_email(),
            Admission::RateLimited { max, window } => messages::rate_limited(max, window),
            Admission::Admitted(user) => {
                if self.sessions.take(&sender.id).is_some() {
                    debug!(identity = %sender.id, "restarting report, previous draft discarded");
                }
                info!(identity = %sender.id, user_id = %user.user_id, "report started");
                self.apply(&sender.id, self.machine.begin()).await;
                return Ok(());
            }
        };
        self.send(&sender.id, &reply).await;
        Ok(())
    }

    /// Stores the next session, sends the replies and returns the toast.
    async fn apply(&self, identity: &ExternalId, transition: Transition) -> Option<String> {
        let Transition {
            next,
            replies,
            ack,
        } = transition;
        match next {
            Some(session) => self.sessions.put(identity, session),
            None => debug!(identity = %identity, "conversation ended"),
        }
        for reply in &replies {
            self.send(identity, reply).await;
        }
        ack
    }

    async fn command_failed(&self, identity: &ExternalId, command: &str, e: CivicError) {
        error!(identity = %identity, command, error = %e, "command failed");
        self.send(identity, &messages::try_again_later()).await;
    }

    async fn teardown(&self, identity: &ExternalId) {
        self.sessions.take(identity);
        self.send(identity, &messages::generic_error()).await;
    }

    async fn send(&self, to: &ExternalId, reply: &Reply) {
        if let Err(e) = self.channel.send(to, reply).await {
            warn!(identity = %to, error = %e, "failed to send reply");
        }
    }
}
