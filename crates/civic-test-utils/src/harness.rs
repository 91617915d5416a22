// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end intake tests.
//!
//! `TestHarness` assembles a complete dispatcher with in-memory stores and
//! the fakes from [`crate::fakes`]. Events are delivered straight to
//! [`BotDispatcher::handle`], so each call returns once the event has been
//! fully processed.

use std::sync::Arc;
use std::time::Duration;

use civic_core::{
    ButtonAction, ChatIdentity, Command, EventKind, ExternalId, GeoPoint, InboundEvent,
    PhotoVariant, Reply,
};
use civic_intake::{
    BotDispatcher, Destinations, DispatcherParts, GuardChain, IntakeMachine, MemorySessionStore,
    Session, SessionStore, SlidingWindowLimiter, Step,
};
use civic_linking::{AccountLinkDirectory, MemoryAccountDirectory, MemoryLinkCodeStore};

use crate::fakes::{FakeBoundary, FakeFetcher, FakeGeocoder, FakeReports};
use crate::mock_channel::MockChannel;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    categories: Vec<(String, String)>,
    address: Option<String>,
    max_requests: usize,
    frontend_url: String,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            categories: vec![
                ("1".into(), "Roads".into()),
                ("2".into(), "Street lighting".into()),
            ],
            address: Some("Jalan Asia Afrika 8, Braga, Bandung".into()),
            max_requests: 5,
            frontend_url: "https://lapor.example.go.id".into(),
        }
    }

    pub fn with_categories(mut self, categories: &[(&str, &str)]) -> Self {
        self.categories = categories
            .iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect();
        self
    }

    /// Address returned by the geocoder; `None` simulates a lookup failure.
    pub fn with_address(mut self, address: Option<&str>) -> Self {
        self.address = address.map(str::to_string);
        self
    }

    pub fn with_rate_limit(mut self, max_requests: usize) -> Self {
        self.max_requests = max_requests;
        self
    }

    pub fn with_frontend_url(mut self, url: &str) -> Self {
        self.frontend_url = url.to_string();
        self
    }

    pub fn build(self) -> TestHarness {
        let channel = Arc::new(MockChannel::new());
        let categories: Vec<(&str, &str)> = self
            .categories
            .iter()
            .map(|(id, name)| (id.as_str(), name.as_str()))
            .collect();
        let reports = Arc::new(FakeReports::with_categories(&categories));
        let boundary = Arc::new(FakeBoundary::bandung());
        let geocoder = Arc::new(FakeGeocoder::returning(self.address.as_deref()));
        let fetcher = Arc::new(FakeFetcher::default());
        let codes = Arc::new(MemoryLinkCodeStore::new());
        let accounts = Arc::new(MemoryAccountDirectory::new());
        let sessions = Arc::new(MemorySessionStore::new());

        let link_ttl = Duration::from_secs(900);
        let links = Arc::new(
            AccountLinkDirectory::new(codes.clone(), accounts.clone(), link_ttl)
                .with_notifier(channel.clone()),
        );
        let limiter = Arc::new(SlidingWindowLimiter::new(
            self.max_requests,
            Duration::from_secs(3600),
            100,
        ));
        let destinations = Destinations::new(&self.frontend_url);
        let machine = IntakeMachine::new(
            boundary.clone(),
            geocoder,
            reports.clone(),
            fetcher.clone(),
            links.clone(),
            destinations.clone(),
        );

        let dispatcher = Arc::new(BotDispatcher::new(DispatcherParts {
            channel: channel.clone(),
            machine,
            guard: GuardChain::new(links.clone(), limiter),
            links: links.clone(),
            sessions: sessions.clone(),
            destinations,
            link_ttl,
        }));

        TestHarness {
            dispatcher,
            channel,
            reports,
            boundary,
            fetcher,
            codes,
            accounts,
            links,
            sessions,
            callbacks: std::sync::atomic::AtomicU64::new(1),
        }
    }
}

/// A fully wired dispatcher plus handles on every fake.
pub struct TestHarness {
    pub dispatcher: Arc<BotDispatcher>,
    pub channel: Arc<MockChannel>,
    pub reports: Arc<FakeReports>,
    pub boundary: Arc<FakeBoundary>,
    pub fetcher: Arc<FakeFetcher>,
    pub codes: Arc<MemoryLinkCodeStore>,
    pub accounts: Arc<MemoryAccountDirectory>,
    pub links: Arc<AccountLinkDirectory>,
    pub sessions: Arc<MemorySessionStore>,
    callbacks: std::sync::atomic::AtomicU64,
}

/// A point inside the harness boundary.
pub const INSIDE: GeoPoint = GeoPoint {
    latitude: -6.921,
    longitude: 107.607,
};

/// A point outside the harness boundary (Jakarta).
pub const OUTSIDE: GeoPoint = GeoPoint {
    latitude: -6.2,
    longitude: 106.816,
};

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn identity(id: &str) -> ChatIdentity {
        ChatIdentity {
            id: ExternalId::from(id),
            username: Some(format!("user_{id}")),
            display_name: format!("User {id}"),
        }
    }

    /// Binds `id` to platform user `u-<id>` with a verified email.
    pub fn link(&self, id: &str) {
        self.accounts
            .insert_linked(&ExternalId::from(id), &format!("u-{id}"), true);
    }

    pub async fn send(&self, id: &str, kind: EventKind) {
        self.dispatcher
            .handle(InboundEvent {
                sender: Self::identity(id),
                kind,
            })
            .await;
    }

    pub async fn command(&self, id: &str, command: Command) {
        self.send(id, EventKind::Command(command)).await;
    }

    pub async fn text(&self, id: &str, text: &str) {
        self.send(id, EventKind::Text(text.to_string())).await;
    }

    pub async fn location(&self, id: &str, point: GeoPoint) {
        self.send(id, EventKind::Location(point)).await;
    }

    /// Shares a photo with a thumbnail and a full-size variant.
    pub async fn photo(&self, id: &str, reference: &str) {
        let variants = vec![
            PhotoVariant {
                reference: format!("{reference}-thumb"),
                width: 90,
            },
            PhotoVariant {
                reference: reference.to_string(),
                width: 1280,
            },
        ];
        self.send(id, EventKind::Photo(variants)).await;
    }

    /// Presses an inline button and returns its callback id.
    pub async fn press(&self, id: &str, action: &ButtonAction) -> String {
        self.press_raw(id, &action.payload()).await
    }

    pub async fn press_raw(&self, id: &str, payload: &str) -> String {
        let n = self
            .callbacks
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let callback_id = format!("cb-{n}");
        self.send(
            id,
            EventKind::Button {
                callback_id: callback_id.clone(),
                payload: payload.to_string(),
            },
        )
        .await;
        callback_id
    }

    pub fn session(&self, id: &str) -> Option<Session> {
        self.sessions.get(&ExternalId::from(id))
    }

    pub fn step(&self, id: &str) -> Option<Step> {
        self.session(id).map(|s| s.step())
    }

    pub async fn replies(&self, id: &str) -> Vec<Reply> {
        self.channel.replies_to(&ExternalId::from(id)).await
    }

    pub async fn last_reply(&self, id: &str) -> Option<Reply> {
        self.replies(id).await.pop()
    }

    /// Toast text sent with the answer to `callback_id`.
    pub async fn answer_for(&self, callback_id: &str) -> Option<Option<String>> {
        self.channel
            .answers()
            .await
            .into_iter()
            .find(|a| a.callback_id == callback_id)
            .map(|a| a.text)
    }

    /// Puts `session` in place for `id` without going through the dispatcher.
    pub fn restore_session(&self, id: &str, session: Session) {
        self.sessions.put(&ExternalId::from(id), session);
    }

    /// Drives a linked identity from `/newreport` until it sits at `step`.
    /// Photos are skipped past with a single photo.
    pub async fn reach_step(&self, id: &str, step: Step) {
        self.command(id, Command::NewReport).await;
        if step >= Step::Title {
            self.location(id, INSIDE).await;
        }
        if step >= Step::Description {
            self.text(id, "Broken streetlight").await;
        }
        if step >= Step::Category {
            self.text(id, "The lamp at the corner has been out for a week.")
                .await;
        }
        if step >= Step::Photos {
            self.press(id, &ButtonAction::Category("2".into())).await;
        }
        if step >= Step::Anonymity {
            self.photo(id, "photo-0").await;
            self.command(id, Command::Done).await;
        }
        if step >= Step::Confirm {
            self.press(id, &ButtonAction::AnonymousNo).await;
        }
    }

    /// Drives a linked identity from `/newreport` to the Photos step.
    pub async fn reach_photos(&self, id: &str) {
        self.reach_step(id, Step::Photos).await;
    }

    /// Drives a linked identity to the Confirm step with `photos` photos.
    pub async fn reach_confirm(&self, id: &str, photos: usize, anonymous: bool) {
        self.reach_photos(id).await;
        for i in 0..photos {
            self.photo(id, &format!("photo-{i}")).await;
        }
        self.command(id, Command::Done).await;
        let choice = if anonymous {
            ButtonAction::AnonymousYes
        } else {
            ButtonAction::AnonymousNo
        };
        self.press(id, &choice).await;
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
