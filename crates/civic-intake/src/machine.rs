// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The report-intake state machine.
//!
//! [`IntakeMachine::advance`] consumes the current [`Session`] and one input
//! and returns a [`Transition`]: the next session (or `None` when the
//! conversation is over) plus the replies to send. Input that does not match
//! the current step is returned unchanged with no reply.

use std::sync::Arc;

use civic_core::{
    AttachmentFetcher, BoundaryCheck, ButtonAction, Category, ChatIdentity, GeoPoint, NewReport,
    PhotoVariant, Reply, ReportsService, ReverseGeocoder,
};
use civic_linking::AccountLinkDirectory;
use tracing::{debug, info, warn};

use crate::messages::{self, Destinations};
use crate::session::{Draft, PhotoSet, Place, Session};

/// One user action, already decoded from the chat event.
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeInput {
    Text(String),
    Location(GeoPoint),
    Photo(Vec<PhotoVariant>),
    /// `/done` or the Done key.
    Finish,
    Action(ButtonAction),
    Cancel,
}

/// Result of feeding one input to the machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// `None` ends the conversation and discards the session.
    pub next: Option<Session>,
    pub replies: Vec<Reply>,
    /// Toast text for the button press that caused this transition.
    pub ack: Option<String>,
}

impl Transition {
    pub fn to(next: Session, replies: Vec<Reply>) -> Self {
        Self {
            next: Some(next),
            replies,
            ack: None,
        }
    }

    /// Keeps the session as is and sends `reply`.
    pub fn stay(session: Session, reply: Reply) -> Self {
        Self::to(session, vec![reply])
    }

    /// Keeps the session and says nothing.
    pub fn ignore(session: Session) -> Self {
        Self::to(session, Vec::new())
    }

    pub fn end(reply: Reply) -> Self {
        Self {
            next: None,
            replies: vec![reply],
            ack: None,
        }
    }

    pub fn with_ack(mut self, text: impl Into<String>) -> Self {
        self.ack = Some(text.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.next.is_none()
    }
}

/// Trims and checks a title: 1 to 100 characters.
pub fn valid_title(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let len = trimmed.chars().count();
    (1..=messages::TITLE_MAX_CHARS)
        .contains(&len)
        .then(|| trimmed.to_string())
}

/// Trims and checks a description: 10 to 1000 characters.
pub fn valid_description(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let len = trimmed.chars().count();
    (messages::DESCRIPTION_MIN_CHARS..=messages::DESCRIPTION_MAX_CHARS)
        .contains(&len)
        .then(|| trimmed.to_string())
}

/// Reference of the widest variant of a shared photo.
pub fn best_variant(variants: &[PhotoVariant]) -> Option<&str> {
    variants
        .iter()
        .max_by_key(|v| v.width)
        .map(|v| v.reference.as_str())
}

/// Drives one conversation through its seven steps.
pub struct IntakeMachine {
    boundary: Arc<dyn BoundaryCheck>,
    geocoder: Arc<dyn ReverseGeocoder>,
    reports: Arc<dyn ReportsService>,
    attachments: Arc<dyn AttachmentFetcher>,
    links: Arc<AccountLinkDirectory>,
    destinations: Destinations,
}

impl IntakeMachine {
    pub fn new(
        boundary: Arc<dyn BoundaryCheck>,
        geocoder: Arc<dyn ReverseGeocoder>,
        reports: Arc<dyn ReportsService>,
        attachments: Arc<dyn AttachmentFetcher>,
        links: Arc<AccountLinkDirectory>,
        destinations: Destinations,
    ) -> Self {
        Self {
            boundary,
            geocoder,
            reports,
            attachments,
            links,
            destinations,
        }
    }

    /// A fresh session and the prompt for its first step.
    pub fn begin(&self) -> Transition {
        Transition::stay(Session::Location, messages::location_prompt())
    }

    pub async fn advance(
        &self,
        identity: &ChatIdentity,
        session: Session,
        input: IntakeInput,
    ) -> Transition {
        if input == IntakeInput::Cancel || input == IntakeInput::Action(ButtonAction::Cancel) {
            debug!(identity = %identity.id, step = %session.step(), "report cancelled");
            return Transition::end(messages::cancelled());
        }

        match (session, input) {
            (Session::Location, IntakeInput::Location(point)) => self.on_location(point).await,
            (Session::Location, IntakeInput::Text(_)) => {
                Transition::stay(Session::Location, messages::location_expected())
            }

            (Session::Title { place }, IntakeInput::Text(text)) => match valid_title(&text) {
                Some(title) => Transition::to(
                    Session::Description { place, title },
                    vec![messages::description_prompt()],
                ),
                None => Transition::stay(Session::Title { place }, messages::title_invalid()),
            },

            (Session::Description { place, title }, IntakeInput::Text(text)) => {
                match valid_description(&text) {
                    Some(description) => self.enter_category(place, title, description).await,
                    None => Transition::stay(
                        Session::Description { place, title },
                        messages::description_invalid(),
                    ),
                }
            }

            (
                Session::Category {
                    place,
                    title,
                    description,
                },
                IntakeInput::Action(ButtonAction::Category(id)),
            ) => self.on_category(place, title, description, &id).await,

            (Session::Photos { draft, photos }, IntakeInput::Photo(variants)) => {
                on_photo(draft, photos, &variants)
            }
            (Session::Photos { draft, photos }, IntakeInput::Finish) => {
                if photos.is_empty() {
                    Transition::stay(
                        Session::Photos { draft, photos },
                        messages::photos_required(),
                    )
                } else {
                    let saved = messages::photos_saved(&photos);
                    Transition::to(
                        Session::Anonymity { draft, photos },
                        vec![saved, messages::anonymity_prompt()],
                    )
                }
            }

            (Session::Anonymity { draft, photos }, IntakeInput::Action(action))
                if matches!(
                    action,
                    ButtonAction::AnonymousYes | ButtonAction::AnonymousNo
                ) =>
            {
                let anonymous = action == ButtonAction::AnonymousYes;
                let summary = messages::summary(&draft, &photos, anonymous);
                Transition::to(
                    Session::Confirm {
                        draft,
                        photos,
                        anonymous,
                    },
                    vec![summary],
                )
            }

            (
                Session::Confirm {
                    draft,
                    photos,
                    anonymous,
                },
                IntakeInput::Action(ButtonAction::ConfirmYes),
            ) => self.submit(identity, draft, photos, anonymous).await,

            (session, _) => Transition::ignore(session),
        }
    }

    async fn on_location(&self, point: GeoPoint) -> Transition {
        match self.boundary.contains(point).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(%point, "location outside boundary");
                return Transition::stay(Session::Location, messages::outside_boundary());
            }
            Err(e) => {
                warn!(error = %e, "boundary check failed");
                return Transition::stay(Session::Location, messages::boundary_unavailable());
            }
        }

        let address = self
            .geocoder
            .lookup(point)
            .await
            .filter(|a| !a.trim().is_empty());
        let place = Place { point, address };
        let prompt = messages::title_prompt(&place);
        Transition::to(Session::Title { place }, vec![prompt])
    }

    async fn enter_category(&self, place: Place, title: String, description: String) -> Transition {
        match self.reports.list_categories().await {
            Ok(categories) if categories.is_empty() => {
                warn!("platform returned no categories");
                Transition::end(messages::no_categories())
            }
            Ok(categories) => Transition::to(
                Session::Category {
                    place,
                    title,
                    description,
                },
                vec![messages::category_prompt(&categories)],
            ),
            Err(e) => {
                warn!(error = %e, "failed to list categories");
                Transition::end(messages::categories_unavailable())
            }
        }
    }

    /// The list is fetched again so a category removed since the prompt was
    /// rendered is refused.
    async fn on_category(
        &self,
        place: Place,
        title: String,
        description: String,
        id: &str,
    ) -> Transition {
        let categories = match self.reports.list_categories().await {
            Ok(categories) => categories,
            Err(e) => {
                warn!(error = %e, "failed to re-check category list");
                let session = Session::Category {
                    place,
                    title,
                    description,
                };
                return Transition::ignore(session).with_ack(messages::CATEGORY_CHECK_FAILED);
            }
        };

        let Some(category) = categories.into_iter().find(|c: &Category| c.id == id) else {
            debug!(category = id, "selected category no longer listed");
            let session = Session::Category {
                place,
                title,
                description,
            };
            return Transition::ignore(session).with_ack(messages::CATEGORY_GONE);
        };

        let prompt = messages::photos_prompt(&category);
        Transition::to(
            Session::Photos {
                draft: Draft {
                    place,
                    title,
                    description,
                    category,
                },
                photos: PhotoSet::default(),
            },
            vec![prompt],
        )
    }

    async fn submit(
        &self,
        identity: &ChatIdentity,
        draft: Draft,
        photos: PhotoSet,
        anonymous: bool,
    ) -> Transition {
        let user_id = match self.links.resolve_user_id(&identity.id).await {
            Ok(Some(user_id)) => user_id,
            Ok(None) => return Transition::end(messages::link_first(&self.destinations)),
            Err(e) => {
                warn!(identity = %identity.id, error = %e, "failed to resolve user at submit");
                return Transition::end(messages::submit_failed(&e.to_string()));
            }
        };

        let mut images = Vec::with_capacity(photos.len());
        for reference in photos.iter() {
            match self.attachments.fetch(reference).await {
                Ok(attachment) => images.push(attachment),
                Err(e) => {
                    warn!(identity = %identity.id, error = %e, "photo download failed");
                    return Transition::end(messages::submit_failed(&e.to_string()));
                }
            }
        }

        let report = NewReport {
            title: draft.title,
            description: draft.description,
            location: draft.place.point,
            address: draft.place.address,
            category_id: draft.category.id,
            is_anonymous: anonymous,
            user_id,
            images,
        };

        match self.reports.create_report(report).await {
            Ok(created) => {
                info!(identity = %identity.id, report_id = %created.id, "report submitted");
                Transition::end(messages::submitted(&self.destinations, &created))
            }
            Err(e) => {
                warn!(identity = %identity.id, error = %e, "report creation failed");
                Transition::end(messages::submit_failed(&e.to_string()))
            }
        }
    }
}

fn on_photo(draft: Draft, mut photos: PhotoSet, variants: &[PhotoVariant]) -> Transition {
    let Some(reference) = best_variant(variants) else {
        return Transition::ignore(Session::Photos { draft, photos });
    };
    match photos.try_push(reference.to_string()) {
        Some(count) => {
            Transition::stay(Session::Photos { draft, photos }, messages::photo_received(count))
        }
        None => Transition::stay(Session::Photos { draft, photos }, messages::photo_limit()),
    }
}
