// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state for one report in progress.
//!
//! [`Session`] is a closed sum type: each variant carries exactly the fields
//! collected so far, so a handler for a step cannot observe a field that has
//! not been validated yet.

use civic_core::{Category, GeoPoint};

/// Maximum photos attached to one report.
pub const MAX_PHOTOS: usize = 3;

/// The seven intake stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Step {
    Location,
    Title,
    Description,
    Category,
    Photos,
    Anonymity,
    Confirm,
}

impl Step {
    /// 1-based position, as shown to the user.
    pub fn number(self) -> usize {
        self as usize + 1
    }
}

/// A validated location with its best-effort address.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub point: GeoPoint,
    pub address: Option<String>,
}

impl Place {
    /// Address if known, otherwise the coordinate pair.
    pub fn label(&self) -> String {
        self.address
            .clone()
            .unwrap_or_else(|| self.point.to_string())
    }
}

/// Fields fixed once the category has been chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub place: Place,
    pub title: String,
    pub description: String,
    pub category: Category,
}

/// Photo references, at most [`MAX_PHOTOS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoSet(Vec<String>);

impl PhotoSet {
    /// Appends `reference` unless the set is full. Returns the new count.
    pub fn try_push(&mut self, reference: String) -> Option<usize> {
        if self.0.len() >= MAX_PHOTOS {
            return None;
        }
        self.0.push(reference);
        Some(self.0.len())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.0.len() >= MAX_PHOTOS
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// A report-intake conversation, one per chat identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    Location,
    Title {
        place: Place,
    },
    Description {
        place: Place,
        title: String,
    },
    Category {
        place: Place,
        title: String,
        description: String,
    },
    Photos {
        draft: Draft,
        photos: PhotoSet,
    },
    Anonymity {
        draft: Draft,
        photos: PhotoSet,
    },
    Confirm {
        draft: Draft,
        photos: PhotoSet,
        anonymous: bool,
    },
}

impl Session {
    pub fn step(&self) -> Step {
        match self {
            Self::Location => Step::Location,
            Self::Title { .. } => Step::Title,
            Self::Description { .. } => Step::Description,
            Self::Category { .. } => Step::Category,
            Self::Photos { .. } => Step::Photos,
            Self::Anonymity { .. } => Step::Anonymity,
            Self::Confirm { .. } => Step::Confirm,
        }
    }

    /// Photos collected so far; empty before the Photos step.
    pub fn photos(&self) -> Option<&PhotoSet> {
        match self {
            Self::Photos { photos, .. }
            | Self::Anonymity { photos, .. }
            | Self::Confirm { photos, .. } => Some(photos),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_ordered() {
        assert!(Step::Location < Step::Title);
        assert!(Step::Anonymity < Step::Confirm);
        assert_eq!(Step::Location.number(), 1);
        assert_eq!(Step::Confirm.number(), 7);
        assert_eq!(Step::Photos.to_string(), "photos");
    }

    #[test]
    fn photo_set_caps_at_three() {
        let mut photos = PhotoSet::default();
        assert_eq!(photos.try_push("a".into()), Some(1));
        assert_eq!(photos.try_push("b".into()), Some(2));
        assert_eq!(photos.try_push("c".into()), Some(3));
        assert!(photos.is_full());
        assert_eq!(photos.try_push("d".into()), None);
        assert_eq!(photos.iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn place_label_falls_back_to_coordinates() {
        let place = Place {
            point: GeoPoint::new(-6.2, 106.8),
            address: None,
        };
        assert_eq!(place.label(), "-6.200000, 106.800000");
    }
}
