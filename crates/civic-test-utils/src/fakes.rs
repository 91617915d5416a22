// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable fakes for the intake engine's collaborators.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use civic_core::{
    Attachment, AttachmentFetcher, BoundaryCheck, Category, CivicError, GeoPoint, NewReport,
    Report, ReportsService, ReverseGeocoder,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn upstream(message: &str) -> CivicError {
    CivicError::Upstream {
        message: message.to_string(),
        source: None,
    }
}

/// Reports service with a configurable category list.
///
/// Created reports are recorded and get sequential ids `r-1`, `r-2`, ...
#[derive(Debug, Default)]
pub struct FakeReports {
    categories: Mutex<Vec<Category>>,
    categories_error: Mutex<Option<String>>,
    create_error: Mutex<Option<String>>,
    created: Mutex<Vec<NewReport>>,
}

impl FakeReports {
    pub fn with_categories(categories: &[(&str, &str)]) -> Self {
        let fake = Self::default();
        fake.set_categories(categories);
        fake
    }

    pub fn set_categories(&self, categories: &[(&str, &str)]) {
        *lock(&self.categories) = categories
            .iter()
            .map(|(id, name)| Category {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect();
    }

    /// Makes `list_categories` fail with `message`, or succeed again with `None`.
    pub fn fail_categories(&self, message: Option<&str>) {
        *lock(&self.categories_error) = message.map(str::to_string);
    }

    /// Makes `create_report` fail with `message`, or succeed again with `None`.
    pub fn fail_create(&self, message: Option<&str>) {
        *lock(&self.create_error) = message.map(str::to_string);
    }

    pub fn created(&self) -> Vec<NewReport> {
        lock(&self.created).clone()
    }
}

#[async_trait]
impl ReportsService for FakeReports {
    async fn create_report(&self, report: NewReport) -> Result<Report, CivicError> {
        if let Some(message) = lock(&self.create_error).as_deref() {
            return Err(upstream(message));
        }
        let mut created = lock(&self.created);
        created.push(report);
        Ok(Report {
            id: format!("r-{}", created.len()),
            status: "PENDING".into(),
        })
    }

    async fn list_categories(&self) -> Result<Vec<Category>, CivicError> {
        if let Some(message) = lock(&self.categories_error).as_deref() {
            return Err(upstream(message));
        }
        Ok(lock(&self.categories).clone())
    }
}

/// Axis-aligned box boundary, or a forced failure.
#[derive(Debug)]
pub struct FakeBoundary {
    south: f64,
    west: f64,
    north: f64,
    east: f64,
    error: Mutex<Option<String>>,
}

impl FakeBoundary {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
            error: Mutex::new(None),
        }
    }

    /// A box around Bandung: latitude -7.0..-6.8, longitude 107.5..107.8.
    pub fn bandung() -> Self {
        Self::new(-7.0, 107.5, -6.8, 107.8)
    }

    pub fn fail(&self, message: Option<&str>) {
        *lock(&self.error) = message.map(str::to_string);
    }
}

#[async_trait]
impl BoundaryCheck for FakeBoundary {
    async fn contains(&self, point: GeoPoint) -> Result<bool, CivicError> {
        if let Some(message) = lock(&self.error).as_deref() {
            return Err(CivicError::Storage {
                source: message.to_string().into(),
            });
        }
        Ok((self.south..=self.north).contains(&point.latitude)
            && (self.west..=self.east).contains(&point.longitude))
    }
}

/// Geocoder returning a fixed answer.
#[derive(Debug, Default)]
pub struct FakeGeocoder {
    address: Mutex<Option<String>>,
}

impl FakeGeocoder {
    pub fn returning(address: Option<&str>) -> Self {
        Self {
            address: Mutex::new(address.map(str::to_string)),
        }
    }
}

#[async_trait]
impl ReverseGeocoder for FakeGeocoder {
    async fn lookup(&self, _point: GeoPoint) -> Option<String> {
        lock(&self.address).clone()
    }
}

/// Fetcher producing a small JPEG for every reference except the failing ones.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    failing: Mutex<HashSet<String>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn fail_on(&self, reference: &str) {
        lock(&self.failing).insert(reference.to_string());
    }

    pub fn fetched(&self) -> Vec<String> {
        lock(&self.fetched).clone()
    }
}

#[async_trait]
impl AttachmentFetcher for FakeFetcher {
    async fn fetch(&self, reference: &str) -> Result<Attachment, CivicError> {
        if lock(&self.failing).contains(reference) {
            return Err(CivicError::Attachment {
                message: format!("download of {reference} failed"),
                source: None,
            });
        }
        lock(&self.fetched).push(reference.to_string());
        Ok(Attachment {
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
            content_type: "image/jpeg".into(),
            filename: format!("{reference}.jpg"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn boundary_box_is_inclusive() {
        let boundary = FakeBoundary::bandung();
        assert!(boundary.contains(GeoPoint::new(-6.9, 107.6)).await.unwrap());
        assert!(boundary.contains(GeoPoint::new(-7.0, 107.5)).await.unwrap());
        assert!(!boundary.contains(GeoPoint::new(-6.2, 106.8)).await.unwrap());
    }

    #[tokio::test]
    async fn reports_get_sequential_ids() {
        let reports = FakeReports::default();
        let report = NewReport {
            title: "t".into(),
            description: "d".into(),
            location: GeoPoint::new(0.0, 0.0),
            address: None,
            category_id: "1".into(),
            is_anonymous: false,
            user_id: "u".into(),
            images: Vec::new(),
        };
        assert_eq!(reports.create_report(report.clone()).await.unwrap().id, "r-1");
        assert_eq!(reports.create_report(report).await.unwrap().id, "r-2");
        reports.fail_create(Some("Category not found"));
        let err = reports
            .create_report(reports.created()[0].clone())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Category not found");
    }
}
