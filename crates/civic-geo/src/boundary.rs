// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service-area containment.
//!
//! [`BoundaryValidator`] answers [`BoundaryCheck::contains`] against a
//! [`Boundary`] supplied by a [`BoundaryStore`]. The boundary is loaded on
//! first use and cached; a failed load is not cached, so the next location
//! share retries it.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use civic_core::{BoundaryCheck, CivicError, GeoPoint};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::polygon::Boundary;

/// Supplies the municipal boundary polygon.
#[async_trait]
pub trait BoundaryStore: Send + Sync {
    async fn load(&self) -> Result<Boundary, CivicError>;
}

/// Reads the boundary from a GeoJSON file on disk.
#[derive(Debug, Clone)]
pub struct GeoJsonFileBoundary {
    path: PathBuf,
}

impl GeoJsonFileBoundary {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BoundaryStore for GeoJsonFileBoundary {
    async fn load(&self) -> Result<Boundary, CivicError> {
        let document = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            CivicError::Storage {
                source: Box::new(std::io::Error::new(
                    e.kind(),
                    format!("failed to read boundary {}: {e}", self.path.display()),
                )),
            }
        })?;
        let boundary = Boundary::from_geojson(&document)?;
        info!(
            path = %self.path.display(),
            polygons = boundary.polygons().len(),
            "service area boundary loaded"
        );
        Ok(boundary)
    }
}

/// A boundary held in memory, for tests and embedded areas.
#[derive(Debug, Clone)]
pub struct StaticBoundary(pub Boundary);

#[async_trait]
impl BoundaryStore for StaticBoundary {
    async fn load(&self) -> Result<Boundary, CivicError> {
        Ok(self.0.clone())
    }
}

/// Point-in-polygon check against a lazily loaded, cached boundary.
pub struct BoundaryValidator {
    store: Arc<dyn BoundaryStore>,
    cached: OnceCell<Boundary>,
}

impl BoundaryValidator {
    pub fn new(store: Arc<dyn BoundaryStore>) -> Self {
        Self {
            store,
            cached: OnceCell::new(),
        }
    }

    /// Loads the boundary now so a broken file surfaces at startup.
    pub async fn preload(&self) -> Result<(), CivicError> {
        self.boundary().await.map(|_| ())
    }

    async fn boundary(&self) -> Result<&Boundary, CivicError> {
        self.cached.get_or_try_init(|| self.store.load()).await
    }
}

#[async_trait]
impl BoundaryCheck for BoundaryValidator {
    async fn contains(&self, point: GeoPoint) -> Result<bool, CivicError> {
        let inside = self.boundary().await?.contains(point);
        debug!(inside, "boundary check");
        Ok(inside)
    }
}

/// Accepts every point. Used when no boundary is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenBoundary;

#[async_trait]
impl BoundaryCheck for OpenBoundary {
    async fn contains(&self, _point: GeoPoint) -> Result<bool, CivicError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::polygon::{Polygon, Ring};

    fn unit_square() -> Boundary {
        Boundary::new(vec![Polygon {
            exterior: Ring::new(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]),
            holes: vec![],
        }])
    }

    struct CountingStore {
        loads: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl BoundaryStore for CountingStore {
        async fn load(&self) -> Result<Boundary, CivicError> {
            let n = self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && n == 0 {
                return Err(CivicError::Internal("transient".into()));
            }
            Ok(unit_square())
        }
    }

    #[tokio::test]
    async fn validator_answers_containment() {
        let validator = BoundaryValidator::new(Arc::new(StaticBoundary(unit_square())));
        assert!(validator.contains(GeoPoint::new(0.5, 0.5)).await.unwrap());
        assert!(!validator.contains(GeoPoint::new(2.0, 0.5)).await.unwrap());
    }

    #[tokio::test]
    async fn boundary_is_loaded_once() {
        let store = Arc::new(CountingStore {
            loads: AtomicUsize::new(0),
            fail_first: false,
        });
        let validator = BoundaryValidator::new(store.clone());
        for _ in 0..3 {
            validator.contains(GeoPoint::new(0.5, 0.5)).await.unwrap();
        }
        assert_eq!(store.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_load_is_retried() {
        let store = Arc::new(CountingStore {
            loads: AtomicUsize::new(0),
            fail_first: true,
        });
        let validator = BoundaryValidator::new(store.clone());
        assert!(validator.contains(GeoPoint::new(0.5, 0.5)).await.is_err());
        assert!(validator.contains(GeoPoint::new(0.5, 0.5)).await.unwrap());
        assert_eq!(store.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_file_is_storage_error() {
        let store = GeoJsonFileBoundary::new("/nonexistent/civic/area.geojson");
        assert!(matches!(store.load().await, Err(CivicError::Storage { .. })));
    }

    #[tokio::test]
    async fn open_boundary_accepts_everything() {
        assert!(OpenBoundary.contains(GeoPoint::new(89.0, 179.0)).await.unwrap());
    }
}
