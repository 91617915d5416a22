// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Geographic collaborators for the intake engine.
//!
//! - [`BoundaryValidator`]: point-in-polygon containment against the
//!   municipal service area, read from a GeoJSON [`BoundaryStore`].
//! - [`NominatimGeocoder`]: best-effort reverse geocoding to a short address.

pub mod boundary;
pub mod nominatim;
pub mod polygon;

pub use boundary::{BoundaryStore, BoundaryValidator, GeoJsonFileBoundary, OpenBoundary, StaticBoundary};
pub use nominatim::{DisabledGeocoder, NominatimGeocoder};
pub use polygon::{Boundary, Polygon, Ring};
