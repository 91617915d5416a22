// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Boundary validation against a GeoJSON file on disk.

use std::io::Write;
use std::sync::Arc;

use civic_core::{BoundaryCheck, GeoPoint};
use civic_geo::{BoundaryValidator, GeoJsonFileBoundary};
use proptest::prelude::*;

const AREA: &str = r#"{
  "type": "Feature",
  "properties": {"name": "Kecamatan"},
  "geometry": {
    "type": "Polygon",
    "coordinates": [
      [[110.0,-7.0],[110.2,-7.0],[110.2,-6.8],[110.0,-6.8],[110.0,-7.0]],
      [[110.09,-6.91],[110.11,-6.91],[110.11,-6.89],[110.09,-6.89],[110.09,-6.91]]
    ]
  }
}"#;

fn validator() -> (tempfile::NamedTempFile, BoundaryValidator) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(AREA.as_bytes()).unwrap();
    let store = GeoJsonFileBoundary::new(file.path());
    (file, BoundaryValidator::new(Arc::new(store)))
}

#[tokio::test]
async fn inside_outside_and_hole() {
    let (_file, validator) = validator();
    validator.preload().await.unwrap();

    assert!(validator.contains(GeoPoint::new(-6.95, 110.05)).await.unwrap());
    assert!(!validator.contains(GeoPoint::new(-6.5, 110.05)).await.unwrap());
    assert!(!validator.contains(GeoPoint::new(-6.90, 110.10)).await.unwrap());
}

#[tokio::test]
async fn malformed_file_fails_preload() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{\"type\": \"Point\", \"coordinates\": [0, 0]}").unwrap();
    let validator = BoundaryValidator::new(Arc::new(GeoJsonFileBoundary::new(file.path())));
    assert!(validator.preload().await.is_err());
}

proptest! {
    #[test]
    fn points_far_outside_the_box_are_rejected(lat in 0.0f64..80.0, lon in -180.0f64..100.0) {
        let boundary = civic_geo::Boundary::from_geojson(AREA).unwrap();
        prop_assert!(!boundary.contains(GeoPoint::new(lat, lon)));
    }
}
