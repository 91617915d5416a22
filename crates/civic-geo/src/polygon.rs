// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Planar polygon geometry and GeoJSON parsing.
//!
//! Coordinates are treated as planar `(longitude, latitude)` pairs, which is
//! accurate enough for a municipal service area. GeoJSON positions are
//! `[longitude, latitude]` in that order.

use civic_core::{CivicError, GeoPoint};
use serde_json::Value;

/// A closed ring of `(longitude, latitude)` vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring(Vec<(f64, f64)>);

impl Ring {
    pub fn new(vertices: Vec<(f64, f64)>) -> Self {
        Self(vertices)
    }

    /// Even-odd ray casting. Points exactly on an edge may land on either side.
    pub fn contains(&self, point: GeoPoint) -> bool {
        let (x, y) = (point.longitude, point.latitude);
        let vertices = &self.0;
        if vertices.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = vertices.len() - 1;
        for i in 0..vertices.len() {
            let (xi, yi) = vertices[i];
            let (xj, yj) = vertices[j];
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// An exterior ring with optional holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Ring,
    pub holes: Vec<Ring>,
}

impl Polygon {
    pub fn contains(&self, point: GeoPoint) -> bool {
        self.exterior.contains(point) && !self.holes.iter().any(|h| h.contains(point))
    }
}

/// The service area: the union of one or more polygons.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Boundary {
    polygons: Vec<Polygon>,
}

impl Boundary {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// `true` iff `point` lies inside any polygon of the area.
    pub fn contains(&self, point: GeoPoint) -> bool {
        self.polygons.iter().any(|p| p.contains(point))
    }

    /// Parses a GeoJSON document.
    ///
    /// Accepts a `FeatureCollection`, a `Feature`, or a bare `Polygon` or
    /// `MultiPolygon` geometry. Non-areal geometries inside a collection are
    /// skipped; a document with no polygon at all is an error.
    pub fn from_geojson(document: &str) -> Result<Self, CivicError> {
        let value: Value = serde_json::from_str(document)
            .map_err(|e| invalid(format!("boundary is not valid JSON: {e}")))?;

        let mut polygons = Vec::new();
        collect(&value, &mut polygons)?;
        if polygons.is_empty() {
            return Err(invalid("boundary contains no Polygon or MultiPolygon".into()));
        }
        Ok(Self { polygons })
    }
}

fn collect(value: &Value, out: &mut Vec<Polygon>) -> Result<(), CivicError> {
    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            let features = value
                .get("features")
                .and_then(Value::as_array)
                .ok_or_else(|| invalid("FeatureCollection without features".into()))?;
            for feature in features {
                collect(feature, out)?;
            }
        }
        Some("Feature") => {
            if let Some(geometry) = value.get("geometry").filter(|g| !g.is_null()) {
                collect(geometry, out)?;
            }
        }
        Some("Polygon") => out.push(parse_polygon(coordinates(value)?)?),
        Some("MultiPolygon") => {
            let parts = coordinates(value)?
                .as_array()
                .ok_or_else(|| invalid("MultiPolygon coordinates must be an array".into()))?;
            for part in parts {
                out.push(parse_polygon(part)?);
            }
        }
        Some(_) => {}
        None => return Err(invalid("GeoJSON object without a type".into())),
    }
    Ok(())
}

fn coordinates(geometry: &Value) -> Result<&Value, CivicError> {
    geometry
        .get("coordinates")
        .ok_or_else(|| invalid("geometry without coordinates".into()))
}

fn parse_polygon(value: &Value) -> Result<Polygon, CivicError> {
    let rings = value
        .as_array()
        .ok_or_else(|| invalid("Polygon coordinates must be an array of rings".into()))?;
    let mut rings = rings.iter().map(parse_ring);
    let exterior = rings
        .next()
        .ok_or_else(|| invalid("Polygon without an exterior ring".into()))??;
    let holes = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon { exterior, holes })
}

fn parse_ring(value: &Value) -> Result<Ring, CivicError> {
    let positions = value
        .as_array()
        .ok_or_else(|| invalid("ring must be an array of positions".into()))?;
    let vertices = positions
        .iter()
        .map(|pos| match pos.as_array().map(Vec::as_slice) {
            Some([lon, lat, ..]) => match (lon.as_f64(), lat.as_f64()) {
                (Some(lon), Some(lat)) => Ok((lon, lat)),
                _ => Err(invalid("position must hold numbers".into())),
            },
            _ => Err(invalid("position must be [longitude, latitude]".into())),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if vertices.len() < 4 {
        return Err(invalid(format!(
            "ring needs at least 4 positions, got {}",
            vertices.len()
        )));
    }
    Ok(Ring(vertices))
}

fn invalid(message: String) -> CivicError {
    CivicError::Config(message)
}
