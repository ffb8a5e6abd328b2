//! Visual primitives making up one loaded document on the map

use serde::Serialize;

use crate::domain::{
    geo::{Bounds, Coordinate},
    id::EntryId,
};

pub const ROUTE_COLOR: &str = "#e74c3c";
pub const ROUTE_WEIGHT: u32 = 4;
pub const ROUTE_OPACITY: f64 = 0.8;
pub const DEFAULT_MARKER_LABEL: &str = "Waypoint";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolylineStyle {
    pub color: String,
    pub weight: u32,
    pub opacity: f64,
}

impl Default for PolylineStyle {
    fn default() -> Self {
        Self {
            color: ROUTE_COLOR.to_string(),
            weight: ROUTE_WEIGHT,
            opacity: ROUTE_OPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polyline {
    pub points: Vec<Coordinate>,
    pub style: PolylineStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub position: Coordinate,
    pub label: String,
}

impl Marker {
    pub fn new(position: Coordinate, label: Option<&str>) -> Self {
        Self {
            position,
            label: label.unwrap_or(DEFAULT_MARKER_LABEL).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlaySummary {
    pub track_points: usize,
    pub waypoints: usize,
    pub distance_m: f64,
}

/// Layer group drawn for one entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
    #[serde(serialize_with = "serialize_entry_id")]
    pub entry_id: EntryId,
    pub entry_name: String,
    pub polyline: Option<Polyline>,
    pub markers: Vec<Marker>,
    /// bounds of every coordinate in the overlay, unpadded
    pub bounds: Bounds,
    pub summary: OverlaySummary,
}

fn serialize_entry_id<S: serde::Serializer>(id: &EntryId, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&id.to_hex())
}
