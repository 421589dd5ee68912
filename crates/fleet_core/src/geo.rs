//! Geometry: bearings, interpolation and distances between WGS84 coordinates.
//!
//! This module provides:
//!
//! - **Coordinate**: a latitude/longitude pair in degrees
//! - **bearing**: initial great-circle bearing, normalized into `[0, 360)`
//! - **interpolate**: planar linear interpolation along a segment
//! - **distance_km**: Haversine distance
//!
//! Interpolation is planar, not geodesic. Route segments are short (a few km at
//! most), where the error is well below GPS noise.

use h3o::{CellIndex, LatLng, Resolution};
use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Resolution used when bucketing vehicles into H3 cells (~240m cell size).
pub const VEHICLE_CELL_RESOLUTION: Resolution = Resolution::Nine;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// H3 cell containing this coordinate, or `None` for non-finite input.
    pub fn to_cell(self) -> Option<CellIndex> {
        LatLng::new(self.lat, self.lng)
            .ok()
            .map(|ll| ll.to_cell(VEHICLE_CELL_RESOLUTION))
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

/// Initial great-circle bearing from `from` to `to`, in degrees clockwise from north.
///
/// Identical points yield `0.0`.
pub fn bearing(from: Coordinate, to: Coordinate) -> f64 {
    if from == to {
        return 0.0;
    }
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let dlng = (to.lng - from.lng).to_radians();

    let y = dlng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();
    let degrees = y.atan2(x).to_degrees();

    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Linear interpolation of latitude and longitude independently.
///
/// `t == 0.0` returns `from` and `t == 1.0` returns `to`, bit for bit.
pub fn interpolate(from: Coordinate, to: Coordinate, t: f64) -> Coordinate {
    if t <= 0.0 {
        return from;
    }
    if t >= 1.0 {
        return to;
    }
    Coordinate {
        lat: from.lat + (to.lat - from.lat) * t,
        lng: from.lng + (to.lng - from.lng) * t,
    }
}

/// Haversine distance in kilometres.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lon1) = (a.lat.to_radians(), a.lng.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lng.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}
