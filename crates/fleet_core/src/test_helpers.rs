//! Test helpers for common test setup and utilities.
//!
//! Shared fixtures so unit tests, integration tests and benches use the same
//! geography: a two-stop route between Soweto and the Johannesburg CBD, and a
//! three-stop variant through Braamfontein.

use crate::fleet::{Vehicle, VehicleStatus};
use crate::geo::Coordinate;
use crate::routing::{Route, RouteMetadata, Stop};

pub const SOWETO: Coordinate = Coordinate::new(-26.2285, 27.8965);
pub const BRAAMFONTEIN: Coordinate = Coordinate::new(-26.1929, 28.0305);
pub const JOHANNESBURG_CBD: Coordinate = Coordinate::new(-26.2041, 28.0473);

/// Route `"R"`: Soweto -> Johannesburg CBD.
pub fn johannesburg_route() -> Route {
    Route::new(
        "R",
        vec![
            Stop::new("s1", "Soweto", SOWETO),
            Stop::new("s2", "Johannesburg CBD", JOHANNESBURG_CBD),
        ],
    )
    .expect("two stops")
    .with_metadata(RouteMetadata {
        name: "Soweto - CBD".to_string(),
        color: "#F97316".to_string(),
        estimated_duration_mins: Some(35),
    })
}

/// Route `"R3"`: Soweto -> Braamfontein -> Johannesburg CBD.
pub fn three_stop_route() -> Route {
    Route::new(
        "R3",
        vec![
            Stop::new("s1", "Soweto", SOWETO),
            Stop::new("s2", "Braamfontein", BRAAMFONTEIN),
            Stop::new("s3", "Johannesburg CBD", JOHANNESBURG_CBD),
        ],
    )
    .expect("three stops")
}

/// An idle vehicle at `position` with no assignment.
pub fn vehicle_at(id: &str, position: Coordinate) -> Vehicle {
    Vehicle {
        id: id.to_string(),
        label: id.to_string(),
        position,
        heading: 0.0,
        status: VehicleStatus::Idle,
        driver_id: None,
        route_id: None,
        cell: position.to_cell(),
    }
}
