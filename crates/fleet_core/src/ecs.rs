use bevy_ecs::prelude::Component;

use crate::geo::Coordinate;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Component)]
pub struct VehicleId(pub String);

/// Human-facing fleet number, e.g. `"MB-101"`.
#[derive(Debug, Clone, PartialEq, Eq, Component)]
pub struct VehicleLabel(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct GeoPosition(pub Coordinate);

/// Degrees clockwise from north, in `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct Heading(pub f64);

// Status marker components. Exactly one is present on every vehicle entity.

#[derive(Debug, Clone, Copy, Default, Component)]
pub struct Idle;

#[derive(Debug, Clone, Copy, Default, Component)]
pub struct Active;

/// Driver and route a vehicle is currently running. Present only while a
/// simulation for the vehicle is live.
#[derive(Debug, Clone, PartialEq, Eq, Component)]
pub struct Assignment {
    pub driver_id: String,
    pub route_id: String,
}
