//! Fleet snapshots: the immutable payload handed to observers.

use std::collections::HashSet;

use h3o::CellIndex;
use serde::Serialize;

use crate::fleet::{Vehicle, VehicleStatus};
use crate::geo::Coordinate;

/// Aggregated counts at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FleetCounts {
    pub total: usize,
    pub active: usize,
    pub idle: usize,
}

impl FleetCounts {
    pub fn add_vehicle(&mut self, status: VehicleStatus) {
        self.total += 1;
        match status {
            VehicleStatus::Active => self.active += 1,
            VehicleStatus::Idle => self.idle += 1,
        }
    }
}

/// Independent copy of every vehicle, in registration order.
///
/// `version` increases by one for every snapshot taken by a service, so
/// observers can order or deduplicate deliveries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FleetSnapshot {
    pub version: u64,
    pub counts: FleetCounts,
    pub vehicles: Vec<Vehicle>,
}

impl FleetSnapshot {
    pub fn new(version: u64, vehicles: Vec<Vehicle>) -> Self {
        let mut counts = FleetCounts::default();
        for vehicle in &vehicles {
            counts.add_vehicle(vehicle.status);
        }
        Self {
            version,
            counts,
            vehicles,
        }
    }

    pub fn vehicle(&self, vehicle_id: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == vehicle_id)
    }

    pub fn active(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles
            .iter()
            .filter(|v| v.status == VehicleStatus::Active)
    }

    /// Vehicles within `k` H3 grid steps of `center` (resolution 9, ~240m cells).
    pub fn vehicles_near(&self, center: Coordinate, k: u32) -> Vec<&Vehicle> {
        let Some(origin) = center.to_cell() else {
            return Vec::new();
        };
        let disk: HashSet<CellIndex> = origin.grid_disk::<Vec<_>>(k).into_iter().collect();
        self.vehicles
            .iter()
            .filter(|v| v.cell.is_some_and(|cell| disk.contains(&cell)))
            .collect()
    }
}
