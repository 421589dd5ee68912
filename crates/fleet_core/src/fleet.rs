//! Fleet store: the authoritative vehicle set.
//!
//! Every vehicle is an entity in a private `bevy_ecs` [`World`] carrying
//! [`VehicleId`], [`VehicleLabel`], [`GeoPosition`], [`Heading`] and exactly one
//! status marker ([`Idle`] or [`Active`]). The active set is the set of
//! entities with the [`Active`] marker. A [`VehicleIndex`] resource maps ids to
//! entities and remembers registration order.
//!
//! The store is not internally synchronized; the service keeps it behind a
//! single mutex so readers never see a half-applied tick.

use std::collections::HashMap;

use bevy_ecs::prelude::{Entity, Resource, World};
use h3o::CellIndex;
use serde::{Deserialize, Serialize};

use crate::ecs::{Active, Assignment, GeoPosition, Heading, Idle, VehicleId, VehicleLabel};
use crate::error::{FleetError, FleetResult};
use crate::geo::Coordinate;
use crate::telemetry::FleetSnapshot;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    #[default]
    Idle,
    Active,
}

/// Initial registry entry for a vehicle, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(flatten)]
    pub position: Coordinate,
    #[serde(default)]
    pub heading: f64,
    #[serde(default)]
    pub status: VehicleStatus,
}

impl VehicleRecord {
    pub fn idle(id: impl Into<String>, position: Coordinate) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            position,
            heading: 0.0,
            status: VehicleStatus::Idle,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Owned copy of one vehicle's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vehicle {
    pub id: String,
    pub label: String,
    pub position: Coordinate,
    pub heading: f64,
    pub status: VehicleStatus,
    /// Set while the vehicle is running a route.
    pub driver_id: Option<String>,
    pub route_id: Option<String>,
    #[serde(skip)]
    pub cell: Option<CellIndex>,
}

/// Id -> entity mapping plus registration order.
#[derive(Debug, Default, Resource)]
pub struct VehicleIndex {
    by_id: HashMap<String, Entity>,
    order: Vec<Entity>,
}

pub struct FleetStore {
    world: World,
}

impl Default for FleetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetStore {
    pub fn new() -> Self {
        let mut world = World::new();
        world.insert_resource(VehicleIndex::default());
        Self { world }
    }

    pub fn from_records(records: impl IntoIterator<Item = VehicleRecord>) -> FleetResult<Self> {
        let mut store = Self::new();
        for record in records {
            store.register(record)?;
        }
        Ok(store)
    }

    pub fn register(&mut self, record: VehicleRecord) -> FleetResult<()> {
        if self.entity(&record.id).is_some() {
            return Err(FleetError::DuplicateVehicle(record.id));
        }
        let heading = record.heading.rem_euclid(360.0);
        let label = if record.label.is_empty() {
            record.id.clone()
        } else {
            record.label
        };
        let mut entity = self.world.spawn((
            VehicleId(record.id.clone()),
            VehicleLabel(label),
            GeoPosition(record.position),
            Heading(if heading.is_finite() && heading < 360.0 {
                heading
            } else {
                0.0
            }),
        ));
        match record.status {
            VehicleStatus::Idle => entity.insert(Idle),
            VehicleStatus::Active => entity.insert(Active),
        };
        let id = entity.id();

        let mut index = self.world.resource_mut::<VehicleIndex>();
        index.by_id.insert(record.id, id);
        index.order.push(id);
        Ok(())
    }

    /// Removes a vehicle. Running simulations for it end on their next tick.
    pub fn remove(&mut self, vehicle_id: &str) -> Option<Vehicle> {
        let entity = self.entity(vehicle_id)?;
        let vehicle = self.vehicle(entity);
        let mut index = self.world.resource_mut::<VehicleIndex>();
        index.by_id.remove(vehicle_id);
        index.order.retain(|e| *e != entity);
        self.world.despawn(entity);
        vehicle
    }

    pub fn get(&self, vehicle_id: &str) -> FleetResult<Vehicle> {
        self.entity(vehicle_id)
            .and_then(|entity| self.vehicle(entity))
            .ok_or_else(|| FleetError::VehicleNotFound(vehicle_id.to_string()))
    }

    pub fn contains(&self, vehicle_id: &str) -> bool {
        self.entity(vehicle_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.world.resource::<VehicleIndex>().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Moves a vehicle. Returns `false` (and does nothing) if it no longer exists.
    pub fn set_position(&mut self, vehicle_id: &str, position: Coordinate, heading: f64) -> bool {
        let Some(entity) = self.entity(vehicle_id) else {
            return false;
        };
        let Some(mut entity) = self.world.get_entity_mut(entity) else {
            return false;
        };
        entity.insert((GeoPosition(position), Heading(heading)));
        true
    }

    /// Marks a vehicle active. Returns whether its status changed.
    pub fn activate(&mut self, vehicle_id: &str) -> bool {
        let Some(entity) = self.entity(vehicle_id) else {
            return false;
        };
        if self.world.get::<Active>(entity).is_some() {
            return false;
        }
        let Some(mut entity) = self.world.get_entity_mut(entity) else {
            return false;
        };
        entity.remove::<Idle>();
        entity.insert(Active);
        true
    }

    /// Marks a vehicle idle and clears its assignment. Returns whether its status changed.
    pub fn deactivate(&mut self, vehicle_id: &str) -> bool {
        let Some(entity) = self.entity(vehicle_id) else {
            return false;
        };
        let was_active = self.world.get::<Active>(entity).is_some();
        let Some(mut entity) = self.world.get_entity_mut(entity) else {
            return false;
        };
        entity.remove::<(Active, Assignment)>();
        entity.insert(Idle);
        was_active
    }

    pub fn assign(&mut self, vehicle_id: &str, driver_id: &str, route_id: &str) -> bool {
        let Some(entity) = self.entity(vehicle_id) else {
            return false;
        };
        let Some(mut entity) = self.world.get_entity_mut(entity) else {
            return false;
        };
        entity.insert(Assignment {
            driver_id: driver_id.to_string(),
            route_id: route_id.to_string(),
        });
        true
    }

    /// Drops the driver/route assignment without changing status.
    pub fn clear_assignment(&mut self, vehicle_id: &str) -> bool {
        let Some(entity) = self.entity(vehicle_id) else {
            return false;
        };
        let Some(mut entity) = self.world.get_entity_mut(entity) else {
            return false;
        };
        entity.take::<Assignment>().is_some()
    }

    pub fn is_active(&self, vehicle_id: &str) -> bool {
        self.entity(vehicle_id)
            .is_some_and(|entity| self.world.get::<Active>(entity).is_some())
    }

    /// Ids of active vehicles, in registration order.
    pub fn active_ids(&self) -> Vec<String> {
        let index = self.world.resource::<VehicleIndex>();
        index
            .order
            .iter()
            .filter(|entity| self.world.get::<Active>(**entity).is_some())
            .filter_map(|entity| self.world.get::<VehicleId>(*entity))
            .map(|id| id.0.clone())
            .collect()
    }

    /// Deep copy of every vehicle, in registration order.
    pub fn snapshot(&self, version: u64) -> FleetSnapshot {
        let index = self.world.resource::<VehicleIndex>();
        let vehicles = index
            .order
            .iter()
            .filter_map(|entity| self.vehicle(*entity))
            .collect();
        FleetSnapshot::new(version, vehicles)
    }

    fn entity(&self, vehicle_id: &str) -> Option<Entity> {
        self.world
            .resource::<VehicleIndex>()
            .by_id
            .get(vehicle_id)
            .copied()
    }

    fn vehicle(&self, entity: Entity) -> Option<Vehicle> {
        let id = self.world.get::<VehicleId>(entity)?;
        let position = self.world.get::<GeoPosition>(entity)?.0;
        let heading = self.world.get::<Heading>(entity)?.0;
        let label = self
            .world
            .get::<VehicleLabel>(entity)
            .map(|l| l.0.clone())
            .unwrap_or_default();
        let status = if self.world.get::<Active>(entity).is_some() {
            VehicleStatus::Active
        } else {
            VehicleStatus::Idle
        };
        let assignment = self.world.get::<Assignment>(entity);
        Some(Vehicle {
            id: id.0.clone(),
            label,
            position,
            heading,
            status,
            driver_id: assignment.map(|a| a.driver_id.clone()),
            route_id: assignment.map(|a| a.route_id.clone()),
            cell: position.to_cell(),
        })
    }
}
