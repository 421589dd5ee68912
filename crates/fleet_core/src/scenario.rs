//! Scenario setup: the route set and initial vehicle registry a service starts from.
//!
//! A scenario is loaded once at process start, either built in code or parsed
//! from JSON:
//!
//! ```json
//! {
//!   "config": { "tick_interval_ms": 100, "ticks_per_segment": 20 },
//!   "routes": [
//!     { "id": "R", "name": "Soweto - CBD", "color": "#F97316",
//!       "stops": [ { "id": "s1", "name": "Soweto", "lat": -26.2285, "lng": 27.8965 },
//!                  { "id": "s2", "name": "CBD", "lat": -26.2041, "lng": 28.0473 } ] }
//!   ],
//!   "vehicles": [ { "id": "b1", "label": "MB-101", "lat": -26.2285, "lng": 27.8965 } ]
//! }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use crate::config::SimulatorConfig;
use crate::error::FleetResult;
use crate::fleet::{FleetStore, VehicleRecord};
use crate::routing::{Route, RouteCatalog};
use crate::service::FleetService;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetScenario {
    #[serde(default)]
    pub config: SimulatorConfig,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub vehicles: Vec<VehicleRecord>,
}

impl FleetScenario {
    pub fn from_json_str(json: &str) -> FleetResult<Self> {
        let scenario: Self = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn with_config(mut self, config: SimulatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn with_vehicle(mut self, vehicle: VehicleRecord) -> Self {
        self.vehicles.push(vehicle);
        self
    }

    /// Checks the config, every route, and id uniqueness, without building anything.
    pub fn validate(&self) -> FleetResult<()> {
        self.config.validate()?;
        self.catalog()?;
        FleetStore::from_records(self.vehicles.iter().cloned())?;
        Ok(())
    }

    /// Route provider holding every scenario route.
    pub fn catalog(&self) -> FleetResult<RouteCatalog> {
        RouteCatalog::from_routes(self.routes.iter().cloned())
    }
}

/// Builds a service for `scenario`, running tick tasks on `runtime`.
///
/// Returns the route catalog alongside the service so callers can keep editing
/// routes after startup.
pub fn build_service(
    scenario: FleetScenario,
    runtime: Handle,
) -> FleetResult<(FleetService, Arc<RouteCatalog>)> {
    let catalog = Arc::new(scenario.catalog()?);
    let store = FleetStore::from_records(scenario.vehicles)?;
    let service = FleetService::new(scenario.config, catalog.clone(), store, runtime)?;
    Ok((service, catalog))
}
