use std::sync::Arc;
use std::time::Duration;

use fleet_core::test_helpers::{johannesburg_route, three_stop_route, SOWETO};
use fleet_core::{
    FleetService, FleetStore, Route, RouteCatalog, SimulatorConfig, VehicleRecord,
};
use tokio::runtime::Handle;
use tokio::time::{sleep_until, Instant};

/// Builds a service over the Johannesburg fixtures.
///
/// Defaults: routes `R` and `R3`, idle vehicles `b1` and `b2` at Soweto,
/// default config (100 ms ticks, 20 ticks per segment).
pub struct TestFleetBuilder {
    config: SimulatorConfig,
    routes: Vec<Route>,
    vehicles: Vec<VehicleRecord>,
}

impl Default for TestFleetBuilder {
    fn default() -> Self {
        Self {
            config: SimulatorConfig::default(),
            routes: vec![johannesburg_route(), three_stop_route()],
            vehicles: vec![
                VehicleRecord::idle("b1", SOWETO),
                VehicleRecord::idle("b2", SOWETO),
            ],
        }
    }
}

impl TestFleetBuilder {
    pub fn new() -> Self {
        Self::default()
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

    /// Must be called inside a tokio runtime.
    pub fn build(self) -> (FleetService, Arc<RouteCatalog>) {
        let catalog = Arc::new(RouteCatalog::from_routes(self.routes).expect("fixture routes"));
        let store = FleetStore::from_records(self.vehicles).expect("fixture vehicles");
        let service = FleetService::new(self.config, catalog.clone(), store, Handle::current())
            .expect("fixture config");
        (service, catalog)
    }
}

/// Tick-aligned clock for paused-time tests.
///
/// Capture it right before `start_route`; `until_tick(n)` then sleeps to the
/// midpoint between tick `n` and tick `n + 1`, so exactly `n` ticks have fired.
pub struct TickClock {
    origin: Instant,
    period: Duration,
}

impl TickClock {
    pub fn start(config: &SimulatorConfig) -> Self {
        Self {
            origin: Instant::now(),
            period: config.tick_interval(),
        }
    }

    pub async fn until_tick(&self, tick: u32) {
        sleep_until(self.origin + self.period * tick + self.period / 2).await;
    }
}
