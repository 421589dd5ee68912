//! Real-time fleet route simulator.
//!
//! Vehicles placed on a route advance stop to stop at a fixed tick rate; every
//! tick updates the fleet store and publishes an immutable [`FleetSnapshot`]
//! to subscribed observers. [`FleetService`] is the entry point.

pub mod bus;
pub mod config;
pub mod ecs;
pub mod error;
pub mod fleet;
pub mod geo;
pub mod routing;
pub mod scenario;
pub mod scheduler;
pub mod service;
pub mod simulation;
pub mod telemetry;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use bus::{NotificationBus, PublishReport, Subscription};
pub use config::SimulatorConfig;
pub use error::{FleetError, FleetResult};
pub use fleet::{FleetStore, Vehicle, VehicleRecord, VehicleStatus};
pub use geo::{bearing, distance_km, interpolate, Coordinate};
pub use routing::{Route, RouteCatalog, RouteMetadata, RouteProvider, Stop};
pub use scenario::{build_service, FleetScenario};
pub use scheduler::RouteProgress;
pub use service::FleetService;
pub use simulation::{Simulation, TickOutcome};
pub use telemetry::{FleetCounts, FleetSnapshot};
