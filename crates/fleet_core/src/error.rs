use std::fmt;

/// Errors reported by the fleet service, store and scenario loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetError {
    RouteNotFound(String),
    VehicleNotFound(String),
    RouteTooShort { route_id: String, stops: usize },
    DuplicateRoute(String),
    DuplicateVehicle(String),
    InvalidConfig(String),
    InvalidScenario(String),
    RuntimeUnavailable(String),
}

pub type FleetResult<T> = Result<T, FleetError>;

impl fmt::Display for FleetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FleetError::RouteNotFound(id) => write!(f, "route not found: {id}"),
            FleetError::VehicleNotFound(id) => write!(f, "vehicle not found: {id}"),
            FleetError::RouteTooShort { route_id, stops } => write!(
                f,
                "route {route_id} has {stops} stop(s); at least 2 are required"
            ),
            FleetError::DuplicateRoute(id) => write!(f, "duplicate route id: {id}"),
            FleetError::DuplicateVehicle(id) => write!(f, "duplicate vehicle id: {id}"),
            FleetError::InvalidConfig(msg) => write!(f, "invalid simulator config: {msg}"),
            FleetError::InvalidScenario(msg) => write!(f, "invalid scenario: {msg}"),
            FleetError::RuntimeUnavailable(msg) => write!(f, "no tokio runtime available: {msg}"),
        }
    }
}

impl std::error::Error for FleetError {}

impl From<serde_json::Error> for FleetError {
    fn from(err: serde_json::Error) -> Self {
        FleetError::InvalidScenario(err.to_string())
    }
}
