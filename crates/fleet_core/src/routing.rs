//! Route definitions and the route lookup seam.
//!
//! Routes are supplied by an external collaborator (the admin UI). The
//! simulator only needs to resolve a route id into an ordered stop list, which
//! it does through the [`RouteProvider`] trait. [`RouteCatalog`] is the
//! in-memory implementation used by scenarios and tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{FleetError, FleetResult};
use crate::geo::{distance_km, Coordinate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
}

impl Stop {
    pub fn new(id: impl Into<String>, name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coordinate,
        }
    }
}

/// Descriptive route data. Irrelevant to the simulation itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteMetadata {
    #[serde(default)]
    pub name: String,
    /// Display color, e.g. `"#F97316"`.
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub estimated_duration_mins: Option<u32>,
}

/// An ordered stop sequence; insertion order is the direction of travel.
///
/// Always holds at least two stops. Deserialized routes are validated when
/// they enter a [`RouteCatalog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    stops: Vec<Stop>,
    #[serde(flatten)]
    pub metadata: RouteMetadata,
}

impl Route {
    pub fn new(id: impl Into<String>, stops: Vec<Stop>) -> FleetResult<Self> {
        let route = Self {
            id: id.into(),
            stops,
            metadata: RouteMetadata::default(),
        };
        route.validate()?;
        Ok(route)
    }

    pub fn with_metadata(mut self, metadata: RouteMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn validate(&self) -> FleetResult<()> {
        if self.stops.len() < 2 {
            return Err(FleetError::RouteTooShort {
                route_id: self.id.clone(),
                stops: self.stops.len(),
            });
        }
        Ok(())
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Number of segments between consecutive stops.
    pub fn segment_count(&self) -> usize {
        self.stops.len().saturating_sub(1)
    }

    /// Endpoints of segment `index`, if it exists.
    pub fn segment(&self, index: usize) -> Option<(Coordinate, Coordinate)> {
        let from = self.stops.get(index)?;
        let to = self.stops.get(index + 1)?;
        Some((from.coordinate, to.coordinate))
    }

    pub fn first_stop(&self) -> Option<&Stop> {
        self.stops.first()
    }

    pub fn last_stop(&self) -> Option<&Stop> {
        self.stops.last()
    }

    /// Sum of the Haversine lengths of all segments.
    pub fn length_km(&self) -> f64 {
        self.stops
            .windows(2)
            .map(|pair| distance_km(pair[0].coordinate, pair[1].coordinate))
            .sum()
    }
}

/// Trait for route lookup backends. Implementations must be `Send + Sync` so
/// the provider can be shared with tick tasks.
pub trait RouteProvider: Send + Sync {
    /// Resolve a route id. Returns `None` if the route does not exist.
    fn route(&self, route_id: &str) -> Option<Arc<Route>>;
}

/// In-memory route table. Routes can be added and removed while simulations
/// run; a running simulation keeps the route it started with.
#[derive(Debug, Default)]
pub struct RouteCatalog {
    routes: RwLock<HashMap<String, Arc<Route>>>,
}

impl RouteCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_routes(routes: impl IntoIterator<Item = Route>) -> FleetResult<Self> {
        let catalog = Self::new();
        for route in routes {
            catalog.insert(route)?;
        }
        Ok(catalog)
    }

    /// Adds a validated route. Fails on duplicate ids.
    pub fn insert(&self, route: Route) -> FleetResult<()> {
        route.validate()?;
        let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
        if routes.contains_key(&route.id) {
            return Err(FleetError::DuplicateRoute(route.id));
        }
        routes.insert(route.id.clone(), Arc::new(route));
        Ok(())
    }

    /// Inserts or replaces a route.
    pub fn upsert(&self, route: Route) -> FleetResult<()> {
        route.validate()?;
        let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
        routes.insert(route.id.clone(), Arc::new(route));
        Ok(())
    }

    pub fn remove(&self, route_id: &str) -> Option<Arc<Route>> {
        self.routes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(route_id)
    }

    pub fn len(&self) -> usize {
        self.routes.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Route ids in sorted order.
    pub fn ids(&self) -> Vec<String> {
        let routes = self.routes.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<String> = routes.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl RouteProvider for RouteCatalog {
    fn route(&self, route_id: &str) -> Option<Arc<Route>> {
        self.routes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(route_id)
            .cloned()
    }
}
