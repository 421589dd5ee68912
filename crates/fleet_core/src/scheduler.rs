//! Simulation scheduler: per-vehicle state machine and tick tasks.
//!
//! Each vehicle is either Idle (no simulation) or Running (one live
//! [`Simulation`] plus one tokio tick task). [`FleetState`] owns the fleet store
//! together with the table of live simulations so that both change under one
//! lock.
//!
//! Every simulation gets an epoch from a counter that only grows. Starting a
//! route for a vehicle that is already running replaces the table entry and
//! aborts the old task; stopping removes the entry. A tick is applied only if
//! its epoch still matches the table entry, so a superseded task that was
//! already waiting for the lock cannot mutate anything once the replacing call
//! has returned.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::{FleetError, FleetResult};
use crate::fleet::FleetStore;
use crate::routing::Route;
use crate::simulation::{Simulation, TickOutcome};
use crate::telemetry::FleetSnapshot;

/// Read-only view of a running simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteProgress {
    pub vehicle_id: String,
    pub driver_id: String,
    pub route_id: String,
    pub segment_index: usize,
    pub progress: f64,
    pub epoch: u64,
}

struct SimulationSlot {
    epoch: u64,
    driver_id: String,
    simulation: Simulation,
    task: Option<AbortHandle>,
}

impl SimulationSlot {
    fn cancel(self) {
        if let Some(task) = self.task {
            task.abort();
        }
    }
}

/// Result of applying one tick under the state lock.
#[derive(Debug)]
pub enum TickResult {
    /// The simulation was superseded, stopped, or its vehicle is gone. The task must end.
    Stale,
    Advanced {
        outcome: TickOutcome,
        snapshot: Arc<FleetSnapshot>,
    },
}

/// Fleet store plus live simulations, guarded as one unit by the service.
pub struct FleetState {
    store: FleetStore,
    simulations: HashMap<String, SimulationSlot>,
    ticks_per_segment: u32,
    next_epoch: u64,
    version: u64,
}

impl FleetState {
    pub fn new(store: FleetStore, ticks_per_segment: u32) -> Self {
        Self {
            store,
            simulations: HashMap::new(),
            ticks_per_segment,
            next_epoch: 0,
            version: 0,
        }
    }

    pub fn store(&self) -> &FleetStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut FleetStore {
        &mut self.store
    }

    /// Snapshot of the current state at the current version.
    pub fn current_snapshot(&self) -> Arc<FleetSnapshot> {
        Arc::new(self.store.snapshot(self.version))
    }

    /// Snapshot tagged with a fresh version, for publishing after a mutation.
    pub fn next_snapshot(&mut self) -> Arc<FleetSnapshot> {
        self.version += 1;
        self.current_snapshot()
    }

    /// Installs a fresh simulation for `vehicle_id`, cancelling any previous one.
    ///
    /// Places the vehicle on the first stop facing the second, marks it active
    /// and records the assignment. Returns the new epoch.
    pub fn begin(
        &mut self,
        driver_id: &str,
        vehicle_id: &str,
        route: Arc<Route>,
    ) -> FleetResult<u64> {
        if !self.store.contains(vehicle_id) {
            return Err(FleetError::VehicleNotFound(vehicle_id.to_string()));
        }
        route.validate()?;

        if let Some(previous) = self.simulations.remove(vehicle_id) {
            log::debug!(
                "vehicle {vehicle_id}: superseding simulation epoch {}",
                previous.epoch
            );
            previous.cancel();
        }

        self.next_epoch += 1;
        let epoch = self.next_epoch;
        let simulation = Simulation::new(Arc::clone(&route), self.ticks_per_segment);
        let (position, heading) = simulation.start();

        self.store.activate(vehicle_id);
        self.store.assign(vehicle_id, driver_id, &route.id);
        self.store.set_position(vehicle_id, position, heading);
        self.simulations.insert(
            vehicle_id.to_string(),
            SimulationSlot {
                epoch,
                driver_id: driver_id.to_string(),
                simulation,
                task: None,
            },
        );
        Ok(epoch)
    }

    /// Records the tick task for a simulation. If the simulation was replaced in
    /// the meantime the task is aborted instead.
    pub fn attach_task(&mut self, vehicle_id: &str, epoch: u64, task: AbortHandle) -> bool {
        match self.simulations.get_mut(vehicle_id) {
            Some(slot) if slot.epoch == epoch => {
                slot.task = Some(task);
                true
            }
            _ => {
                task.abort();
                false
            }
        }
    }

    /// Cancels the simulation for `vehicle_id` and marks the vehicle idle.
    /// Returns `false` without touching anything if no simulation was running.
    pub fn end(&mut self, vehicle_id: &str) -> bool {
        let Some(slot) = self.simulations.remove(vehicle_id) else {
            return false;
        };
        slot.cancel();
        self.store.deactivate(vehicle_id);
        true
    }

    /// Cancels every simulation. Returns how many were running.
    pub fn end_all(&mut self) -> usize {
        let vehicles: Vec<String> = self.simulations.keys().cloned().collect();
        for vehicle_id in &vehicles {
            self.end(vehicle_id);
        }
        vehicles.len()
    }

    /// Applies one tick for the simulation identified by `(vehicle_id, epoch)`.
    pub fn tick(&mut self, vehicle_id: &str, epoch: u64) -> TickResult {
        let is_current = self
            .simulations
            .get(vehicle_id)
            .is_some_and(|slot| slot.epoch == epoch);
        if !is_current {
            return TickResult::Stale;
        }
        if !self.store.is_active(vehicle_id) {
            // Deactivated or removed behind the scheduler's back.
            self.simulations.remove(vehicle_id);
            return TickResult::Stale;
        }

        let Some(slot) = self.simulations.get_mut(vehicle_id) else {
            return TickResult::Stale;
        };
        let outcome = slot.simulation.advance();
        self.store
            .set_position(vehicle_id, outcome.position(), outcome.heading());

        if outcome.is_completed() {
            self.simulations.remove(vehicle_id);
            self.store.deactivate(vehicle_id);
        }

        TickResult::Advanced {
            outcome,
            snapshot: self.next_snapshot(),
        }
    }

    pub fn progress(&self, vehicle_id: &str) -> Option<RouteProgress> {
        let slot = self.simulations.get(vehicle_id)?;
        Some(RouteProgress {
            vehicle_id: vehicle_id.to_string(),
            driver_id: slot.driver_id.clone(),
            route_id: slot.simulation.route().id.clone(),
            segment_index: slot.simulation.segment_index(),
            progress: slot.simulation.progress(),
            epoch: slot.epoch,
        })
    }

    /// Vehicles with a live simulation, sorted by id.
    pub fn running(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.simulations.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_running(&self, vehicle_id: &str) -> bool {
        self.simulations.contains_key(vehicle_id)
    }
}

/// Receiver of tick events from a tick task.
pub trait TickTarget: Send + Sync + 'static {
    /// Applies one tick. Returns `false` when the simulation has ended and the
    /// task should stop.
    fn on_tick(&self, vehicle_id: &str, epoch: u64) -> bool;
}

/// Drives one simulation: ticks at `first_tick` and every `period` after it,
/// until the target reports the simulation ended or the target is dropped.
///
/// Each tick runs to completion before the next one is awaited, so ticks of
/// one vehicle never overlap.
pub async fn run_ticker<T: TickTarget>(
    target: Weak<T>,
    vehicle_id: String,
    epoch: u64,
    first_tick: Instant,
    period: Duration,
) {
    let mut interval = interval_at(first_tick, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let keep_going = match target.upgrade() {
            Some(target) => target.on_tick(&vehicle_id, epoch),
            None => false,
        };
        if !keep_going {
            break;
        }
    }
}
