//! Fleet service: the object the session layer talks to.
//!
//! [`FleetService`] owns the fleet store, the live simulations, the
//! notification bus and the route provider. It is constructed once at process
//! start and passed to whoever needs it; independent instances do not share
//! any state.
//!
//! All store mutation happens under one mutex ([`FleetState`]). Every mutation
//! takes a snapshot with the next version and queues it in the outbox while
//! that mutex is still held, so the outbox is always in version order.
//! Delivery happens after the mutex is released, so observers may call back
//! into the service (for example `current_snapshot` or `stop_route`).
//!
//! One caller at a time drains the outbox. A caller that finds a drain already
//! in progress (another thread, or an observer publishing from inside a
//! callback) leaves its snapshot queued for that drain. Observers therefore
//! see every snapshot, each exactly once, in strictly increasing version order.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::time::Instant;

use crate::bus::{NotificationBus, Subscription};
use crate::config::SimulatorConfig;
use crate::error::{FleetError, FleetResult};
use crate::fleet::{FleetStore, Vehicle, VehicleRecord};
use crate::routing::RouteProvider;
use crate::scheduler::{run_ticker, FleetState, RouteProgress, TickResult, TickTarget};
use crate::telemetry::FleetSnapshot;

pub struct FleetService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    config: SimulatorConfig,
    routes: Arc<dyn RouteProvider>,
    state: Mutex<FleetState>,
    bus: NotificationBus<FleetSnapshot>,
    outbox: Mutex<Outbox>,
    runtime: Handle,
}

/// Snapshots waiting for delivery, oldest first.
#[derive(Default)]
struct Outbox {
    pending: VecDeque<Arc<FleetSnapshot>>,
    draining: bool,
}

impl FleetService {
    /// Builds a service whose tick tasks run on `runtime`.
    pub fn new(
        config: SimulatorConfig,
        routes: Arc<dyn RouteProvider>,
        store: FleetStore,
        runtime: Handle,
    ) -> FleetResult<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(ServiceInner {
                config,
                routes,
                state: Mutex::new(FleetState::new(store, config.ticks_per_segment)),
                bus: NotificationBus::new(),
                outbox: Mutex::new(Outbox::default()),
                runtime,
            }),
        })
    }

    /// Like [`FleetService::new`], using the tokio runtime of the calling context.
    pub fn on_current_runtime(
        config: SimulatorConfig,
        routes: Arc<dyn RouteProvider>,
        store: FleetStore,
    ) -> FleetResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|err| FleetError::RuntimeUnavailable(err.to_string()))?;
        Self::new(config, routes, store, runtime)
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.inner.config
    }

    /// Puts `vehicle_id` on `route_id`, replacing any simulation it is already running.
    ///
    /// Publishes the vehicle at the first stop. The snapshot is delivered
    /// before this returns unless a delivery is already running elsewhere
    /// (another thread, or an enclosing observer callback), which then
    /// delivers it next. Unknown ids and unusable routes leave all state
    /// untouched; the error is logged and returned for callers that want it.
    pub fn start_route(
        &self,
        driver_id: &str,
        vehicle_id: &str,
        route_id: &str,
    ) -> FleetResult<()> {
        let result = self.inner.start_route(driver_id, vehicle_id, route_id);
        match &result {
            Ok(()) => {
                log::info!("vehicle {vehicle_id} started route {route_id} (driver {driver_id})")
            }
            Err(err) => {
                log::warn!("start_route({driver_id}, {vehicle_id}, {route_id}) ignored: {err}")
            }
        }
        result
    }

    /// Takes `vehicle_id` off its route.
    ///
    /// Returns `Ok(true)` if a simulation was cancelled and `Ok(false)` (with no
    /// publish and no mutation) if none was running.
    pub fn stop_route(&self, vehicle_id: &str) -> FleetResult<bool> {
        let result = self.inner.stop_route(vehicle_id);
        match &result {
            Ok(true) => log::info!("vehicle {vehicle_id} stopped"),
            Ok(false) => log::debug!("stop_route({vehicle_id}): no running simulation"),
            Err(err) => log::warn!("stop_route({vehicle_id}) ignored: {err}"),
        }
        result
    }

    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Arc<FleetSnapshot>) + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(observer)
    }

    pub fn current_snapshot(&self) -> Arc<FleetSnapshot> {
        self.inner.lock().current_snapshot()
    }

    pub fn vehicle(&self, vehicle_id: &str) -> FleetResult<Vehicle> {
        self.inner.lock().store().get(vehicle_id)
    }

    pub fn route_progress(&self, vehicle_id: &str) -> Option<RouteProgress> {
        self.inner.lock().progress(vehicle_id)
    }

    /// Vehicles with a live simulation, sorted by id.
    pub fn running_vehicles(&self) -> Vec<String> {
        self.inner.lock().running()
    }

    /// Adds a vehicle to the fleet and publishes.
    pub fn register_vehicle(&self, record: VehicleRecord) -> FleetResult<()> {
        {
            let mut state = self.inner.lock();
            state.store_mut().register(record)?;
            self.inner.enqueue(state.next_snapshot());
        }
        self.inner.flush();
        Ok(())
    }

    /// Removes a vehicle, cancelling its simulation if one is running, and publishes.
    pub fn remove_vehicle(&self, vehicle_id: &str) -> FleetResult<Vehicle> {
        let vehicle = {
            let mut state = self.inner.lock();
            state.end(vehicle_id);
            let vehicle = state
                .store_mut()
                .remove(vehicle_id)
                .ok_or_else(|| FleetError::VehicleNotFound(vehicle_id.to_string()))?;
            self.inner.enqueue(state.next_snapshot());
            vehicle
        };
        self.inner.flush();
        Ok(vehicle)
    }

    /// Cancels every running simulation. Publishes once if anything was running.
    pub fn shutdown(&self) -> usize {
        let ended = {
            let mut state = self.inner.lock();
            let ended = state.end_all();
            if ended > 0 {
                self.inner.enqueue(state.next_snapshot());
            }
            ended
        };
        self.inner.flush();
        if ended > 0 {
            log::info!("fleet service shut down {ended} simulation(s)");
        }
        ended
    }
}

impl Drop for FleetService {
    fn drop(&mut self) {
        self.inner.lock().end_all();
    }
}

impl ServiceInner {
    fn lock(&self) -> MutexGuard<'_, FleetState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn outbox(&self) -> MutexGuard<'_, Outbox> {
        self.outbox.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn start_route(
        self: &Arc<Self>,
        driver_id: &str,
        vehicle_id: &str,
        route_id: &str,
    ) -> FleetResult<()> {
        let route = self
            .routes
            .route(route_id)
            .ok_or_else(|| FleetError::RouteNotFound(route_id.to_string()))?;

        {
            let mut state = self.lock();
            let epoch = state.begin(driver_id, vehicle_id, route)?;
            let period = self.config.tick_interval();
            let first_tick = {
                let _runtime = self.runtime.enter();
                Instant::now() + period
            };
            let task = self.runtime.spawn(run_ticker(
                Arc::downgrade(self),
                vehicle_id.to_string(),
                epoch,
                first_tick,
                period,
            ));
            state.attach_task(vehicle_id, epoch, task.abort_handle());
            self.enqueue(state.next_snapshot());
        }
        self.flush();
        Ok(())
    }

    fn stop_route(&self, vehicle_id: &str) -> FleetResult<bool> {
        {
            let mut state = self.lock();
            if !state.store().contains(vehicle_id) {
                return Err(FleetError::VehicleNotFound(vehicle_id.to_string()));
            }
            if !state.end(vehicle_id) {
                return Ok(false);
            }
            self.enqueue(state.next_snapshot());
        }
        self.flush();
        Ok(true)
    }

    /// Queues a snapshot for delivery. Call with the state lock held so queue
    /// order matches version order.
    fn enqueue(&self, snapshot: Arc<FleetSnapshot>) {
        self.outbox().pending.push_back(snapshot);
    }

    /// Delivers queued snapshots until the outbox is empty, unless another
    /// caller is already doing so.
    fn flush(&self) {
        {
            let mut outbox = self.outbox();
            if outbox.draining {
                return;
            }
            outbox.draining = true;
        }
        loop {
            let next = {
                let mut outbox = self.outbox();
                match outbox.pending.pop_front() {
                    Some(snapshot) => snapshot,
                    None => {
                        outbox.draining = false;
                        return;
                    }
                }
            };
            let report = self.bus.publish(&next);
            if report.failed > 0 {
                log::debug!(
                    "snapshot v{}: {} observer(s) failed",
                    next.version,
                    report.failed
                );
            }
        }
    }
}

impl TickTarget for ServiceInner {
    fn on_tick(&self, vehicle_id: &str, epoch: u64) -> bool {
        let result = {
            let mut state = self.lock();
            let result = state.tick(vehicle_id, epoch);
            if let TickResult::Advanced { snapshot, .. } = &result {
                self.enqueue(Arc::clone(snapshot));
            }
            result
        };
        match result {
            TickResult::Stale => {
                log::debug!("vehicle {vehicle_id}: tick for stale epoch {epoch} discarded");
                false
            }
            TickResult::Advanced { outcome, .. } => {
                let completed = outcome.is_completed();
                if completed {
                    log::info!("vehicle {vehicle_id} completed its route");
                }
                self.flush();
                !completed
            }
        }
    }
}
