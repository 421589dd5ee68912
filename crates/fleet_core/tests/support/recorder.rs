use std::sync::{Arc, Mutex};

use fleet_core::{Coordinate, FleetService, FleetSnapshot, Subscription, VehicleStatus};

/// Observer that keeps every snapshot it receives.
pub struct SnapshotRecorder {
    snapshots: Arc<Mutex<Vec<Arc<FleetSnapshot>>>>,
    subscription: Subscription,
}

impl SnapshotRecorder {
    pub fn attach(service: &FleetService) -> Self {
        let snapshots = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&snapshots);
        let subscription = service.subscribe(move |snapshot: &Arc<FleetSnapshot>| {
            sink.lock().unwrap().push(Arc::clone(snapshot));
        });
        Self {
            snapshots,
            subscription,
        }
    }

    pub fn count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<Arc<FleetSnapshot>> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Arc<FleetSnapshot>> {
        self.snapshots.lock().unwrap().last().cloned()
    }

    pub fn versions(&self) -> Vec<u64> {
        self.all().iter().map(|s| s.version).collect()
    }

    /// Positions of `vehicle_id` across every recorded snapshot.
    pub fn track(&self, vehicle_id: &str) -> Vec<Coordinate> {
        self.all()
            .iter()
            .filter_map(|s| s.vehicle(vehicle_id).map(|v| v.position))
            .collect()
    }

    pub fn statuses(&self, vehicle_id: &str) -> Vec<VehicleStatus> {
        self.all()
            .iter()
            .filter_map(|s| s.vehicle(vehicle_id).map(|v| v.status))
            .collect()
    }

    pub fn detach(&self) {
        self.subscription.unsubscribe();
    }
}

pub fn assert_strictly_increasing(versions: &[u64]) {
    for pair in versions.windows(2) {
        assert!(
            pair[0] < pair[1],
            "snapshot versions went backwards: {versions:?}"
        );
    }
}
