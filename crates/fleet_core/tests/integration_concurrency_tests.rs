use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use fleet_core::test_helpers::SOWETO;
use fleet_core::{
    Coordinate, FleetSnapshot, Route, SimulatorConfig, Stop, VehicleRecord, VehicleStatus,
};

mod support;
use support::fleet::TestFleetBuilder;
use support::recorder::{assert_strictly_increasing, SnapshotRecorder};

fn fast_config() -> SimulatorConfig {
    SimulatorConfig::default()
        .with_tick_interval_ms(2)
        .with_ticks_per_segment(5)
}

/// Diagonal route where every interpolated point has `lat == lng`.
fn diagonal_route() -> Route {
    Route::new(
        "D",
        vec![
            Stop::new("a", "A", Coordinate::new(0.0, 0.0)),
            Stop::new("b", "B", Coordinate::new(1.0, 1.0)),
            Stop::new("c", "C", Coordinate::new(2.0, 2.0)),
        ],
    )
    .expect("diagonal route")
}

async fn wait_until_idle(service: &fleet_core::FleetService, vehicle_id: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while service.vehicle(vehicle_id).expect("vehicle").status == VehicleStatus::Active {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("vehicle finished in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_stops_cancel_exactly_once() {
    let config = SimulatorConfig::default().with_tick_interval_ms(1_000);
    let (service, _routes) = TestFleetBuilder::new().with_config(config).build();
    let service = Arc::new(service);
    let recorder = SnapshotRecorder::attach(&service);

    service.start_route("d1", "b1", "R").expect("start");
    let before = recorder.count();

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                service.stop_route("b1")
            })
        })
        .collect();
    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("stop thread"))
        .collect();

    assert_eq!(results.iter().filter(|r| **r == Ok(true)).count(), 1);
    assert_eq!(results.iter().filter(|r| **r == Ok(false)).count(), 1);
    assert_eq!(recorder.count(), before + 1);
    assert_eq!(
        service.vehicle("b1").expect("b1").status,
        VehicleStatus::Idle
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn restart_storm_leaves_a_single_simulation() {
    let (service, _routes) = TestFleetBuilder::new().with_config(fast_config()).build();
    let service = Arc::new(service);
    let recorder = SnapshotRecorder::attach(&service);

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let route = if i % 2 == 0 { "R" } else { "R3" };
                service.start_route(&format!("d{i}"), "b1", route)
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("start thread").expect("start");
    }
    assert_eq!(service.running_vehicles(), vec!["b1"]);

    wait_until_idle(&service, "b1").await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    let settled = recorder.count();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(recorder.count(), settled, "a superseded task kept ticking");
    assert!(service.running_vehicles().is_empty());
    assert_strictly_increasing(&recorder.versions());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_a_torn_position() {
    let (service, _routes) = TestFleetBuilder::new()
        .with_config(fast_config())
        .with_route(diagonal_route())
        .with_vehicle(VehicleRecord::idle("d", Coordinate::new(0.0, 0.0)))
        .build();
    let service = Arc::new(service);

    let torn = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&torn);
    let _subscription = service.subscribe(move |snapshot: &Arc<FleetSnapshot>| {
        if let Some(vehicle) = snapshot.vehicle("d") {
            if vehicle.position.lat != vehicle.position.lng {
                flag.store(true, Ordering::SeqCst);
            }
        }
    });

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let service = Arc::clone(&service);
        let done = Arc::clone(&done);
        let torn = Arc::clone(&torn);
        thread::spawn(move || {
            while !done.load(Ordering::SeqCst) {
                let vehicle = service.vehicle("d").expect("d");
                if vehicle.position.lat != vehicle.position.lng {
                    torn.store(true, Ordering::SeqCst);
                }
            }
        })
    };

    service.start_route("d1", "d", "D").expect("start");
    wait_until_idle(&service, "d").await;
    done.store(true, Ordering::SeqCst);
    reader.join().expect("reader");

    assert!(!torn.load(Ordering::SeqCst));
    assert_eq!(
        service.vehicle("d").expect("d").position,
        Coordinate::new(2.0, 2.0)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropping_the_service_ends_tick_tasks() {
    let (service, _routes) = TestFleetBuilder::new()
        .with_config(SimulatorConfig::default().with_tick_interval_ms(5))
        .build();
    let recorder = SnapshotRecorder::attach(&service);

    service.start_route("d1", "b1", "R").expect("start");
    drop(service);
    let count = recorder.count();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(recorder.count(), count);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_snapshot_is_delivered_once_in_version_order() {
    const VEHICLES: usize = 8;
    const TICKS_PER_SEGMENT: u32 = 25;
    let config = SimulatorConfig::default()
        .with_tick_interval_ms(2)
        .with_ticks_per_segment(TICKS_PER_SEGMENT);
    let mut builder = TestFleetBuilder::new().with_config(config);
    for i in 3..=VEHICLES {
        builder = builder.with_vehicle(VehicleRecord::idle(format!("b{i}"), SOWETO));
    }
    let (service, _routes) = builder.build();
    let service = Arc::new(service);

    // A slow renderer ahead of the recorder widens the window for reordering.
    let _slow = service.subscribe(|snapshot: &Arc<FleetSnapshot>| {
        if snapshot.version % 2 == 1 {
            thread::sleep(Duration::from_millis(1));
        }
    });
    let recorder = SnapshotRecorder::attach(&service);

    let starters: Vec<_> = (1..=VEHICLES)
        .map(|i| {
            let service = Arc::clone(&service);
            thread::spawn(move || service.start_route(&format!("d{i}"), &format!("b{i}"), "R"))
        })
        .collect();
    for starter in starters {
        starter.join().expect("start thread").expect("start");
    }

    // One start publish plus one publish per tick, for every vehicle.
    let expected = VEHICLES * (1 + TICKS_PER_SEGMENT as usize);
    tokio::time::timeout(Duration::from_secs(10), async {
        while recorder.count() < expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("all snapshots delivered in time");
    tokio::time::sleep(Duration::from_millis(20)).await;

    let versions = recorder.versions();
    assert_eq!(versions, (1..=expected as u64).collect::<Vec<_>>());
    assert!(service.running_vehicles().is_empty());
}
