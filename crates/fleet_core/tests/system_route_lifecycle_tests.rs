use fleet_core::test_helpers::{BRAAMFONTEIN, JOHANNESBURG_CBD, SOWETO};
use fleet_core::{bearing, SimulatorConfig, VehicleStatus};

mod support;
use support::fleet::{TestFleetBuilder, TickClock};
use support::recorder::{assert_strictly_increasing, SnapshotRecorder};

#[tokio::test(start_paused = true)]
async fn vehicle_drives_route_to_the_last_stop_then_goes_idle() {
    let (service, _routes) = TestFleetBuilder::new().build();
    let recorder = SnapshotRecorder::attach(&service);
    let clock = TickClock::start(service.config());

    service.start_route("d1", "b1", "R").expect("start");
    let started = recorder.last().expect("start publishes");
    let b1 = started.vehicle("b1").expect("b1");
    assert_eq!(b1.status, VehicleStatus::Active);
    assert_eq!(b1.position, SOWETO);
    assert_eq!(b1.driver_id.as_deref(), Some("d1"));
    assert_eq!(b1.route_id.as_deref(), Some("R"));

    clock.until_tick(19).await;
    let b1 = service.vehicle("b1").expect("b1");
    assert_eq!(b1.status, VehicleStatus::Active);
    assert_ne!(b1.position, JOHANNESBURG_CBD);

    clock.until_tick(20).await;
    let b1 = service.vehicle("b1").expect("b1");
    assert_eq!(b1.status, VehicleStatus::Idle);
    assert_eq!(b1.position, JOHANNESBURG_CBD);
    assert_eq!(b1.route_id, None);
    assert!(service.running_vehicles().is_empty());
    assert_eq!(recorder.count(), 21);

    clock.until_tick(40).await;
    assert_eq!(recorder.count(), 21, "no publishes after completion");
}

#[tokio::test(start_paused = true)]
async fn every_tick_publishes_a_newer_snapshot() {
    let (service, _routes) = TestFleetBuilder::new().build();
    let recorder = SnapshotRecorder::attach(&service);
    let clock = TickClock::start(service.config());

    service.start_route("d1", "b1", "R").expect("start");
    clock.until_tick(25).await;

    let versions = recorder.versions();
    assert_eq!(versions.len(), 21);
    assert_strictly_increasing(&versions);

    let statuses = recorder.statuses("b1");
    assert!(statuses[..20].iter().all(|s| *s == VehicleStatus::Active));
    assert_eq!(statuses[20], VehicleStatus::Idle);

    // b2 never moves.
    assert!(recorder.track("b2").iter().all(|p| *p == SOWETO));
}

#[tokio::test(start_paused = true)]
async fn heading_points_along_the_segment() {
    let (service, _routes) = TestFleetBuilder::new().build();
    let recorder = SnapshotRecorder::attach(&service);
    let clock = TickClock::start(service.config());

    service.start_route("d1", "b1", "R").expect("start");
    clock.until_tick(10).await;

    let expected = bearing(SOWETO, JOHANNESBURG_CBD);
    for snapshot in recorder.all() {
        let heading = snapshot.vehicle("b1").expect("b1").heading;
        assert!((heading - expected).abs() < 1e-9, "heading {heading}");
    }
}

#[tokio::test(start_paused = true)]
async fn three_stop_route_passes_through_the_middle_stop() {
    let (service, _routes) = TestFleetBuilder::new().build();
    let recorder = SnapshotRecorder::attach(&service);
    let clock = TickClock::start(service.config());

    service.start_route("d1", "b1", "R3").expect("start");

    clock.until_tick(20).await;
    let progress = service.route_progress("b1").expect("still running");
    assert_eq!(progress.segment_index, 1);
    assert_eq!(progress.progress, 0.0);
    assert_eq!(service.vehicle("b1").expect("b1").position, BRAAMFONTEIN);

    clock.until_tick(39).await;
    assert_eq!(
        service.vehicle("b1").expect("b1").status,
        VehicleStatus::Active
    );

    clock.until_tick(40).await;
    let b1 = service.vehicle("b1").expect("b1");
    assert_eq!(b1.status, VehicleStatus::Idle);
    assert_eq!(b1.position, JOHANNESBURG_CBD);
    assert!(recorder.track("b1").contains(&BRAAMFONTEIN));
    assert_eq!(recorder.count(), 41);
}

#[tokio::test(start_paused = true)]
async fn route_progress_tracks_ticks() {
    let (service, _routes) = TestFleetBuilder::new().build();
    let clock = TickClock::start(service.config());

    assert!(service.route_progress("b1").is_none());
    service.start_route("d7", "b1", "R").expect("start");

    clock.until_tick(5).await;
    let progress = service.route_progress("b1").expect("running");
    assert_eq!(progress.vehicle_id, "b1");
    assert_eq!(progress.driver_id, "d7");
    assert_eq!(progress.route_id, "R");
    assert_eq!(progress.segment_index, 0);
    assert!((progress.progress - 0.25).abs() < 1e-12);

    clock.until_tick(20).await;
    assert!(service.route_progress("b1").is_none());
}

#[tokio::test(start_paused = true)]
async fn tick_rate_follows_config() {
    let config = SimulatorConfig::default()
        .with_tick_interval_ms(50)
        .with_ticks_per_segment(4);
    let (service, _routes) = TestFleetBuilder::new().with_config(config).build();
    let recorder = SnapshotRecorder::attach(&service);
    let clock = TickClock::start(service.config());

    service.start_route("d1", "b1", "R").expect("start");
    clock.until_tick(3).await;
    assert_eq!(
        service.vehicle("b1").expect("b1").status,
        VehicleStatus::Active
    );
    clock.until_tick(4).await;
    assert_eq!(
        service.vehicle("b1").expect("b1").position,
        JOHANNESBURG_CBD
    );
    assert_eq!(recorder.count(), 5);
}

#[tokio::test(start_paused = true)]
async fn vehicles_run_independently() {
    let (service, _routes) = TestFleetBuilder::new().build();
    let clock = TickClock::start(service.config());

    service.start_route("d1", "b1", "R").expect("start b1");
    service.start_route("d2", "b2", "R3").expect("start b2");
    assert_eq!(service.running_vehicles(), vec!["b1", "b2"]);
    assert_eq!(service.current_snapshot().counts.active, 2);

    clock.until_tick(20).await;
    assert_eq!(service.running_vehicles(), vec!["b2"]);
    let snapshot = service.current_snapshot();
    assert_eq!(snapshot.counts.active, 1);
    assert_eq!(snapshot.counts.idle, 1);
    assert_eq!(
        snapshot.vehicle("b2").expect("b2").position,
        BRAAMFONTEIN
    );

    clock.until_tick(40).await;
    assert!(service.running_vehicles().is_empty());
}
