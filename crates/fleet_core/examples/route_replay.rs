//! Put two minibuses on Johannesburg routes and print every published snapshot.
//!
//! Run with: cargo run -p fleet_core --example route_replay

use std::sync::Arc;
use std::time::Duration;

use fleet_core::test_helpers::{johannesburg_route, three_stop_route, SOWETO};
use fleet_core::{
    build_service, FleetScenario, FleetSnapshot, SimulatorConfig, VehicleRecord,
};
use tokio::runtime::Handle;

#[tokio::main]
async fn main() {
    let scenario = FleetScenario::default()
        .with_config(
            SimulatorConfig::default()
                .with_tick_interval_ms(50)
                .with_ticks_per_segment(10),
        )
        .with_route(johannesburg_route())
        .with_route(three_stop_route())
        .with_vehicle(VehicleRecord::idle("b1", SOWETO).with_label("MB-101"))
        .with_vehicle(VehicleRecord::idle("b2", SOWETO).with_label("MB-102"));

    let (service, catalog) = match build_service(scenario, Handle::current()) {
        Ok(built) => built,
        Err(err) => {
            eprintln!("failed to build fleet service: {err}");
            std::process::exit(1);
        }
    };
    println!("--- Route replay ({} routes: {:?}) ---", catalog.len(), catalog.ids());

    let subscription = service.subscribe(|snapshot: &Arc<FleetSnapshot>| {
        let line: Vec<String> = snapshot
            .vehicles
            .iter()
            .map(|v| {
                format!(
                    "{} {:?} ({:.4}, {:.4}) {:>5.1}°",
                    v.label, v.status, v.position.lat, v.position.lng, v.heading
                )
            })
            .collect();
        println!(
            "v{:<3} active={} | {}",
            snapshot.version,
            snapshot.counts.active,
            line.join(" | ")
        );
    });

    for (driver, vehicle, route) in [("d1", "b1", "R"), ("d2", "b2", "R3")] {
        if let Err(err) = service.start_route(driver, vehicle, route) {
            eprintln!("could not start {vehicle} on {route}: {err}");
        }
    }

    while !service.running_vehicles().is_empty() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    subscription.unsubscribe();

    let snapshot = service.current_snapshot();
    println!("\nFinal positions:");
    for vehicle in &snapshot.vehicles {
        println!(
            "  {} at ({:.4}, {:.4}), {:?}",
            vehicle.label, vehicle.position.lat, vehicle.position.lng, vehicle.status
        );
    }
}
