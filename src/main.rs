use std::time::Instant;

use traffic_ring::{diagnostics, Parameters, Simulation};

fn main() {
    let params = Parameters::default();
    let mut sim = Simulation::new(params).expect("default parameters are valid");

    println!(
        "Simulating {} vehicles on a {} m ring (v_eq = {:.2} m/s)...",
        sim.params().vehicle_count,
        sim.params().ring_length,
        sim.equilibrium_velocity(),
    );

    let start = Instant::now();
    let outcome = sim.run();
    let elapsed = start.elapsed();

    let buffer = &outcome.trajectory;
    let steps = buffer.frame_count().saturating_sub(1);
    println!(
        "{} steps in {:?} ({:.0} steps/s)",
        steps,
        elapsed,
        steps as f64 / elapsed.as_secs_f64(),
    );

    if let Some(fault) = outcome.fault {
        println!("run aborted: {fault}");
        return;
    }
    for warning in sim.warnings() {
        println!("warning: {warning}");
    }

    let regions = diagnostics::jam_regions(buffer, sim.params());
    println!("{} jam region(s) detected", regions.len());
    if let Some(region) = regions.iter().max_by_key(|r| r.frame_span()) {
        let span = buffer.times()[region.last_frame] - buffer.times()[region.first_frame];
        match diagnostics::jam_wave_velocity(buffer, region) {
            Some(slope) => println!(
                "longest-lived jam: {span:.0} s, wave velocity {slope:.2} m/s"
            ),
            None => println!("longest-lived jam: {span:.0} s"),
        }
    }
}
