use std::env;
use std::error::Error;
use std::fs;
use std::sync::Arc;
use std::time::Instant;

use corridor_sim::{DefaultPolicy, Simulation, Track, VehicleAttributes};

/// Scale applied to the raw track columns: x by the first element,
/// both boundary columns by the second.
const TRACK_SCALE: [f64; 2] = [1000.0, 600.0];

const NUM_VEHICLES: usize = 8;
const MAX_STEPS: usize = 1000;

/// Reads a delimited track file with columns `x, lower_y, upper_y`.
fn load_track(path: &str, scale: [f64; 2]) -> Result<Track, Box<dyn Error>> {
    let mut xs = Vec::new();
    let mut lower = Vec::new();
    let mut upper = Vec::new();
    for line in fs::read_to_string(path)?.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut columns = line.split(',');
        let mut column = || -> Result<f64, Box<dyn Error>> {
            Ok(columns.next().ok_or("track row has fewer than 3 columns")?.trim().parse()?)
        };
        xs.push(scale[0] * column()?);
        lower.push(scale[1] * column()?);
        upper.push(scale[1] * column()?);
    }
    Ok(Track::from_sequences(xs, lower, upper)?)
}

fn main() -> Result<(), Box<dyn Error>> {
    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "tracks/sample_path.csv".to_string());
    let track = Arc::new(load_track(&path, TRACK_SCALE)?);
    println!(
        "Loaded {} ({} samples, length {:.0})",
        path,
        track.samples(),
        track.length()
    );

    let mut sim = Simulation::new(track);
    for _ in 0..NUM_VEHICLES {
        sim.add_vehicle(Box::new(DefaultPolicy), &VehicleAttributes::default());
    }

    let start = Instant::now();
    let steps = sim.run(MAX_STEPS)?;
    println!("Simulated {} steps in {:?}", steps, start.elapsed());

    for vehicle in sim.iter_vehicles() {
        let utility = vehicle.utility();
        if utility.finish_step >= 0 {
            println!(
                "max x {:8.1}  finished at step {}",
                utility.max_x, utility.finish_step
            );
        } else {
            println!("max x {:8.1}  did not finish", utility.max_x);
        }
    }
    if let Some((id, best)) = sim.best_utility() {
        println!("best: {:?} with max x {:.1}", id, best.max_x);
    }

    Ok(())
}
