//! Subcommand implementations.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use fog_map_engine::simulate::DEFAULT_START;
use fog_map_engine::{ExplorationEngine, WalkSimulator};
use fog_map_geography_models::Coordinate;
use fog_map_ledger_models::{Admission, LocationEvent, VisitMode};

/// Admits every event in a JSON-lines file.
///
/// Blank lines are skipped. Lines that fail to parse are logged and
/// skipped; they do not abort the replay.
///
/// # Errors
///
/// * If the file cannot be opened or read
pub fn replay(engine: &ExplorationEngine, path: &Path, mode: VisitMode) -> std::io::Result<()> {
    let reader = BufReader::new(File::open(path)?);
    let mut admitted = 0_usize;
    let mut rejected = 0_usize;
    let mut invalid = 0_usize;
    let mut current_region = String::new();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let event: LocationEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("{}:{}: skipping invalid event: {e}", path.display(), line_number + 1);
                invalid += 1;
                continue;
            }
        };

        match engine.admit(&event, mode) {
            Admission::Admitted { .. } => admitted += 1,
            Admission::Rejected { .. } => rejected += 1,
        }

        let region = engine.region_name(event.coordinate);
        if region != current_region {
            println!("{} entered {region}", event.timestamp.to_rfc3339());
            current_region = region.to_string();
        }
    }

    println!("Replayed {admitted} admitted, {rejected} rejected, {invalid} invalid");
    Ok(())
}

/// Clears the test ledger and walks it from the given start (or the
/// default one) to the default target.
pub fn simulate(engine: &ExplorationEngine, start_lat: Option<f64>, start_lon: Option<f64>) {
    let start = Coordinate::new(
        start_lat.unwrap_or(DEFAULT_START.latitude),
        start_lon.unwrap_or(DEFAULT_START.longitude),
    );

    engine.clear(VisitMode::Test);
    engine.admit(&LocationEvent::new(start), VisitMode::Test);
    let mut current_region = engine.region_name(start).to_string();
    println!("Starting walk in {current_region}");

    let mut steps = 0_usize;
    for point in WalkSimulator::toward_default_target(start) {
        engine.admit(&LocationEvent::new(point), VisitMode::Test);
        steps += 1;

        let region = engine.region_name(point);
        if region != current_region {
            println!("Step {steps}: entered {region}");
            current_region = region.to_string();
        }
    }

    println!("Arrived after {steps} steps");
}

/// Prints coverage per borough, highest first.
pub fn report(engine: &ExplorationEngine, mode: VisitMode, borough: Option<&str>) {
    let boroughs = borough.map_or_else(|| engine.catalog().boroughs(), |b| vec![b]);

    for borough in boroughs {
        let listing = engine.refresh_group(borough, mode, true);
        if listing.is_empty() {
            println!("No neighborhoods in {borough}");
            continue;
        }

        println!();
        println!("{borough} ({mode})");
        for entry in listing {
            println!("  {:>6.2}%  {}", entry.percent, entry.name);
        }
    }
}

/// Writes the catalog as `GeoJSON`.
///
/// # Errors
///
/// * If serialization or the file write fails
pub fn export(engine: &ExplorationEngine, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let collection = engine.catalog().to_feature_collection();
    let json = serde_json::to_string_pretty(&collection)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            log::info!(
                "Wrote {} neighborhoods to {}",
                collection.features.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}
