//! Drainage report for a synthetic two-valley DEM.
//!
//! Runs the full routing chain (flow direction, outlets, distances,
//! accumulation, watersheds) and prints a short summary.
//!
//! ```text
//! cargo run -p hydrotrace-algorithms --example drainage_report -- --verbose
//! ```

use hydrotrace_algorithms::prelude::*;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

/// Two valleys running south, separated by a ridge on the middle column.
fn valley_dem(rows: usize, cols: usize, cell_size: f64) -> Result<Raster<f64>> {
    let mut dem = Raster::new(rows, cols);
    dem.set_metadata(RasterMetadata::new(
        0.0,
        rows as f64 * cell_size,
        cell_size,
        -cell_size,
        cols,
        rows,
    ))?;
    let ridge = cols as f64 / 2.0;
    let quarter = cols as f64 / 4.0;
    for row in 0..rows {
        for col in 0..cols {
            let across = ((col as f64 - ridge).abs() - quarter).abs();
            let along = (rows - row) as f64 * 0.5;
            dem.set(row, col, across + along)?;
        }
    }
    Ok(dem)
}

fn main() -> Result<()> {
    let verbose = std::env::args().any(|a| a == "--verbose" || a == "-v");
    setup_logging(verbose);

    let dem = valley_dem(200, 120, 30.0)?;
    let fdir = flow_direction(&dem)?;

    let outlets = find_outlets(&fdir)?;
    let flag = CancelFlag::new();
    let distances = distance_to_outlet(&fdir, DistanceParams::default(), &flag)?;
    let accumulation = flow_accumulation(&fdir)?;
    let watersheds = all_watersheds(&fdir)?;
    let large = watersheds_with_threshold(
        &watersheds,
        &outlets.mask,
        &accumulation,
        WatershedThresholdParams { threshold: 500.0 },
    )?;

    let longest = distances
        .distances
        .cells()
        .iter()
        .copied()
        .filter(|d| d.is_finite())
        .fold(0.0_f64, f64::max);
    let kept: std::collections::BTreeSet<i32> =
        large.cells().iter().copied().filter(|&id| id != NO_WATERSHED).collect();

    println!("Grid:             {} x {}", dem.rows(), dem.cols());
    println!("Outlets:          {}", outlets.count);
    println!("Longest path:     {:.1} m", longest);
    println!("Progress:         {}%", flag.percent());
    println!("Watersheds >= 500 cells: {}", kept.len());

    Ok(())
}
