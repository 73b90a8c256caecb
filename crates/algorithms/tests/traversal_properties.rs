//! Whole-pass properties of the D8 traversal on synthetic grids.
//!
//! Every grid here is built in memory: either direction codes written
//! directly, or a small DEM routed with `flow_direction`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use approx::assert_relative_eq;
use hydrotrace_algorithms::hydrology::{
    all_watersheds, d8, distance_to_outlet, find_outlets, flow_direction, Direction,
    DistanceParams, Downstream, FlowDirectionGrid, OutletDistance, Terminus, TraceContext,
    NOT_PROCESSED_YET, OUTLET, PIT,
};
use hydrotrace_core::{ProgressMonitor, Raster, RasterMetadata, Unmonitored};

const E: f32 = Direction::East as u8 as f32;

fn code(d: Direction) -> f32 {
    d.code() as f32
}

/// Two noisy bowls side by side, with a no-data hole between them.
fn two_bowls(rows: usize, cols: usize) -> Raster<f64> {
    let mut dem = Raster::new(rows, cols);
    dem.set_metadata(RasterMetadata::new(0.0, 0.0, 30.0, -30.0, cols, rows))
        .unwrap();
    let centers = [(rows / 2, cols / 4), (rows / 2, 3 * cols / 4)];
    for row in 0..rows {
        for col in 0..cols {
            let dist = centers
                .iter()
                .map(|&(r, c)| (row as f64 - r as f64).hypot(col as f64 - c as f64))
                .fold(f64::INFINITY, f64::min);
            let noise = ((row * 7 + col * 13) % 17) as f64 * 0.01;
            dem.set(row, col, dist + noise).unwrap();
        }
    }
    dem.set(0, cols / 2, f64::NAN).unwrap();
    dem.set(1, cols / 2, f64::NAN).unwrap();
    dem
}

/// Every cell points at the center of an odd `n x n` grid.
fn star(n: usize) -> FlowDirectionGrid {
    let c = (n / 2) as isize;
    let mut fdir = Raster::new(n, n);
    for row in 0..n {
        for col in 0..n {
            let offset = ((c - col as isize).signum(), (c - row as isize).signum());
            let value = Direction::ALL
                .iter()
                .find(|d| d.offset() == offset)
                .map_or(PIT, |&d| code(d));
            fdir.set(row, col, value).unwrap();
        }
    }
    fdir
}

/// Follow the chain from `index` to its last valid cell.
fn terminal_of(codes: &[f32], cols: usize, rows: usize, mut index: usize) -> usize {
    loop {
        match d8::decode(codes, cols, rows, index) {
            Downstream::Flows { index: next, .. } if !codes[next].is_nan() => index = next,
            _ => return index,
        }
    }
}

#[test]
fn every_valid_cell_reaches_exactly_one_outlet() {
    let fdir = flow_direction(&two_bowls(24, 40)).unwrap();
    let outlets = find_outlets(&fdir).unwrap();
    let codes = fdir.cells();
    let mask = outlets.mask.cells();
    let (rows, cols) = fdir.shape();

    let mut reached = HashSet::new();
    for index in 0..codes.len() {
        if codes[index].is_nan() {
            assert_eq!(mask[index], 0);
            continue;
        }
        let terminal = terminal_of(&codes, cols, rows, index);
        assert_eq!(mask[terminal], OUTLET, "chain from {index} ends on a non-outlet");
        if terminal != index {
            assert_ne!(mask[index], OUTLET);
        }
        reached.insert(terminal);
    }

    assert_eq!(reached.len(), outlets.count);
    assert_eq!(mask.iter().filter(|&&m| m == OUTLET).count(), outlets.count);
}

#[test]
fn outlets_are_deterministic() {
    let fdir = flow_direction(&two_bowls(16, 24)).unwrap();
    let a = find_outlets(&fdir).unwrap();
    let b = find_outlets(&fdir).unwrap();

    assert_eq!(a.count, b.count);
    assert_eq!(a.mask.cells(), b.mask.cells());
    assert_eq!(a.traced_cells, b.traced_cells);
}

#[test]
fn star_network_resolves_each_cell_once() {
    let n = 31;
    let fdir = star(n);

    let outlets = find_outlets(&fdir).unwrap();
    assert_eq!(outlets.count, 1);
    assert_eq!(outlets.mask.get(n / 2, n / 2).unwrap(), OUTLET);
    assert_eq!(outlets.traced_cells, n * n);

    let params = DistanceParams {
        skip_border: false,
        ..Default::default()
    };
    let distances = distance_to_outlet(&fdir, params, &Unmonitored).unwrap();
    assert_eq!(distances.traced_cells, n * n);

    let labels = all_watersheds(&fdir).unwrap();
    assert!(labels.cells().iter().all(|&id| id == 1));
}

#[test]
fn distance_grows_by_one_step_per_link() {
    let fdir = flow_direction(&two_bowls(20, 32)).unwrap();
    let meta = *fdir.metadata();
    let params = DistanceParams {
        skip_border: false,
        outlet_distance: OutletDistance::Zero,
        ..Default::default()
    };
    let result = distance_to_outlet(&fdir, params, &Unmonitored).unwrap();
    let distances = result.distances.cells();
    let codes = fdir.cells();

    let mut links = 0;
    for index in 0..codes.len() {
        if let Downstream::Flows { index: next, direction } =
            d8::decode(&codes, meta.n_cols, meta.n_rows, index)
        {
            if codes[next].is_nan() {
                continue;
            }
            assert_relative_eq!(
                distances[index],
                distances[next] + direction.step_length(&meta),
                epsilon = 1e-9
            );
            links += 1;
        }
    }
    assert!(links > 0);
}

fn single_pit(pixel: f64) -> FlowDirectionGrid {
    use Direction::*;
    let codes = vec![
        code(SouthEast), code(South), code(SouthWest),
        code(East), PIT, code(West),
        code(NorthEast), code(North), code(NorthWest),
    ];
    Raster::from_vec(codes, RasterMetadata::new(0.0, 0.0, pixel, -pixel, 3, 3)).unwrap()
}

#[test]
fn single_pit_scenario() {
    let pixel = 10.0;
    let fdir = single_pit(pixel);

    let outlets = find_outlets(&fdir).unwrap();
    assert_eq!(outlets.count, 1);
    let expected_mask: [u8; 9] = [0, 0, 0, 0, 1, 0, 0, 0, 0];
    assert_eq!(&*outlets.mask.cells(), &expected_mask[..]);

    let params = DistanceParams {
        skip_border: false,
        ..Default::default()
    };
    let d = distance_to_outlet(&fdir, params.clone(), &Unmonitored).unwrap().distances;
    for (row, col) in [(0, 1), (1, 0), (1, 2), (2, 1)] {
        assert_relative_eq!(d.get(row, col).unwrap(), pixel);
    }
    for (row, col) in [(0, 0), (0, 2), (2, 0), (2, 2)] {
        assert_relative_eq!(d.get(row, col).unwrap(), pixel * 2f64.sqrt());
    }
    assert!(d.get(1, 1).unwrap().is_nan());

    let zero = DistanceParams {
        outlet_distance: OutletDistance::Zero,
        ..params
    };
    let d = distance_to_outlet(&fdir, zero, &Unmonitored).unwrap().distances;
    assert_eq!(d.get(1, 1).unwrap(), 0.0);
    assert_relative_eq!(d.get(0, 1).unwrap(), pixel);
}

#[test]
fn second_chain_joins_the_shared_cell() {
    // two 1x3 chains meeting at the pit (row 1, col 3)
    let ne = code(Direction::NorthEast);
    let se = code(Direction::SouthEast);
    let nan = f32::NAN;
    let codes = vec![
        E, E, se, nan,
        nan, nan, nan, PIT,
        E, E, ne, nan,
    ];
    let meta = RasterMetadata::unit(4, 3);
    let fdir = Raster::from_vec(codes.clone(), meta).unwrap();

    let mut ctx: TraceContext<f64> = TraceContext::new(&codes, &meta).unwrap();
    let first = ctx.resolve_from(0, |_| false, |_, _| 0.0).unwrap();
    assert_eq!(first, Terminus::Outlet);
    assert_eq!(ctx.resolve_count(), 4);
    let second = ctx.resolve_from(8, |_| false, |_, _| 0.0).unwrap();
    assert!(matches!(second, Terminus::Joined { index: 7, .. }));
    assert_eq!(ctx.resolve_count(), 7);

    let outlets = find_outlets(&fdir).unwrap();
    assert_eq!(outlets.count, 1);
    assert_eq!(outlets.mask.get(1, 3).unwrap(), OUTLET);

    let params = DistanceParams {
        skip_border: false,
        ..Default::default()
    };
    let d = distance_to_outlet(&fdir, params, &Unmonitored).unwrap().distances;
    let diag = 2f64.sqrt();
    for row in [0, 2] {
        assert_relative_eq!(d.get(row, 2).unwrap(), diag);
        assert_relative_eq!(d.get(row, 1).unwrap(), 1.0 + diag);
        assert_relative_eq!(d.get(row, 0).unwrap(), 2.0 + diag);
    }
}

#[test]
fn all_nodata_grid() {
    let fdir = Raster::filled(4, 5, f32::NAN);

    let outlets = find_outlets(&fdir).unwrap();
    assert_eq!(outlets.count, 0);
    assert!(outlets.mask.cells().iter().all(|&m| m == 0));
    assert_eq!(outlets.traced_cells, 0);

    for skip_border in [true, false] {
        let params = DistanceParams {
            skip_border,
            ..Default::default()
        };
        let result = distance_to_outlet(&fdir, params, &Unmonitored).unwrap();
        assert!(result.completed);
        assert!(result.distances.cells().iter().all(|d| d.is_nan()));
    }
}

/// Cancels on the poll that follows row `after_row`.
struct CancelAfterRow {
    after_row: usize,
    polls: AtomicUsize,
}

impl ProgressMonitor for CancelAfterRow {
    fn is_cancelled(&self) -> bool {
        self.polls.fetch_add(1, Ordering::Relaxed) > self.after_row
    }

    fn progress_to(&self, _percent: u8) {}
}

#[test]
fn cancellation_keeps_unvisited_rows_at_the_sentinel() {
    let (rows, cols) = (6, 5);
    let mut codes = vec![E; rows * cols];
    for row in 0..rows {
        codes[row * cols + cols - 1] = PIT;
    }
    let fdir = Raster::from_vec(codes, RasterMetadata::unit(cols, rows)).unwrap();

    let monitor = CancelAfterRow {
        after_row: 2,
        polls: AtomicUsize::new(0),
    };
    let params = DistanceParams {
        skip_border: false,
        progress_interval: 1,
        ..Default::default()
    };
    let result = distance_to_outlet(&fdir, params, &monitor).unwrap();
    assert!(!result.completed);
    assert_eq!(result.traced_cells, 3 * cols);

    let d = &result.distances;
    for row in 0..=2 {
        for col in 0..cols - 1 {
            assert_eq!(d.get(row, col).unwrap(), (cols - 1 - col) as f64);
        }
        assert!(d.get(row, cols - 1).unwrap().is_nan());
    }
    for row in 3..rows {
        for col in 0..cols {
            assert_eq!(d.get(row, col).unwrap(), NOT_PROCESSED_YET);
        }
    }
}
