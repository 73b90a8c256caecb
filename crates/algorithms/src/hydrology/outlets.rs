//! Outlet (pour point) detection
//!
//! Every chain of the flow forest ends in exactly one outlet: the last cell
//! before the flow stops (pit, undefined code, grid edge or no-data cell).
//! One traced pass over the grid finds all of them.

use std::time::Instant;

use hydrotrace_core::raster::Raster;
use hydrotrace_core::{Algorithm, Error, Result};
use tracing::{debug, info};

use super::d8::FlowDirectionGrid;
use super::tracer::{Link, TraceContext, Terminus};

/// Mask value of an outlet cell
pub const OUTLET: u8 = 1;
/// Mask value of every other cell, including no-data (also the mask's no-data value)
pub const NOT_AN_OUTLET: u8 = 0;

/// Result of [`find_outlets`]
#[derive(Debug, Clone)]
pub struct Outlets {
    /// 1 = outlet, 0 = not an outlet or no data
    pub mask: Raster<u8>,
    /// Number of cells set to 1 in `mask`
    pub count: usize,
    /// Cells resolved by tracing (every valid cell, once)
    pub traced_cells: usize,
}

/// Outlet detection algorithm
#[derive(Debug, Clone, Default)]
pub struct AllOutlets;

impl Algorithm for AllOutlets {
    type Input = FlowDirectionGrid;
    type Output = Outlets;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "All Outlets"
    }

    fn description(&self) -> &'static str {
        "Find every pour point of a D8 flow direction grid"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        find_outlets(&input)
    }
}

/// Find all outlets of a D8 flow direction grid.
///
/// Cells are visited in row-major order. A no-data cell is never traced.
/// Any other unresolved cell starts a trace: if the trace reaches a sink, its
/// most downstream cell becomes a new outlet; if it merges into a chain that
/// an earlier trace resolved, no outlet is created.
///
/// # Arguments
/// * `flow_dir` - D8 flow direction grid (NaN = no data)
///
/// # Returns
/// [`Outlets`] with a `u8` mask (no-data value 0) and the outlet count
pub fn find_outlets(flow_dir: &FlowDirectionGrid) -> Result<Outlets> {
    let start = Instant::now();
    let metadata = *flow_dir.metadata();
    let codes = flow_dir.cells();
    debug!(rows = metadata.n_rows, cols = metadata.n_cols, "finding outlets");

    let mut ctx: TraceContext<bool> = TraceContext::new(&codes, &metadata)?;
    let mut mask = vec![NOT_AN_OUTLET; codes.len()];
    let mut count = 0usize;

    for index in 0..codes.len() {
        if codes[index].is_nan() {
            ctx.pre_resolve(index, false);
            continue;
        }
        if !ctx.is_unresolved(index) {
            continue;
        }

        let terminus = ctx.resolve_from(index, |_| false, |cell, link| {
            let is_outlet = matches!(link, Link::Terminal(Terminus::Outlet));
            if is_outlet {
                mask[cell.index] = OUTLET;
            }
            is_outlet
        })?;

        if matches!(terminus, Terminus::Outlet) {
            count += 1;
        }
    }

    let traced_cells = ctx.resolve_count();
    let mut raster = Raster::from_vec(mask, metadata)?;
    raster.set_nodata(Some(NOT_AN_OUTLET));

    info!(
        outlets = count,
        traced = traced_cells,
        "{} outlets in {:.2?}",
        count,
        start.elapsed()
    );

    Ok(Outlets {
        mask: raster,
        count,
        traced_cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::d8::{Direction, PIT};

    fn grid(rows: usize, cols: usize, codes: &[f32]) -> FlowDirectionGrid {
        let mut fdir = Raster::new(rows, cols);
        for (i, &c) in codes.iter().enumerate() {
            fdir.set(i / cols, i % cols, c).unwrap();
        }
        fdir
    }

    const E: f32 = Direction::East as u8 as f32;
    const S: f32 = Direction::South as u8 as f32;

    #[test]
    fn test_strip_has_one_outlet_at_the_end() {
        let fdir = grid(1, 5, &[E, E, E, E, E]);
        let outlets = find_outlets(&fdir).unwrap();

        // the last cell flows off the grid
        assert_eq!(outlets.count, 1);
        assert_eq!(outlets.mask.get(0, 4).unwrap(), OUTLET);
        for col in 0..4 {
            assert_eq!(outlets.mask.get(0, col).unwrap(), NOT_AN_OUTLET);
        }
        assert_eq!(outlets.traced_cells, 5);
    }

    #[test]
    fn test_columns_draining_south() {
        let mut codes = vec![S; 12];
        for c in codes.iter_mut().skip(8) {
            *c = PIT;
        }
        let fdir = grid(3, 4, &codes);
        let outlets = find_outlets(&fdir).unwrap();

        assert_eq!(outlets.count, 4);
        for col in 0..4 {
            assert_eq!(outlets.mask.get(2, col).unwrap(), OUTLET);
            assert_eq!(outlets.mask.get(0, col).unwrap(), NOT_AN_OUTLET);
        }
    }

    #[test]
    fn test_cell_before_nodata_is_the_outlet() {
        let fdir = grid(1, 4, &[E, E, f32::NAN, PIT]);
        let outlets = find_outlets(&fdir).unwrap();

        assert_eq!(outlets.count, 2);
        assert_eq!(outlets.mask.get(0, 1).unwrap(), OUTLET);
        assert_eq!(outlets.mask.get(0, 2).unwrap(), NOT_AN_OUTLET);
        assert_eq!(outlets.mask.get(0, 3).unwrap(), OUTLET);
        assert_eq!(outlets.traced_cells, 3);
    }

    #[test]
    fn test_mask_nodata_value() {
        let fdir = grid(1, 2, &[PIT, PIT]);
        let outlets = find_outlets(&fdir).unwrap();
        assert_eq!(outlets.mask.nodata(), Some(NOT_AN_OUTLET));
        assert_eq!(outlets.mask.metadata(), fdir.metadata());
    }

    #[test]
    fn test_cycle_fails_the_pass() {
        let w = Direction::West as u8 as f32;
        let fdir = grid(1, 3, &[E, w, PIT]);
        assert!(matches!(find_outlets(&fdir), Err(Error::FlowCycle { .. })));
    }

    #[test]
    fn test_algorithm_trait() {
        let fdir = grid(1, 3, &[E, E, PIT]);
        let outlets = AllOutlets.execute_default(fdir).unwrap();
        assert_eq!(outlets.count, 1);
        assert_eq!(AllOutlets.name(), "All Outlets");
    }
}
