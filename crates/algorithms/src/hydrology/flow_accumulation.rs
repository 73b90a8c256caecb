//! Flow accumulation algorithm
//!
//! Counts, for every cell, the cells that drain through it: the cell itself
//! plus every cell whose flow chain passes through it.

use std::time::Instant;

use hydrotrace_core::raster::Raster;
use hydrotrace_core::{Algorithm, Error, Result};
use tracing::{info, warn};

use super::d8::{self, FlowDirectionGrid};

/// No-data value of the accumulation raster
pub const ACCUMULATION_NODATA: f64 = f64::NAN;

/// Flow accumulation algorithm
#[derive(Debug, Clone, Default)]
pub struct FlowAccumulation;

impl Algorithm for FlowAccumulation {
    type Input = FlowDirectionGrid;
    type Output = Raster<f64>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Accumulation"
    }

    fn description(&self) -> &'static str {
        "Count the cells draining through each cell of a D8 flow direction grid"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        flow_accumulation(&input)
    }
}

/// Calculate flow accumulation from a D8 flow direction grid.
///
/// Headwater cells (nothing upstream) have accumulation 1. No-data cells are
/// NaN and contribute nothing; a cell flowing into no data keeps its own
/// count.
///
/// # Algorithm
/// 1. Count incoming flows for each cell (in-degree)
/// 2. Start from cells with in-degree 0 (headwaters)
/// 3. Propagate downstream, releasing a cell once all its inflows are done
///
/// A cycle leaves cells with pending inflows and fails with [`Error::FlowCycle`].
///
/// # Arguments
/// * `flow_dir` - D8 flow direction grid (NaN = no data)
///
/// # Returns
/// Raster<f64> with accumulation counts (no-data = NaN)
pub fn flow_accumulation(flow_dir: &FlowDirectionGrid) -> Result<Raster<f64>> {
    let start = Instant::now();
    let metadata = *flow_dir.metadata();
    let (rows, cols) = (metadata.n_rows, metadata.n_cols);
    let codes = flow_dir.cells();
    let n = codes.len();

    let downstream = |index: usize| {
        d8::next_cell(&codes, cols, rows, index, index % cols, index / cols)
            .filter(|&next| !codes[next].is_nan())
    };

    // Step 1: in-degree of every valid cell
    let mut in_degree = vec![0u32; n];
    let mut valid = 0usize;
    for index in 0..n {
        if codes[index].is_nan() {
            continue;
        }
        valid += 1;
        if let Some(next) = downstream(index) {
            in_degree[next] += 1;
        }
    }

    // Step 2: seed with headwaters
    let mut accumulation: Vec<f64> = codes
        .iter()
        .map(|c| if c.is_nan() { ACCUMULATION_NODATA } else { 0.0 })
        .collect();
    let mut stack: Vec<usize> = (0..n)
        .filter(|&i| !codes[i].is_nan() && in_degree[i] == 0)
        .collect();

    // Step 3: each released cell adds itself, then hands its total downstream
    let mut processed = 0usize;
    while let Some(index) = stack.pop() {
        processed += 1;
        accumulation[index] += 1.0;

        if let Some(next) = downstream(index) {
            accumulation[next] += accumulation[index];
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                stack.push(next);
            }
        }
    }

    if processed != valid {
        let index = in_degree
            .iter()
            .position(|&d| d > 0)
            .unwrap_or_default();
        let (col, row) = metadata.cell_coords(index);
        warn!(row, col, "flow accumulation stopped on a cycle");
        return Err(Error::FlowCycle { row, col });
    }

    let mut output = Raster::from_vec(accumulation, metadata)?;
    output.set_nodata(Some(ACCUMULATION_NODATA));

    info!(cells = valid, "flow accumulation in {:.2?}", start.elapsed());
    Ok(output)
}
