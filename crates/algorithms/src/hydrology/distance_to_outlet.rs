//! Distance from every cell to its outlet along the D8 flow network
//!
//! Each trace stacks the newly visited cells with their step length, then
//! pops them from downstream to upstream accumulating the distance. A trace
//! that merges into a resolved cell starts the accumulation from that cell's
//! distance, so every distance is computed once.

use std::time::Instant;

use hydrotrace_core::progress::{percent_of, ProgressMonitor, Unmonitored};
use hydrotrace_core::raster::Raster;
use hydrotrace_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::d8::FlowDirectionGrid;
use super::tracer::{Link, TraceContext, Terminus};

/// Initial value of every output cell, kept by cells a cancelled pass never reached
pub const NOT_PROCESSED_YET: f64 = 0.0;

/// No-data value of the distance raster
pub const DISTANCE_NODATA: f64 = f64::NAN;

/// Value written for an outlet cell itself.
///
/// Upstream sums always start from 0 at the outlet; this only controls what
/// the outlet cell reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutletDistance {
    /// Outlets are no data (they have no downstream step)
    #[default]
    NoData,
    /// Outlets are at distance 0
    Zero,
}

/// Parameters for distance-to-outlet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceParams {
    /// Set border cells to no data and stop chains when they reach one.
    /// The last interior cell of such a chain gets its own step length.
    /// Default: true
    pub skip_border: bool,
    /// Value of outlet cells. Default: [`OutletDistance::NoData`]
    pub outlet_distance: OutletDistance,
    /// Rows between two progress/cancellation polls. Default: 100
    pub progress_interval: usize,
}

impl Default for DistanceParams {
    fn default() -> Self {
        Self {
            skip_border: true,
            outlet_distance: OutletDistance::NoData,
            progress_interval: 100,
        }
    }
}

/// Result of [`distance_to_outlet`]
#[derive(Debug, Clone)]
pub struct DistanceToOutlet {
    /// Distance in map units (no-data = NaN)
    pub distances: Raster<f64>,
    /// False when the pass was cancelled; the raster is then partial
    pub completed: bool,
    /// Cells resolved by tracing
    pub traced_cells: usize,
}

/// Distance-to-outlet algorithm (no progress reporting)
#[derive(Debug, Clone, Default)]
pub struct DistanceToOutletAlgorithm;

impl Algorithm for DistanceToOutletAlgorithm {
    type Input = FlowDirectionGrid;
    type Output = DistanceToOutlet;
    type Params = DistanceParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Distance To The Outlet"
    }

    fn description(&self) -> &'static str {
        "Flow path length from every cell to its D8 outlet"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        distance_to_outlet(&input, params, &Unmonitored)
    }
}

/// Compute the flow path length from every cell to its outlet.
///
/// Step lengths are physical: orthogonal steps use the pixel size, diagonal
/// steps the pixel diagonal. For consecutive cells `a -> b` of a chain,
/// `distance(a) = distance(b) + step(a, b)`, taking an outlet's distance as 0.
///
/// Before every `progress_interval` rows the monitor is polled. On
/// cancellation the pass stops between traces and returns the partial raster
/// with `completed = false`; untouched cells hold [`NOT_PROCESSED_YET`].
///
/// # Arguments
/// * `flow_dir` - D8 flow direction grid (NaN = no data)
/// * `params` - border handling, outlet convention and poll interval
/// * `progress` - progress sink and cancellation source
pub fn distance_to_outlet<P>(
    flow_dir: &FlowDirectionGrid,
    params: DistanceParams,
    progress: &P,
) -> Result<DistanceToOutlet>
where
    P: ProgressMonitor + ?Sized,
{
    if params.progress_interval == 0 {
        return Err(Error::InvalidParameter {
            name: "progress_interval",
            value: "0".to_string(),
            reason: "must be at least one row".to_string(),
        });
    }

    let start = Instant::now();
    let metadata = *flow_dir.metadata();
    let (rows, cols) = (metadata.n_rows, metadata.n_cols);
    let codes = flow_dir.cells();
    debug!(rows, cols, ?params, "computing distances to the outlet");

    let mut ctx: TraceContext<f64> = TraceContext::new(&codes, &metadata)?;
    let mut distances = vec![NOT_PROCESSED_YET; codes.len()];
    let outlet_value = match params.outlet_distance {
        OutletDistance::NoData => DISTANCE_NODATA,
        OutletDistance::Zero => 0.0,
    };
    let skip_border = params.skip_border;
    let is_barrier = |index: usize| {
        skip_border && {
            let (col, row) = metadata.cell_coords(index);
            metadata.is_border(col, row)
        }
    };

    let mut completed = true;
    for row in 0..rows {
        if row % params.progress_interval == 0 {
            if progress.is_cancelled() {
                completed = false;
                warn!(row, rows, "distance to the outlet cancelled");
                break;
            }
            progress.progress_to(percent_of(row, rows));
        }

        for col in 0..cols {
            let index = row * cols + col;

            if (skip_border && metadata.is_border(col, row)) || codes[index].is_nan() {
                distances[index] = DISTANCE_NODATA;
                ctx.pre_resolve(index, 0.0);
                continue;
            }
            if !ctx.is_unresolved(index) {
                continue;
            }

            ctx.resolve_from(index, is_barrier, |cell, link| {
                let (below, at_outlet) = match link {
                    Link::Terminal(Terminus::Outlet) => (0.0, true),
                    Link::Terminal(Terminus::Barrier { .. }) => (0.0, false),
                    Link::Terminal(Terminus::Joined { value, .. }) => (value, false),
                    Link::Downstream(value) => (value, false),
                };
                let distance = below + cell.step_distance;
                distances[cell.index] = if at_outlet { outlet_value } else { distance };
                distance
            })?;
        }
    }

    if completed {
        progress.progress_to(100);
    }

    let traced_cells = ctx.resolve_count();
    let mut raster = Raster::from_vec(distances, metadata)?;
    raster.set_nodata(Some(DISTANCE_NODATA));

    info!(
        traced = traced_cells,
        completed,
        "distances to the outlet in {:.2?}",
        start.elapsed()
    );

    Ok(DistanceToOutlet {
        distances: raster,
        completed,
        traced_cells,
    })
}
