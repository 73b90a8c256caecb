//! Watershed delineation
//!
//! Labels every drainage basin of a D8 flow direction grid, and filters the
//! labels by the accumulation reached at each basin's outlet.

use std::collections::HashMap;
use std::time::Instant;

use hydrotrace_core::raster::Raster;
use hydrotrace_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::d8::FlowDirectionGrid;
use super::outlets::OUTLET;
use super::tracer::{Link, TraceContext, Terminus};

/// Label of no-data cells and of removed watersheds (also the raster's no-data value)
pub const NO_WATERSHED: i32 = 0;

/// Watershed labelling algorithm
#[derive(Debug, Clone, Default)]
pub struct Watershed;

impl Algorithm for Watershed {
    type Input = FlowDirectionGrid;
    type Output = Raster<i32>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "All Watersheds"
    }

    fn description(&self) -> &'static str {
        "Label every drainage basin of a D8 flow direction grid"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        all_watersheds(&input)
    }
}

/// Label all drainage basins.
///
/// Cells are visited in row-major order. A trace that ends at a new outlet
/// opens a new basin; ids start at 1 and follow discovery order. A trace that
/// merges into an earlier chain takes that chain's id.
///
/// # Arguments
/// * `flow_dir` - D8 flow direction grid (NaN = no data)
///
/// # Returns
/// Raster<i32> with basin ids ([`NO_WATERSHED`] = no data)
pub fn all_watersheds(flow_dir: &FlowDirectionGrid) -> Result<Raster<i32>> {
    let start = Instant::now();
    let metadata = *flow_dir.metadata();
    let codes = flow_dir.cells();
    debug!(rows = metadata.n_rows, cols = metadata.n_cols, "labelling watersheds");

    let mut ctx: TraceContext<i32> = TraceContext::new(&codes, &metadata)?;
    let mut labels = vec![NO_WATERSHED; codes.len()];
    let mut next_id = NO_WATERSHED;

    for index in 0..codes.len() {
        if codes[index].is_nan() {
            ctx.pre_resolve(index, NO_WATERSHED);
            continue;
        }
        if !ctx.is_unresolved(index) {
            continue;
        }

        ctx.resolve_from(index, |_| false, |cell, link| {
            let id = match link {
                Link::Terminal(Terminus::Joined { value, .. }) | Link::Downstream(value) => value,
                Link::Terminal(Terminus::Outlet | Terminus::Barrier { .. }) => {
                    next_id += 1;
                    next_id
                }
            };
            labels[cell.index] = id;
            id
        })?;
    }

    let mut raster = Raster::from_vec(labels, metadata)?;
    raster.set_nodata(Some(NO_WATERSHED));

    info!(watersheds = next_id, "{} watersheds in {:.2?}", next_id, start.elapsed());
    Ok(raster)
}

/// Parameters for [`watersheds_with_threshold`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatershedThresholdParams {
    /// Minimum accumulation at the outlet for a watershed to be kept.
    /// Default: 0 (keep every watershed that has an outlet)
    pub threshold: f64,
}

impl Default for WatershedThresholdParams {
    fn default() -> Self {
        Self { threshold: 0.0 }
    }
}

/// Keep only the watersheds whose outlet drains at least `threshold` cells.
///
/// A watershed is removed (set to [`NO_WATERSHED`]) when the accumulation at
/// its outlet is strictly below the threshold, or when no cell of the outlet
/// mask belongs to it. Other ids are unchanged. If the mask holds several
/// outlet cells for one watershed, the largest accumulation among them counts.
///
/// # Arguments
/// * `watersheds` - basin ids, as produced by [`all_watersheds`]
/// * `outlets` - outlet mask ([`OUTLET`] = outlet)
/// * `accumulation` - flow accumulation counts
/// * `params` - threshold
pub fn watersheds_with_threshold(
    watersheds: &Raster<i32>,
    outlets: &Raster<u8>,
    accumulation: &Raster<f64>,
    params: WatershedThresholdParams,
) -> Result<Raster<i32>> {
    if !params.threshold.is_finite() {
        return Err(Error::InvalidParameter {
            name: "threshold",
            value: params.threshold.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    watersheds.ensure_same_shape(outlets)?;
    watersheds.ensure_same_shape(accumulation)?;

    let ids = watersheds.cells();
    let mask = outlets.cells();
    let acc = accumulation.cells();

    let mut outlet_accumulation: HashMap<i32, f64> = HashMap::new();
    for ((&id, &m), &a) in ids.iter().zip(mask.iter()).zip(acc.iter()) {
        if id == NO_WATERSHED || m != OUTLET {
            continue;
        }
        outlet_accumulation
            .entry(id)
            .and_modify(|best| *best = best.max(a))
            .or_insert(a);
    }

    let kept = |id: i32| {
        outlet_accumulation
            .get(&id)
            .is_some_and(|&a| a >= params.threshold)
    };

    let filtered: Vec<i32> = ids
        .iter()
        .map(|&id| if id != NO_WATERSHED && kept(id) { id } else { NO_WATERSHED })
        .collect();

    let removed = outlet_accumulation.keys().filter(|&&id| !kept(id)).count();
    info!(
        kept = outlet_accumulation.len() - removed,
        removed,
        threshold = params.threshold,
        "watersheds filtered"
    );

    let mut raster = Raster::from_vec(filtered, *watersheds.metadata())?;
    raster.set_nodata(Some(NO_WATERSHED));
    Ok(raster)
}
