//! D8 flow direction algorithm
//!
//! Calculates the direction of flow from each cell to its steepest
//! downslope neighbor using the D8 (deterministic eight-node) method.
//! The codes follow [`d8`](super::d8): 1-8 = direction, 0 = pit/flat,
//! NaN = no data.

use hydrotrace_core::raster::{PixelProvider, Raster};
use hydrotrace_core::{Algorithm, Error, Result};
use tracing::info;

use super::d8::{self, Direction, FlowDirectionGrid, PIT};
use crate::maybe_rayon::*;

/// Flow direction algorithm (D8)
#[derive(Debug, Clone, Default)]
pub struct FlowDirection;

impl Algorithm for FlowDirection {
    type Input = Raster<f64>;
    type Output = FlowDirectionGrid;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Direction (D8)"
    }

    fn description(&self) -> &'static str {
        "Calculate D8 flow direction from a filled DEM"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        flow_direction(&input)
    }
}

/// Calculate D8 flow direction from a DEM.
///
/// The input DEM should ideally be hydrologically conditioned (sinks filled)
/// for meaningful results. Drops are divided by the physical step length,
/// so rectangular pixels are handled. Flow never points outside the grid or
/// into a no-data cell; ties keep the first direction in code order.
///
/// # Arguments
/// * `dem` - Elevation source (NaN = no data)
///
/// # Returns
/// [`FlowDirectionGrid`] with the same metadata as the DEM
pub fn flow_direction<P>(dem: &P) -> Result<FlowDirectionGrid>
where
    P: PixelProvider + Sync + ?Sized,
{
    let metadata = *dem.metadata();
    let (rows, cols) = (metadata.n_rows, metadata.n_cols);

    for (name, size) in [("pixel_size_x", metadata.pixel_size_x), ("pixel_size_y", metadata.pixel_size_y)] {
        if !size.is_finite() || size == 0.0 {
            return Err(Error::InvalidParameter {
                name,
                value: size.to_string(),
                reason: "pixel size must be finite and non-zero".to_string(),
            });
        }
    }

    let steps = d8::step_lengths(&metadata);

    let codes: Vec<f32> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_codes = vec![PIT; cols];

            for (col, code) in row_codes.iter_mut().enumerate() {
                let center = dem.pixel(col, row);
                if center.is_nan() {
                    *code = f32::NAN;
                    continue;
                }

                let mut max_drop = 0.0_f64;
                for (&dir, &step) in Direction::ALL.iter().zip(steps.iter()) {
                    let Some((nc, nr)) = dir.neighbor(col, row, cols, rows) else {
                        continue;
                    };
                    let neighbor = dem.pixel(nc, nr);
                    if neighbor.is_nan() {
                        continue;
                    }

                    let drop = (center as f64 - neighbor as f64) / step;
                    if drop > max_drop {
                        max_drop = drop;
                        *code = dir.code() as f32;
                    }
                }
            }

            row_codes
        })
        .collect();

    let mut output = Raster::from_vec(codes, metadata)?;
    output.set_nodata(Some(f32::NAN));

    info!(rows, cols, "D8 flow direction computed");
    Ok(output)
}
