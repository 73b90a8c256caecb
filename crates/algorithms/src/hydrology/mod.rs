//! Hydrological routing over D8 flow direction grids
//!
//! - D8 codes: direction encoding and the downstream-cell decoder
//! - Tracer: memoized path tracing shared by the full-grid passes
//! - Outlets: pour point mask
//! - Distance to outlet: flow path length, with progress and cancellation
//! - Flow direction: D8 codes from a DEM
//! - Flow accumulation: contributing cell counts
//! - Watershed: basin labels and threshold filtering

pub mod d8;
mod distance_to_outlet;
mod flow_accumulation;
mod flow_direction;
mod outlets;
pub mod tracer;
mod watershed;

pub use d8::{Direction, Downstream, FlowDirectionGrid, PIT};
pub use distance_to_outlet::{
    distance_to_outlet, DistanceParams, DistanceToOutlet, DistanceToOutletAlgorithm,
    OutletDistance, DISTANCE_NODATA, NOT_PROCESSED_YET,
};
pub use flow_accumulation::{flow_accumulation, FlowAccumulation, ACCUMULATION_NODATA};
pub use flow_direction::{flow_direction, FlowDirection};
pub use outlets::{find_outlets, AllOutlets, Outlets, NOT_AN_OUTLET, OUTLET};
pub use tracer::{HydroCell, Link, Terminus, TraceContext, VisitState};
pub use watershed::{
    all_watersheds, watersheds_with_threshold, Watershed, WatershedThresholdParams, NO_WATERSHED,
};
