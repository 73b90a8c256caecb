//! # HydroTrace Algorithms
//!
//! Hydrological routing over D8 flow direction rasters.
//!
//! ## Modules
//!
//! - **hydrology**: flow direction, outlets, distance to outlet, flow
//!   accumulation, watershed delineation

pub mod hydrology;
mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::hydrology::{
        all_watersheds, distance_to_outlet, find_outlets, flow_accumulation, flow_direction,
        watersheds_with_threshold, AllOutlets, DistanceParams, DistanceToOutlet,
        DistanceToOutletAlgorithm, FlowAccumulation, FlowDirection, FlowDirectionGrid,
        OutletDistance, Outlets, Watershed, WatershedThresholdParams, NO_WATERSHED,
    };
    pub use hydrotrace_core::prelude::*;
}
