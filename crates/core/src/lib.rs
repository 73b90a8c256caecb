//! # hydrotrace core
//!
//! Core types and traits shared by the hydrotrace algorithms.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid type carrying its `RasterMetadata`
//! - `PixelProvider`: read access to cells by column and row
//! - `ProgressMonitor`: cooperative progress and cancellation
//! - Algorithm trait for consistent API

pub mod error;
pub mod progress;
pub mod raster;

pub use error::{Error, Result};
pub use progress::{CancelFlag, ProgressMonitor, Unmonitored};
pub use raster::{CellIndex, PixelProvider, Raster, RasterElement, RasterMetadata};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::progress::{CancelFlag, ProgressMonitor, Unmonitored};
    pub use crate::raster::{CellIndex, PixelProvider, Raster, RasterElement, RasterMetadata};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in hydrotrace.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
