//! Raster data structures and the pixel access capability

mod element;
mod grid;
mod metadata;
mod pixel;

pub use element::RasterElement;
pub use grid::{Raster, RasterStatistics};
pub use metadata::{CellIndex, RasterMetadata};
pub use pixel::PixelProvider;
