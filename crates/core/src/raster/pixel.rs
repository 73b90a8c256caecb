//! Read access to raster cells by column and row

use crate::raster::{Raster, RasterElement, RasterMetadata};

/// Read-only accessor over a materialized raster.
///
/// `pixel` returns NaN for no-data cells and for coordinates outside the
/// grid, so callers never need a separate bounds or no-data check.
pub trait PixelProvider {
    /// Georeferencing and dimensions of the provided grid
    fn metadata(&self) -> &RasterMetadata;

    /// Cell value at (col, row), NaN when undefined
    fn pixel(&self, col: usize, row: usize) -> f32;
}

impl<T: RasterElement> PixelProvider for Raster<T> {
    fn metadata(&self) -> &RasterMetadata {
        Raster::metadata(self)
    }

    fn pixel(&self, col: usize, row: usize) -> f32 {
        match self.data().get((row, col)) {
            Some(&value) if !self.is_nodata(value) => {
                value.to_f64().map_or(f32::NAN, |v| v as f32)
            }
            _ => f32::NAN,
        }
    }
}

impl<P: PixelProvider + ?Sized> PixelProvider for &P {
    fn metadata(&self) -> &RasterMetadata {
        (**self).metadata()
    }

    fn pixel(&self, col: usize, row: usize) -> f32 {
        (**self).pixel(col, row)
    }
}
