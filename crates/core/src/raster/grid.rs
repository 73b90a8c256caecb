//! Main Raster type

use std::borrow::Cow;

use crate::error::{Error, Result};
use crate::raster::{CellIndex, RasterElement, RasterMetadata};
use ndarray::Array2;

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in a 2D grid together with its
/// [`RasterMetadata`] and an optional no-data value. The metadata dimensions
/// always match the data shape.
///
/// # Example
///
/// ```ignore
/// use hydrotrace_core::Raster;
///
/// let mut raster: Raster<f32> = Raster::new(100, 100);
/// raster.set(10, 20, 42.0)?;
/// let value = raster.get(10, 20)?;
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    metadata: RasterMetadata,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros, with unit cells
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data and its metadata
    pub fn from_vec(data: Vec<T>, metadata: RasterMetadata) -> Result<Self> {
        if data.len() != metadata.len() {
            return Err(Error::InvalidDimensions {
                cols: metadata.n_cols,
                rows: metadata.n_rows,
                len: data.len(),
            });
        }

        let array = Array2::from_shape_vec((metadata.n_rows, metadata.n_cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            data: array,
            metadata,
            nodata: None,
        })
    }

    /// Create a raster from an ndarray, with unit cells
    pub fn from_array(data: Array2<T>) -> Self {
        let (rows, cols) = data.dim();
        Self {
            data,
            metadata: RasterMetadata::unit(cols, rows),
            nodata: None,
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            }),
        }
    }

    /// Get value by linear cell index
    pub fn get_index(&self, index: CellIndex) -> Result<T> {
        let cols = self.cols().max(1);
        self.get(index / cols, index % cols)
    }

    /// Set value by linear cell index
    pub fn set_index(&mut self, index: CellIndex, value: T) -> Result<()> {
        let cols = self.cols().max(1);
        self.set(index / cols, index % cols, value)
    }

    /// Cells in row-major order, indexable by [`CellIndex`].
    ///
    /// Borrows the storage when it is contiguous, copies it otherwise.
    pub fn cells(&self) -> Cow<'_, [T]> {
        match self.data.as_slice() {
            Some(slice) => Cow::Borrowed(slice),
            None => Cow::Owned(self.data.iter().copied().collect()),
        }
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    // Metadata

    /// Georeferencing and dimensions
    pub fn metadata(&self) -> &RasterMetadata {
        &self.metadata
    }

    /// Replace the metadata; its dimensions must match the data
    pub fn set_metadata(&mut self, metadata: RasterMetadata) -> Result<()> {
        if metadata.n_rows != self.rows() || metadata.n_cols != self.cols() {
            return Err(Error::SizeMismatch {
                er: self.rows(),
                ec: self.cols(),
                ar: metadata.n_rows,
                ac: metadata.n_cols,
            });
        }
        self.metadata = metadata;
        Ok(())
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Check that `other` covers the same grid as `self`
    pub fn ensure_same_shape<U: RasterElement>(&self, other: &Raster<U>) -> Result<()> {
        let (er, ec) = self.shape();
        let (ar, ac) = other.shape();
        if er != ar || ec != ac {
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        Ok(())
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    // Statistics

    /// Calculate basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }

            if min.map_or(true, |m| value < m) {
                min = Some(value);
            }
            if max.map_or(true, |m| value > m) {
                max = Some(value);
            }

            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        RasterStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}
