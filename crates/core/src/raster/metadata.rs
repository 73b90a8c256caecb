//! Raster georeferencing and dimensions

use serde::{Deserialize, Serialize};

/// Linear identity of a cell: `row * n_cols + col`.
pub type CellIndex = usize;

/// Georeferencing and dimensions shared by every buffer of one raster.
///
/// Converts between pixel coordinates (col, row) and world coordinates (x, y):
/// ```text
/// x = origin_x + col * pixel_size_x + row * rotation_x
/// y = origin_y + col * rotation_y + row * pixel_size_y
/// ```
///
/// For north-up images the rotations are 0 and `pixel_size_y` is negative.
/// `n_cols * n_rows` is the length of every buffer attached to this metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterMetadata {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Cell size in X direction
    pub pixel_size_x: f64,
    /// Cell size in Y direction, usually negative
    pub pixel_size_y: f64,
    /// Row rotation term (usually 0)
    pub rotation_x: f64,
    /// Column rotation term (usually 0)
    pub rotation_y: f64,
    /// Number of columns
    pub n_cols: usize,
    /// Number of rows
    pub n_rows: usize,
}

impl RasterMetadata {
    /// Create metadata for a north-up raster without rotation
    pub fn new(
        origin_x: f64,
        origin_y: f64,
        pixel_size_x: f64,
        pixel_size_y: f64,
        n_cols: usize,
        n_rows: usize,
    ) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_size_x,
            pixel_size_y,
            rotation_x: 0.0,
            rotation_y: 0.0,
            n_cols,
            n_rows,
        }
    }

    /// Unit cells anchored at the origin, for grids without georeferencing
    pub fn unit(n_cols: usize, n_rows: usize) -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0, n_cols, n_rows)
    }

    /// Same metadata with the given rotation terms
    pub fn with_rotation(mut self, rotation_x: f64, rotation_y: f64) -> Self {
        self.rotation_x = rotation_x;
        self.rotation_y = rotation_y;
        self
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.n_cols * self.n_rows
    }

    /// Whether the grid has no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether two rasters cover the same grid dimensions
    pub fn same_shape(&self, other: &RasterMetadata) -> bool {
        self.n_cols == other.n_cols && self.n_rows == other.n_rows
    }

    /// Linear index of (col, row)
    #[inline]
    pub fn cell_index(&self, col: usize, row: usize) -> CellIndex {
        row * self.n_cols + col
    }

    /// (col, row) of a linear index
    #[inline]
    pub fn cell_coords(&self, index: CellIndex) -> (usize, usize) {
        (index % self.n_cols, index / self.n_cols)
    }

    /// Whether (col, row) lies on the first or last row or column
    #[inline]
    pub fn is_border(&self, col: usize, row: usize) -> bool {
        col == 0 || row == 0 || col + 1 == self.n_cols || row + 1 == self.n_rows
    }

    /// World coordinates of the pixel center
    pub fn to_world(&self, col: usize, row: usize) -> (f64, f64) {
        self.corner(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Fractional pixel coordinates of a world position.
    ///
    /// Returns NaN coordinates when the transform is degenerate.
    pub fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_size_x * self.pixel_size_y - self.rotation_x * self.rotation_y;

        if det.abs() < 1e-10 {
            return (f64::NAN, f64::NAN);
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;

        let col = (self.pixel_size_y * dx - self.rotation_x * dy) / det;
        let row = (-self.rotation_y * dx + self.pixel_size_x * dy) / det;

        (col, row)
    }

    /// Bounding box (min_x, min_y, max_x, max_y)
    pub fn envelope(&self) -> (f64, f64, f64, f64) {
        let w = self.n_cols as f64;
        let h = self.n_rows as f64;
        let corners = [
            self.corner(0.0, 0.0),
            self.corner(w, 0.0),
            self.corner(0.0, h),
            self.corner(w, h),
        ];

        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(min_x, min_y, max_x, max_y), &(x, y)| {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            },
        )
    }

    fn corner(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_size_x + row * self.rotation_x;
        let y = self.origin_y + col * self.rotation_y + row * self.pixel_size_y;
        (x, y)
    }
}
