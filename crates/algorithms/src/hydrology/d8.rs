//! D8 direction codes and the downstream-cell decoder
//!
//! Flow direction encoding:
//! ```text
//!   4  3  2
//!   5  0  1
//!   6  7  8
//! ```
//! 0 = pit/flat (no outflow), 1-8 = direction to steepest neighbor,
//! NaN = no data. Any other code is undefined and has no outflow.

use hydrotrace_core::raster::{CellIndex, Raster, RasterMetadata};

/// A raster of D8 direction codes, one per cell.
pub type FlowDirectionGrid = Raster<f32>;

/// Code of a cell with no downslope neighbor
pub const PIT: f32 = 0.0;

/// One of the eight compass neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    East = 1,
    NorthEast = 2,
    North = 3,
    NorthWest = 4,
    West = 5,
    SouthWest = 6,
    South = 7,
    SouthEast = 8,
}

impl Direction {
    /// All directions, in code order
    pub const ALL: [Direction; 8] = [
        Direction::East,
        Direction::NorthEast,
        Direction::North,
        Direction::NorthWest,
        Direction::West,
        Direction::SouthWest,
        Direction::South,
        Direction::SouthEast,
    ];

    /// Parse a direction code. NaN, 0 and anything but an integral 1..=8 give `None`.
    pub fn from_code(code: f32) -> Option<Self> {
        if !(1.0..=8.0).contains(&code) || code.fract() != 0.0 {
            return None;
        }
        Some(Self::ALL[code as usize - 1])
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Offset to the neighbor as (d_col, d_row), rows growing southwards
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::East => (1, 0),
            Direction::NorthEast => (1, -1),
            Direction::North => (0, -1),
            Direction::NorthWest => (-1, -1),
            Direction::West => (-1, 0),
            Direction::SouthWest => (-1, 1),
            Direction::South => (0, 1),
            Direction::SouthEast => (1, 1),
        }
    }

    pub fn is_diagonal(self) -> bool {
        let (dc, dr) = self.offset();
        dc != 0 && dr != 0
    }

    /// Step length in cells: 1 for orthogonal neighbors, sqrt(2) for diagonals
    pub fn step_factor(self) -> f64 {
        if self.is_diagonal() {
            std::f64::consts::SQRT_2
        } else {
            1.0
        }
    }

    /// Physical length of one step in this direction.
    ///
    /// Square cells scale [`step_factor`](Self::step_factor) by the pixel size.
    /// Otherwise E/W steps use the horizontal size, N/S steps the vertical one
    /// and diagonals the hypotenuse of both.
    pub fn step_length(self, metadata: &RasterMetadata) -> f64 {
        let sx = metadata.pixel_size_x.abs();
        let sy = metadata.pixel_size_y.abs();
        if sx == sy {
            return self.step_factor() * sx;
        }
        match self.offset() {
            (0, _) => sy,
            (_, 0) => sx,
            _ => sx.hypot(sy),
        }
    }

    /// The direction pointing back at this cell from the neighbor
    pub fn opposite(self) -> Self {
        Self::ALL[(self as usize + 3) % 8]
    }

    /// Neighbor of (col, row) in this direction, if inside an `n_cols` x `n_rows` grid
    #[inline]
    pub fn neighbor(self, col: usize, row: usize, n_cols: usize, n_rows: usize) -> Option<(usize, usize)> {
        let (dc, dr) = self.offset();
        let nc = col.checked_add_signed(dc)?;
        let nr = row.checked_add_signed(dr)?;
        (nc < n_cols && nr < n_rows).then_some((nc, nr))
    }
}

/// Physical step length of every direction, indexed by `code - 1`
pub fn step_lengths(metadata: &RasterMetadata) -> [f64; 8] {
    Direction::ALL.map(|dir| dir.step_length(metadata))
}

/// What lies downstream of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Downstream {
    /// The cell itself is no data
    NoData,
    /// Pit, flat, undefined code, or flow leaving the grid
    Sink,
    /// Flow enters the neighbor at `index`
    Flows { index: CellIndex, direction: Direction },
}

/// Decode the downstream neighbor of `index` in a row-major code slice.
#[inline]
pub fn decode(codes: &[f32], n_cols: usize, n_rows: usize, index: CellIndex) -> Downstream {
    let code = codes[index];
    if code.is_nan() {
        return Downstream::NoData;
    }
    let Some(direction) = Direction::from_code(code) else {
        return Downstream::Sink;
    };
    match direction.neighbor(index % n_cols, index / n_cols, n_cols, n_rows) {
        Some((nc, nr)) => Downstream::Flows {
            index: nr * n_cols + nc,
            direction,
        },
        None => Downstream::Sink,
    }
}

/// Index of the cell that `index` (at `col`, `row`) flows into.
///
/// `None` means the cell is a pour point candidate: its code is NaN, a pit or
/// undefined, or the flow would leave the grid.
#[inline]
pub fn next_cell(
    codes: &[f32],
    n_cols: usize,
    n_rows: usize,
    index: CellIndex,
    col: usize,
    row: usize,
) -> Option<CellIndex> {
    debug_assert_eq!(index, row * n_cols + col);
    let direction = Direction::from_code(codes[index])?;
    let (nc, nr) = direction.neighbor(col, row, n_cols, n_rows)?;
    Some(nr * n_cols + nc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_codes_roundtrip() {
        for dir in Direction::ALL {
            assert_eq!(Direction::from_code(dir.code() as f32), Some(dir));
        }
    }

    #[test]
    fn test_undefined_codes() {
        assert_eq!(Direction::from_code(f32::NAN), None);
        assert_eq!(Direction::from_code(PIT), None);
        assert_eq!(Direction::from_code(9.0), None);
        assert_eq!(Direction::from_code(-1.0), None);
        assert_eq!(Direction::from_code(2.5), None);
    }

    #[test]
    fn test_opposite_direction() {
        assert_eq!(Direction::East.opposite(), Direction::West);
        assert_eq!(Direction::North.opposite(), Direction::South);
        assert_eq!(Direction::West.opposite(), Direction::East);
        assert_eq!(Direction::South.opposite(), Direction::North);
        assert_eq!(Direction::NorthEast.opposite(), Direction::SouthWest);
        assert_eq!(Direction::SouthEast.opposite(), Direction::NorthWest);
    }

    #[test]
    fn test_step_factor_is_one_or_sqrt2() {
        for dir in [Direction::East, Direction::North, Direction::West, Direction::South] {
            assert_eq!(dir.step_factor(), 1.0);
        }
        for dir in [
            Direction::NorthEast,
            Direction::NorthWest,
            Direction::SouthWest,
            Direction::SouthEast,
        ] {
            assert_eq!(dir.step_factor(), std::f64::consts::SQRT_2);
        }

        // square cells: step length is exactly factor * size
        let meta = RasterMetadata::unit(3, 3);
        assert_eq!(Direction::SouthEast.step_length(&meta), std::f64::consts::SQRT_2);
        assert_eq!(Direction::West.step_length(&meta), 1.0);
    }

    #[test]
    fn test_step_lengths_follow_pixel_size() {
        let meta = RasterMetadata::new(0.0, 0.0, 30.0, -30.0, 5, 5);
        assert_relative_eq!(Direction::East.step_length(&meta), 30.0);
        assert_relative_eq!(Direction::North.step_length(&meta), 30.0);
        assert_relative_eq!(
            Direction::SouthWest.step_length(&meta),
            30.0 * std::f64::consts::SQRT_2,
            epsilon = 1e-12
        );

        let rect = RasterMetadata::new(0.0, 0.0, 3.0, -4.0, 5, 5);
        assert_relative_eq!(Direction::West.step_length(&rect), 3.0);
        assert_relative_eq!(Direction::South.step_length(&rect), 4.0);
        assert_relative_eq!(Direction::NorthWest.step_length(&rect), 5.0);
    }

    #[test]
    fn test_decode_inside_grid() {
        // 3x3, center flows south-east
        let mut codes = vec![PIT; 9];
        codes[4] = Direction::SouthEast.code() as f32;
        assert_eq!(next_cell(&codes, 3, 3, 4, 1, 1), Some(8));
        assert_eq!(
            decode(&codes, 3, 3, 4),
            Downstream::Flows {
                index: 8,
                direction: Direction::SouthEast
            }
        );
    }

    #[test]
    fn test_flow_leaving_grid_is_a_sink() {
        let mut codes = vec![PIT; 6];
        // (col 2, row 0) flows east, off a 3x2 grid
        codes[2] = Direction::East.code() as f32;
        // (col 0, row 1) flows south-west, off the corner
        codes[3] = Direction::SouthWest.code() as f32;
        assert_eq!(decode(&codes, 3, 2, 2), Downstream::Sink);
        assert_eq!(decode(&codes, 3, 2, 3), Downstream::Sink);
        assert_eq!(next_cell(&codes, 3, 2, 3, 0, 1), None);
    }

    #[test]
    fn test_nodata_and_pit() {
        let codes = vec![f32::NAN, PIT];
        assert_eq!(decode(&codes, 2, 1, 0), Downstream::NoData);
        assert_eq!(decode(&codes, 2, 1, 1), Downstream::Sink);
        assert_eq!(next_cell(&codes, 2, 1, 0, 0, 0), None);
    }

    #[test]
    fn test_index_zero_is_a_real_neighbor() {
        // (1,1) flows north-west into index 0
        let mut codes = vec![PIT; 4];
        codes[3] = Direction::NorthWest.code() as f32;
        assert_eq!(next_cell(&codes, 2, 2, 3, 1, 1), Some(0));
        assert_eq!(
            decode(&codes, 2, 2, 3),
            Downstream::Flows {
                index: 0,
                direction: Direction::NorthWest
            }
        );
    }
}
