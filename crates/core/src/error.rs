//! Error types for hydrotrace

use thiserror::Error;

/// Main error type for hydrotrace operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {cols}x{rows} does not match a buffer of {len} cells")]
    InvalidDimensions { cols: usize, rows: usize, len: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// The flow chain starting somewhere upstream came back to a cell it had
    /// already visited. The direction grid is corrupt (usually an unresolved
    /// flat area).
    #[error("Flow direction cycle detected at ({row}, {col})")]
    FlowCycle { row: usize, col: usize },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for hydrotrace operations
pub type Result<T> = std::result::Result<T, Error>;
