//! Error types for the shared core.

use thiserror::Error;

/// Errors from constructing or indexing grids.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("flat array of length {0} is not a perfect square")]
    NotSquare(usize),

    #[error("value count {actual} does not match {width}x{height} grid")]
    SizeMismatch {
        width: usize,
        height: usize,
        actual: usize,
    },

    #[error("grid has zero extent ({width}x{height})")]
    Empty { width: usize, height: usize },
}

#[derive(Debug, Error)]
pub enum BboxParseError {
    #[error("Invalid BBOX format: {0}. Expected 'minx,miny,maxx,maxy'")]
    InvalidFormat(String),

    #[error("Invalid number in BBOX: {0}")]
    InvalidNumber(String),

    #[error("Degenerate BBOX: {0} (min must be strictly less than max)")]
    Degenerate(String),
}

#[derive(Debug, Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Epoch milliseconds out of range: {0}")]
    EpochOutOfRange(i64),
}
