//! Error types for rendering.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Unknown palette: {0}")]
    UnknownPalette(String),

    #[error("Invalid hex color: {0}")]
    InvalidHexColor(String),

    #[error("Palette needs at least two stops, got {0}")]
    TooFewStops(usize),

    #[error("Invalid tEXt keyword: {0}")]
    InvalidTextKeyword(String),

    #[error("IDAT compression failed: {0}")]
    Compression(#[from] std::io::Error),

    #[error(transparent)]
    Grid(#[from] wx_common::GridError),
}
