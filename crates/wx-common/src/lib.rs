//! Common types shared across the forecast-frames crates.

pub mod bbox;
pub mod error;
pub mod grid;
pub mod time;

pub use bbox::BoundingBox;
pub use error::{BboxParseError, GridError, TimeParseError};
pub use grid::Grid;
pub use time::FrameStamp;
