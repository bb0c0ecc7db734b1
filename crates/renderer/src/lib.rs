//! Heatmap rendering for forecast grids.
//!
//! Turns a [`wx_common::Grid`] into an indexed PNG:
//! - named color palettes precomputed as 256-entry lookup tables
//! - fixed value range mapping, NaN rendered transparent
//! - optional bilinear upscale, vertical flip, and gridline overlay
//! - frame title carried in a `tEXt` chunk

pub mod error;
pub mod heatmap;
pub mod palette;
pub mod png;

pub use error::RenderError;
pub use heatmap::{render_png, Gridlines, HeatmapSpec};
pub use palette::{Color, Palette};
