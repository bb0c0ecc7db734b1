//! Row-major 2-D value grids decoded from forecast data.

use crate::error::GridError;
use serde::{Deserialize, Serialize};

/// A row-major grid of `f32` samples.
///
/// Row 0 is the top of the image; missing samples are NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl Grid {
    /// Create a grid from explicit dimensions and row-major values.
    pub fn new(width: usize, height: usize, values: Vec<f32>) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::Empty { width, height });
        }
        if values.len() != width * height {
            return Err(GridError::SizeMismatch {
                width,
                height,
                actual: values.len(),
            });
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Reshape a flat array into a square grid.
    ///
    /// The length must be a perfect square; anything else is an error rather
    /// than a truncation.
    pub fn from_flat_square(values: Vec<f32>) -> Result<Self, GridError> {
        let len = values.len();
        let side = (len as f64).sqrt().round() as usize;
        if side == 0 || side * side != len {
            return Err(GridError::NotSquare(len));
        }
        Ok(Self {
            width: side,
            height: side,
            values,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// All samples in row-major order.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Sample at (row, col), if in bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.height || col >= self.width {
            return None;
        }
        Some(self.values[row * self.width + col])
    }

    /// One row of samples.
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        if row >= self.height {
            return None;
        }
        let start = row * self.width;
        Some(&self.values[start..start + self.width])
    }

    /// Minimum and maximum finite samples, if any exist.
    pub fn finite_min_max(&self) -> Option<(f32, f32)> {
        let mut out: Option<(f32, f32)> = None;
        for &v in &self.values {
            if !v.is_finite() {
                continue;
            }
            out = Some(match out {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            });
        }
        out
    }

    /// Reverse the row order. Used for sources that deliver row 0 at the
    /// south edge.
    pub fn flipped_vertical(&self) -> Self {
        let mut values = Vec::with_capacity(self.values.len());
        for row in (0..self.height).rev() {
            let start = row * self.width;
            values.extend_from_slice(&self.values[start..start + self.width]);
        }
        Self {
            width: self.width,
            height: self.height,
            values,
        }
    }
}
