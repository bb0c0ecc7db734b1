//! Geographic bounding boxes.

use crate::error::BboxParseError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A geographic bounding box in degrees (EPSG:4326, lon/lat order).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a bounding box from corner coordinates, rejecting degenerate
    /// extents.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, BboxParseError> {
        if min_x >= max_x {
            return Err(BboxParseError::Degenerate(format!(
                "min_x {} >= max_x {}",
                min_x, max_x
            )));
        }
        if min_y >= max_y {
            return Err(BboxParseError::Degenerate(format!(
                "min_y {} >= max_y {}",
                min_y, max_y
            )));
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Width in degrees.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height in degrees.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = BboxParseError;

    /// Convert from `[min_lon, min_lat, max_lon, max_lat]` as configs and
    /// region parameters write it.
    fn try_from(v: [f64; 4]) -> Result<Self, Self::Error> {
        BoundingBox::new(v[0], v[1], v[2], v[3])
    }
}

impl FromStr for BoundingBox {
    type Err = BboxParseError;

    /// Parse "minx,miny,maxx,maxy".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let mut nums = [0.0f64; 4];
        for (slot, part) in nums.iter_mut().zip(&parts) {
            *slot = part
                .trim()
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))?;
        }
        BoundingBox::try_from(nums)
    }
}
