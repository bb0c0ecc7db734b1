//! Zarr array-store source.
//!
//! Opens the store once per run, maps the configured region onto the
//! latitude/longitude coordinate arrays, and reads one [1, lat, lon] slab
//! per frame.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};
use wx_common::{BoundingBox, FrameStamp, Grid};
use zarrs::array::{Array, DataType};
use zarrs::array_subset::ArraySubset;
use zarrs::storage::ReadableStorageTraits;

use super::{FrameSource, LabeledGrid, SourceError};
use crate::config::ZarrConfig;

pub struct ZarrSource<S: ReadableStorageTraits + Send + Sync + 'static> {
    data: Array<S>,
    variable: String,
    time_len: usize,
    /// Row index range [start, end) along the latitude dimension.
    rows: (usize, usize),
    /// Column index range [start, end) along the longitude dimension.
    cols: (usize, usize),
    /// Set when the store's latitudes ascend, so row 0 is the southern edge.
    south_up: bool,
    step_hours: u32,
    bbox: BoundingBox,
}

impl<S: ReadableStorageTraits + Send + Sync + 'static> ZarrSource<S> {
    /// Open the data variable and its coordinate arrays, and resolve the
    /// configured region to index ranges.
    pub fn open(storage: Arc<S>, config: &ZarrConfig) -> Result<Self, SourceError> {
        let bbox = BoundingBox::try_from(config.region)?;

        let data = open_array(&storage, &config.store_path, &config.variable)?;
        let shape = data.shape().to_vec();
        if shape.len() != 3 {
            return Err(SourceError::Zarr(format!(
                "variable {} has {} dimension(s), expected [time, lat, lon]",
                config.variable,
                shape.len()
            )));
        }
        match data.data_type() {
            DataType::Float32 | DataType::Float64 => {}
            other => {
                return Err(SourceError::Zarr(format!(
                    "variable {} has unsupported data type {other:?}",
                    config.variable
                )))
            }
        }

        let latitudes = read_coordinates(&open_array(
            &storage,
            &config.store_path,
            &config.latitude_array,
        )?)?;
        let longitudes = read_coordinates(&open_array(
            &storage,
            &config.store_path,
            &config.longitude_array,
        )?)?;

        if latitudes.len() != shape[1] as usize || longitudes.len() != shape[2] as usize {
            return Err(SourceError::Zarr(format!(
                "coordinate lengths ({}, {}) do not match variable shape {:?}",
                latitudes.len(),
                longitudes.len(),
                shape
            )));
        }

        let rows = index_range(&latitudes, bbox.min_y, bbox.max_y).ok_or_else(|| {
            SourceError::EmptyRegion(format!("no latitudes in [{}, {}]", bbox.min_y, bbox.max_y))
        })?;

        // Stores indexed 0..360 need westward longitudes shifted. Regions
        // crossing the antimeridian of such a store are not supported.
        let wraps = longitudes.iter().any(|&lon| lon > 180.0);
        let (lon_min, lon_max) = if wraps && bbox.min_x < 0.0 {
            (
                bbox.min_x + 360.0,
                if bbox.max_x < 0.0 {
                    bbox.max_x + 360.0
                } else {
                    bbox.max_x
                },
            )
        } else {
            (bbox.min_x, bbox.max_x)
        };
        let cols = index_range(&longitudes, lon_min, lon_max).ok_or_else(|| {
            SourceError::EmptyRegion(format!("no longitudes in [{lon_min}, {lon_max}]"))
        })?;

        let south_up = latitudes[0] < latitudes[latitudes.len() - 1];

        info!(
            variable = %config.variable,
            time_steps = shape[0],
            rows = ?rows,
            cols = ?cols,
            south_up,
            "Opened Zarr variable"
        );

        Ok(Self {
            data,
            variable: config.variable.clone(),
            time_len: shape[0] as usize,
            rows,
            cols,
            south_up,
            step_hours: config.time_step_hours,
            bbox,
        })
    }
}

#[async_trait]
impl<S: ReadableStorageTraits + Send + Sync + 'static> FrameSource for ZarrSource<S> {
    fn describe(&self) -> String {
        format!("zarr variable {}", self.variable)
    }

    fn bbox(&self) -> Option<BoundingBox> {
        Some(self.bbox)
    }

    #[instrument(skip(self), fields(variable = %self.variable))]
    async fn fetch_frame(&self, index: usize) -> Result<LabeledGrid, SourceError> {
        if index >= self.time_len {
            return Err(SourceError::FrameOutOfRange {
                index,
                len: self.time_len,
            });
        }

        let (row_start, row_end) = self.rows;
        let (col_start, col_end) = self.cols;
        let height = row_end - row_start;
        let width = col_end - col_start;

        let subset = ArraySubset::new_with_start_shape(
            vec![index as u64, row_start as u64, col_start as u64],
            vec![1, height as u64, width as u64],
        )
        .map_err(|e| SourceError::Zarr(e.to_string()))?;

        // Float64 stores are narrowed to f32, like the coordinate reader.
        let values: Vec<f32> = match self.data.data_type() {
            DataType::Float64 => self
                .data
                .retrieve_array_subset_elements::<f64>(&subset)
                .map_err(|e| SourceError::Zarr(e.to_string()))?
                .into_iter()
                .map(|v| v as f32)
                .collect(),
            _ => self
                .data
                .retrieve_array_subset_elements(&subset)
                .map_err(|e| SourceError::Zarr(e.to_string()))?,
        };

        debug!(index, width, height, "Read Zarr slab");

        let mut grid = Grid::new(width, height, values)?;
        if self.south_up {
            grid = grid.flipped_vertical();
        }

        Ok(LabeledGrid {
            grid,
            stamp: FrameStamp::lead(index as u32 * self.step_hours),
        })
    }
}

fn open_array<S: ReadableStorageTraits + Send + Sync + 'static>(
    storage: &Arc<S>,
    store_path: &str,
    name: &str,
) -> Result<Array<S>, SourceError> {
    let path = array_path(store_path, name);
    Array::open(storage.clone(), &path)
        .map_err(|e| SourceError::Zarr(format!("failed to open {path}: {e}")))
}

/// Join the store prefix and array name into an absolute node path.
fn array_path(store_path: &str, name: &str) -> String {
    let prefix = store_path.trim_matches('/');
    if prefix.is_empty() {
        format!("/{name}")
    } else {
        format!("/{prefix}/{name}")
    }
}

/// Read a 1-D coordinate array as f64, accepting f32 stores.
fn read_coordinates<S: ReadableStorageTraits + Send + Sync + 'static>(
    array: &Array<S>,
) -> Result<Vec<f64>, SourceError> {
    let shape = array.shape();
    if shape.len() != 1 {
        return Err(SourceError::Zarr(format!(
            "coordinate array has {} dimension(s), expected 1",
            shape.len()
        )));
    }

    let subset = ArraySubset::new_with_start_shape(vec![0], vec![shape[0]])
        .map_err(|e| SourceError::Zarr(e.to_string()))?;

    match array.data_type() {
        DataType::Float64 => array
            .retrieve_array_subset_elements::<f64>(&subset)
            .map_err(|e| SourceError::Zarr(e.to_string())),
        DataType::Float32 => Ok(array
            .retrieve_array_subset_elements::<f32>(&subset)
            .map_err(|e| SourceError::Zarr(e.to_string()))?
            .into_iter()
            .map(f64::from)
            .collect()),
        other => Err(SourceError::Zarr(format!(
            "coordinate array has unsupported data type {other:?}"
        ))),
    }
}

/// Contiguous index range [start, end) of coordinates within [lo, hi].
/// Assumes the coordinates are monotonic in either direction.
fn index_range(coords: &[f64], lo: f64, hi: f64) -> Option<(usize, usize)> {
    let mut first = None;
    let mut last = None;
    for (i, &value) in coords.iter().enumerate() {
        if value >= lo && value <= hi {
            if first.is_none() {
                first = Some(i);
            }
            last = Some(i);
        }
    }
    Some((first?, last? + 1))
}
