//! Heatmap rendering for gridded forecast data.

use crate::error::RenderError;
use crate::palette::{Palette, OVERLAY_INDEX, TRANSPARENT_INDEX};
use crate::png::{self, TextChunk};
use tracing::debug;
use wx_common::{BoundingBox, Grid};

/// Gridline overlay drawn every `interval_deg` degrees across `bbox`.
#[derive(Debug, Clone)]
pub struct Gridlines {
    pub bbox: BoundingBox,
    pub interval_deg: f64,
}

/// Rendering parameters shared by every frame of a run.
#[derive(Debug, Clone)]
pub struct HeatmapSpec {
    pub palette: Palette,
    /// Value mapped to the bottom of the ramp.
    pub min_value: f32,
    /// Value mapped to the top of the ramp.
    pub max_value: f32,
    /// Resample output to this width, keeping the aspect ratio.
    pub output_width: Option<usize>,
    /// Reverse row order for sources that deliver row 0 at the south edge.
    pub flip_vertical: bool,
    pub gridlines: Option<Gridlines>,
}

/// Render a grid to palette indices.
///
/// Returns the index buffer and its (width, height).
pub fn render_indices(grid: &Grid, spec: &HeatmapSpec) -> (Vec<u8>, usize, usize) {
    let oriented;
    let grid = if spec.flip_vertical {
        oriented = grid.flipped_vertical();
        &oriented
    } else {
        grid
    };

    let (values, width, height) = match spec.output_width {
        Some(target) if target != grid.width() => {
            let dst_h = (((grid.height() * target) as f64 / grid.width() as f64).round() as usize)
                .max(1);
            (
                resample(grid.values(), grid.width(), grid.height(), target, dst_h),
                target,
                dst_h,
            )
        }
        _ => (grid.values().to_vec(), grid.width(), grid.height()),
    };

    let range = spec.max_value - spec.min_value;
    let range = if range.abs() < 0.001 { 1.0 } else { range };

    let mut indices = Vec::with_capacity(values.len());
    for value in values {
        if value.is_nan() {
            indices.push(TRANSPARENT_INDEX);
        } else {
            let normalized = (value - spec.min_value) / range;
            indices.push(spec.palette.index_for(normalized));
        }
    }

    if let Some(gl) = &spec.gridlines {
        draw_gridlines(&mut indices, width, height, gl);
    }

    (indices, width, height)
}

/// Render a grid straight to PNG bytes, with the title (when given) and the
/// producing tool recorded as `tEXt` metadata.
pub fn render_png(
    grid: &Grid,
    spec: &HeatmapSpec,
    title: Option<&str>,
) -> Result<Vec<u8>, RenderError> {
    let (indices, width, height) = render_indices(grid, spec);

    let mut texts = Vec::with_capacity(2);
    if let Some(title) = title {
        texts.push(TextChunk::new("Title", title));
    }
    texts.push(TextChunk::new("Software", "forecast-frames"));

    let png = png::encode_indexed(width, height, &spec.palette.plte_entries(), &indices, &texts)?;
    debug!(
        width,
        height,
        palette = %spec.palette.name(),
        bytes = png.len(),
        "encoded frame"
    );
    Ok(png)
}

/// Bilinear resample, NaN-aware.
///
/// A destination sample interpolates over its finite source corners only;
/// it is NaN when all four corners are NaN.
fn resample(
    data: &[f32],
    src_width: usize,
    src_height: usize,
    dst_width: usize,
    dst_height: usize,
) -> Vec<f32> {
    if src_width == dst_width && src_height == dst_height {
        return data.to_vec();
    }

    let mut output = vec![0.0f32; dst_width * dst_height];

    let x_ratio = if dst_width > 1 {
        (src_width - 1) as f32 / (dst_width - 1) as f32
    } else {
        0.0
    };
    let y_ratio = if dst_height > 1 {
        (src_height - 1) as f32 / (dst_height - 1) as f32
    } else {
        0.0
    };

    for y in 0..dst_height {
        for x in 0..dst_width {
            let src_x = x as f32 * x_ratio;
            let src_y = y as f32 * y_ratio;

            let x1 = src_x.floor() as usize;
            let y1 = src_y.floor() as usize;
            let x2 = (x1 + 1).min(src_width - 1);
            let y2 = (y1 + 1).min(src_height - 1);

            let dx = src_x - x1 as f32;
            let dy = src_y - y1 as f32;

            let corners = [
                (data[y1 * src_width + x1], (1.0 - dx) * (1.0 - dy)),
                (data[y1 * src_width + x2], dx * (1.0 - dy)),
                (data[y2 * src_width + x1], (1.0 - dx) * dy),
                (data[y2 * src_width + x2], dx * dy),
            ];

            let mut sum = 0.0f32;
            let mut weight = 0.0f32;
            for (v, w) in corners {
                if !v.is_nan() {
                    sum += v * w;
                    weight += w;
                }
            }

            output[y * dst_width + x] = if weight > 0.0 { sum / weight } else { f32::NAN };
        }
    }

    output
}

/// Paint gridline rows/columns with the overlay palette slot.
///
/// Row 0 is the north edge, so latitude lines map top-down.
fn draw_gridlines(indices: &mut [u8], width: usize, height: usize, gl: &Gridlines) {
    if gl.interval_deg <= 0.0 {
        return;
    }

    let bbox = &gl.bbox;

    let mut lon = (bbox.min_x / gl.interval_deg).ceil() * gl.interval_deg;
    while lon <= bbox.max_x {
        let col = ((lon - bbox.min_x) / bbox.width() * (width - 1) as f64).round() as usize;
        if col < width {
            for row in 0..height {
                indices[row * width + col] = OVERLAY_INDEX;
            }
        }
        lon += gl.interval_deg;
    }

    let mut lat = (bbox.min_y / gl.interval_deg).ceil() * gl.interval_deg;
    while lat <= bbox.max_y {
        let row = ((bbox.max_y - lat) / bbox.height() * (height - 1) as f64).round() as usize;
        if row < height {
            for col in 0..width {
                indices[row * width + col] = OVERLAY_INDEX;
            }
        }
        lat += gl.interval_deg;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::RAMP_LEVELS;

    fn spec(palette: &str, min: f32, max: f32) -> HeatmapSpec {
        HeatmapSpec {
            palette: Palette::named(palette).unwrap(),
            min_value: min,
            max_value: max,
            output_width: None,
            flip_vertical: false,
            gridlines: None,
        }
    }

    #[test]
    fn test_value_mapping_endpoints() {
        let grid = Grid::new(3, 1, vec![250.0, 280.0, 310.0]).unwrap();
        let (indices, w, h) = render_indices(&grid, &spec("thermal", 250.0, 310.0));
        assert_eq!((w, h), (3, 1));
        assert_eq!(indices[0], 0);
        assert_eq!(indices[2], (RAMP_LEVELS - 1) as u8);
        assert!(indices[1] > 0 && indices[1] < (RAMP_LEVELS - 1) as u8);
    }

    #[test]
    fn test_out_of_range_clamps() {
        let grid = Grid::new(2, 1, vec![-100.0, 1000.0]).unwrap();
        let (indices, _, _) = render_indices(&grid, &spec("grayscale", 0.0, 60.0));
        assert_eq!(indices[0], 0);
        assert_eq!(indices[1], (RAMP_LEVELS - 1) as u8);
    }

    #[test]
    fn test_nan_is_transparent() {
        let grid = Grid::new(2, 1, vec![f32::NAN, 30.0]).unwrap();
        let (indices, _, _) = render_indices(&grid, &spec("grayscale", 0.0, 60.0));
        assert_eq!(indices[0], TRANSPARENT_INDEX);
        assert_ne!(indices[1], TRANSPARENT_INDEX);
    }

    #[test]
    fn test_flip_vertical() {
        let grid = Grid::new(1, 2, vec![0.0, 60.0]).unwrap();
        let mut s = spec("grayscale", 0.0, 60.0);
        s.flip_vertical = true;
        let (indices, _, _) = render_indices(&grid, &s);
        assert_eq!(indices[0], (RAMP_LEVELS - 1) as u8);
        assert_eq!(indices[1], 0);
    }

    #[test]
    fn test_upscale_dimensions() {
        let grid = Grid::new(4, 2, vec![1.0; 8]).unwrap();
        let mut s = spec("grayscale", 0.0, 2.0);
        s.output_width = Some(8);
        let (indices, w, h) = render_indices(&grid, &s);
        assert_eq!((w, h), (8, 4));
        assert_eq!(indices.len(), 32);
    }

    #[test]
    fn test_resample_interpolates() {
        let out = resample(&[0.0, 10.0], 2, 1, 3, 1);
        assert_eq!(out.len(), 3);
        assert!((out[0] - 0.0).abs() < 1e-5);
        assert!((out[1] - 5.0).abs() < 1e-5);
        assert!((out[2] - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_resample_skips_nan_corners() {
        let out = resample(&[f32::NAN, 10.0], 2, 1, 3, 1);
        assert!(out[0].is_nan());
        assert!((out[1] - 10.0).abs() < 1e-5);
        assert!((out[2] - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_gridlines_painted() {
        let grid = Grid::new(11, 11, vec![0.5; 121]).unwrap();
        let mut s = spec("grayscale", 0.0, 1.0);
        s.gridlines = Some(Gridlines {
            bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap(),
            interval_deg: 5.0,
        });
        let (indices, w, _) = render_indices(&grid, &s);

        // Lines at 0, 5, and 10 degrees: columns/rows 0, 5, 10.
        for col in [0usize, 5, 10] {
            assert_eq!(indices[3 * w + col], OVERLAY_INDEX);
        }
        for row in [0usize, 5, 10] {
            assert_eq!(indices[row * w + 3], OVERLAY_INDEX);
        }
        assert_ne!(indices[3 * w + 4], OVERLAY_INDEX);
    }

    #[test]
    fn test_render_png_has_signature() {
        let grid = Grid::from_flat_square(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let png = render_png(&grid, &spec("thermal", 0.0, 4.0), Some("+6h")).unwrap();
        assert_eq!(&png[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    }
}
