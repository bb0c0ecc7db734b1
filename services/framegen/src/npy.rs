//! Decoding of NPY pixel payloads into grids.

use wx_common::Grid;

use crate::sources::SourceError;

/// Decode a 2-D NPY payload into a grid.
///
/// Accepts C-order float32 and float64 arrays; float64 samples are narrowed
/// to f32, which is all the renderer keeps anyway.
pub fn decode_grid(bytes: &[u8]) -> Result<Grid, SourceError> {
    let npy = npyz::NpyFile::new(bytes)
        .map_err(|e| SourceError::Npy(format!("invalid NPY header: {e}")))?;

    let shape: Vec<u64> = npy.shape().to_vec();
    if shape.len() != 2 {
        return Err(SourceError::Npy(format!(
            "expected a 2-D array, got {} dimension(s)",
            shape.len()
        )));
    }
    if npy.order() != npyz::Order::C {
        return Err(SourceError::Npy(
            "Fortran-order arrays are not supported".to_string(),
        ));
    }

    let height = shape[0] as usize;
    let width = shape[1] as usize;

    let values: Vec<f32> = match npy.dtype() {
        npyz::DType::Plain(type_str) => {
            let descr = type_str.to_string();
            if descr.ends_with("f4") {
                npy.into_vec::<f32>()
                    .map_err(|e| SourceError::Npy(format!("failed to read f32 payload: {e}")))?
            } else if descr.ends_with("f8") {
                npy.into_vec::<f64>()
                    .map_err(|e| SourceError::Npy(format!("failed to read f64 payload: {e}")))?
                    .into_iter()
                    .map(|v| v as f32)
                    .collect()
            } else {
                return Err(SourceError::Npy(format!("unsupported dtype {descr}")));
            }
        }
        other => {
            return Err(SourceError::Npy(format!(
                "unsupported structured dtype {other:?}"
            )))
        }
    };

    Ok(Grid::new(width, height, values)?)
}
