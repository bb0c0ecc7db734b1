//! Frame loop.
//!
//! Renders a fixed number of frames. In batch mode a failed frame is logged
//! and skipped so one bad fetch does not cost the frames after it; in
//! single-frame mode the error propagates and fails the run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use renderer::HeatmapSpec;
use tracing::{debug, error, info};

use crate::sources::FrameSource;

/// Counts for one batch run.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchOutcome {
    pub attempted: usize,
    pub rendered: usize,
    pub failed: usize,
}

/// Render frames 1..=count into `out_dir`, skipping failures.
pub async fn run_batch(
    source: &dyn FrameSource,
    spec: &HeatmapSpec,
    title: Option<&str>,
    out_dir: &Path,
    count: usize,
) -> Result<BatchOutcome> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    let mut outcome = BatchOutcome::default();

    for index in 0..count {
        outcome.attempted += 1;
        match render_frame(source, spec, title, out_dir, index).await {
            Ok(path) => {
                outcome.rendered += 1;
                info!(frame = index + 1, path = %path.display(), "Saved frame");
            }
            Err(e) => {
                outcome.failed += 1;
                error!(frame = index + 1, error = %e, "Frame failed, continuing");
            }
        }
    }

    info!(
        attempted = outcome.attempted,
        rendered = outcome.rendered,
        failed = outcome.failed,
        "Batch finished"
    );

    Ok(outcome)
}

/// Render exactly one 1-based frame, propagating any failure.
pub async fn run_single(
    source: &dyn FrameSource,
    spec: &HeatmapSpec,
    title: Option<&str>,
    out_dir: &Path,
    frame_number: usize,
) -> Result<PathBuf> {
    anyhow::ensure!(frame_number >= 1, "frame numbers are 1-based");

    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    let path = render_frame(source, spec, title, out_dir, frame_number - 1).await?;
    info!(frame = frame_number, path = %path.display(), "Saved frame");
    Ok(path)
}

async fn render_frame(
    source: &dyn FrameSource,
    spec: &HeatmapSpec,
    title: Option<&str>,
    out_dir: &Path,
    index: usize,
) -> Result<PathBuf> {
    let labeled = source
        .fetch_frame(index)
        .await
        .with_context(|| format!("Failed to fetch frame {}", index + 1))?;

    if let Some((lo, hi)) = labeled.grid.finite_min_max() {
        debug!(frame = index + 1, min = lo, max = hi, "Fetched grid");
    }

    let frame_title = match title {
        Some(prefix) => format!("{} {}", prefix, labeled.stamp),
        None => format!("{} {}", source.describe(), labeled.stamp),
    };

    let png = renderer::render_png(&labeled.grid, spec, Some(&frame_title))?;

    let path = out_dir.join(format!("frame_{:02}.png", index + 1));
    tokio::fs::write(&path, &png)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(path)
}
