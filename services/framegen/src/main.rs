//! Forecast frame generator.
//!
//! Fetches gridded forecast data from a configured source and renders a
//! numbered sequence of PNG heatmap frames:
//! - Image collection API (latest run of an ensemble member)
//! - Zarr array store on GCS (region slab per time step)
//! - HTTP inference endpoint (flat prediction per time index)

mod batch;
mod config;
mod credentials;
mod npy;
mod sources;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use renderer::{Gridlines, HeatmapSpec, Palette};
use wx_common::BoundingBox;

use config::SourceFile;

#[derive(Parser, Debug)]
#[command(name = "framegen")]
#[command(about = "Renders forecast grids as a numbered PNG frame sequence")]
struct Args {
    /// Source configuration file
    #[arg(
        short,
        long,
        env = "FRAMEGEN_CONFIG",
        default_value = "config/sources/weathernext.yaml"
    )]
    config: PathBuf,

    /// Number of frames to render in batch mode
    #[arg(short = 'n', long, default_value = "12")]
    frames: usize,

    /// Render a single 1-based frame and fail on any error
    #[arg(long, conflicts_with = "frames")]
    frame: Option<usize>,

    /// Output directory for rendered frames
    #[arg(short, long, env = "FRAMEGEN_OUT_DIR", default_value = "images")]
    out_dir: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!(config = %args.config.display(), "Starting forecast frame generator");

    let config = SourceFile::load(&args.config)?;

    let client = reqwest::Client::builder()
        .user_agent("forecast-frames/0.1")
        .build()
        .context("Failed to create HTTP client")?;

    let source = sources::build_source(&config.source, &client)
        .await
        .context("Source setup failed")?;

    info!(source = %source.describe(), "Source ready");

    let spec = heatmap_spec(&config, source.bbox())?;
    let title = config.render.title.as_deref();

    if let Some(frame) = args.frame {
        batch::run_single(source.as_ref(), &spec, title, &args.out_dir, frame).await?;
    } else {
        batch::run_batch(source.as_ref(), &spec, title, &args.out_dir, args.frames).await?;
    }

    Ok(())
}

/// Build the renderer spec from config, attaching gridlines when the source
/// reports its bounds.
fn heatmap_spec(config: &SourceFile, bbox: Option<BoundingBox>) -> Result<HeatmapSpec> {
    let palette = Palette::named(&config.render.palette)?;

    let gridlines = match (config.render.gridlines_deg, bbox) {
        (Some(interval_deg), Some(bbox)) => Some(Gridlines { bbox, interval_deg }),
        (Some(_), None) => {
            warn!("Gridlines requested but the source has no geographic bounds, skipping");
            None
        }
        _ => None,
    };

    Ok(HeatmapSpec {
        palette,
        min_value: config.render.min_value,
        max_value: config.render.max_value,
        output_width: config.render.output_width.map(|w| w as usize),
        flip_vertical: config.render.flip_vertical,
        gridlines,
    })
}
