//! Frame sources.
//!
//! A frame source produces one labeled 2-D grid per frame index. The three
//! implementations cover the supported backends: an image collection API, a
//! Zarr store on GCS, and an HTTP inference endpoint. Which one a run uses
//! is decided by the `type` field of its source config.

mod collection;
mod gcs;
mod inference;
mod zarr;

pub use collection::CollectionSource;
pub use inference::InferenceSource;
pub use zarr::ZarrSource;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;
use wx_common::{BboxParseError, BoundingBox, FrameStamp, Grid, GridError};

use crate::config::SourceConfig;
use crate::credentials::{CredentialError, Credentials};

/// OAuth2 scope for the image collection API.
const EARTH_ENGINE_SCOPE: &str = "https://www.googleapis.com/auth/earthengine";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response. The body is kept verbatim so operators see
    /// exactly what the service said.
    #[error("{status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("invalid region: {0}")]
    Region(#[from] BboxParseError),

    #[error("unexpected response payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("NPY decode failed: {0}")]
    Npy(String),

    #[error("Zarr read failed: {0}")]
    Zarr(String),

    #[error("collection {collection} has no usable images for member {member}")]
    NoImages { collection: String, member: String },

    #[error("frame index {index} is outside the source's {len} available steps")]
    FrameOutOfRange { index: usize, len: usize },

    #[error("region does not intersect the store's coordinates: {0}")]
    EmptyRegion(String),

    #[error("bearer token environment variable ${0} is not set")]
    MissingToken(String),
}

/// A grid plus the time label it should be titled with.
#[derive(Debug, Clone)]
pub struct LabeledGrid {
    pub grid: Grid,
    pub stamp: FrameStamp,
}

/// One backend able to serve a sequence of forecast grids.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Short human-readable description, used in logs and default titles.
    fn describe(&self) -> String;

    /// Geographic bounds of served grids, when the source knows them.
    fn bbox(&self) -> Option<BoundingBox>;

    /// Fetch the grid for 0-based frame `index`.
    async fn fetch_frame(&self, index: usize) -> Result<LabeledGrid, SourceError>;
}

/// Build the configured source. Errors here are setup failures and fatal to
/// the run, unlike per-frame fetch errors.
pub async fn build_source(
    config: &SourceConfig,
    client: &reqwest::Client,
) -> Result<Box<dyn FrameSource>, SourceError> {
    info!(kind = config.kind(), "Setting up frame source");

    match config {
        SourceConfig::Collection(cfg) => {
            let credentials =
                Credentials::resolve(&cfg.credentials.key_file, &cfg.credentials.env_var)?;
            let source = CollectionSource::open(cfg, &credentials, client).await?;
            Ok(Box::new(source))
        }
        SourceConfig::Zarr(cfg) => {
            let credentials =
                Credentials::resolve(&cfg.credentials.key_file, &cfg.credentials.env_var)?;
            let storage = gcs::open_bucket(&cfg.bucket, credentials.key_json())?;
            let source = ZarrSource::open(storage, cfg)?;
            Ok(Box::new(source))
        }
        SourceConfig::Inference(cfg) => Ok(Box::new(InferenceSource::from_config(cfg)?)),
    }
}
