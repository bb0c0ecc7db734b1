//! HTTP inference endpoint source.
//!
//! Sends one POST per frame asking the model for a channel at a time index,
//! then reshapes the flat prediction array into a square grid.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use wx_common::{BoundingBox, FrameStamp, Grid};

use super::{FrameSource, LabeledGrid, SourceError};
use crate::config::InferenceConfig;

pub struct InferenceSource {
    client: reqwest::Client,
    url: String,
    channel: String,
    token: String,
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    time_index: usize,
    channel: &'a str,
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    prediction: Vec<f32>,
}

impl InferenceSource {
    /// Build from config. Fails when the bearer token variable is unset, so
    /// a misconfigured run dies before any frames are attempted.
    pub fn from_config(config: &InferenceConfig) -> Result<Self, SourceError> {
        let token = std::env::var(&config.token_env)
            .map_err(|_| SourceError::MissingToken(config.token_env.clone()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            channel: config.channel.clone(),
            token,
        })
    }
}

#[async_trait]
impl FrameSource for InferenceSource {
    fn describe(&self) -> String {
        format!("inference channel {}", self.channel)
    }

    fn bbox(&self) -> Option<BoundingBox> {
        None
    }

    #[instrument(skip(self), fields(url = %self.url, channel = %self.channel))]
    async fn fetch_frame(&self, index: usize) -> Result<LabeledGrid, SourceError> {
        let request = InferenceRequest {
            time_index: index,
            channel: &self.channel,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { status, body });
        }

        let payload: InferenceResponse = response.json().await?;
        debug!(len = payload.prediction.len(), "Received prediction array");

        let grid = Grid::from_flat_square(payload.prediction)?;

        Ok(LabeledGrid {
            grid,
            stamp: FrameStamp::lead(index as u32),
        })
    }
}
