//! Source configuration loading.
//!
//! Each run is driven by one YAML file that names the data source
//! (`type: collection | zarr | inference`) and how its frames should be
//! rendered. Which backend serves the frames is decided here, not by
//! separate binaries.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceFile {
    /// Which data source to pull frames from.
    pub source: SourceConfig,
    /// How frames are rendered.
    #[serde(default)]
    pub render: RenderConfig,
}

impl SourceFile {
    /// Load and parse a source configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: SourceFile = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}

/// Data source selection, tagged by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Image collection API: list assets, fetch pixels per asset.
    Collection(CollectionConfig),
    /// Zarr array store on GCS.
    Zarr(ZarrConfig),
    /// HTTP inference endpoint returning flat prediction arrays.
    Inference(InferenceConfig),
}

impl SourceConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Collection(_) => "collection",
            Self::Zarr(_) => "zarr",
            Self::Inference(_) => "inference",
        }
    }
}

/// Where Google service-account credentials come from.
///
/// The key file wins when it exists; the environment variable holds the same
/// JSON document for deployments without a mounted file.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,
    #[serde(default = "default_key_env")]
    pub env_var: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            key_file: default_key_file(),
            env_var: default_key_env(),
        }
    }
}

/// Image collection source settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionConfig {
    /// Full asset name of the image collection.
    pub collection: String,
    /// Band to request pixels for.
    #[serde(default = "default_band")]
    pub band: String,
    /// Ensemble member kept when selecting the latest run.
    #[serde(default = "default_member")]
    pub ensemble_member: String,
    /// Image property naming the ensemble member.
    #[serde(default = "default_member_property")]
    pub member_property: String,
    /// Image property naming the forecast hour.
    #[serde(default = "default_hour_property")]
    pub forecast_hour_property: String,
    /// Region of interest as [min_lon, min_lat, max_lon, max_lat].
    #[serde(default = "default_region")]
    pub region: [f64; 4],
    /// Requested pixel width; height follows the region's aspect ratio.
    #[serde(default = "default_dimensions")]
    pub dimensions: u32,
    /// API base URL.
    #[serde(default = "default_collection_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Zarr store source settings. The variable is expected to be dimensioned
/// [time, lat, lon].
#[derive(Debug, Clone, Deserialize)]
pub struct ZarrConfig {
    /// GCS bucket holding the store.
    pub bucket: String,
    /// Prefix of the Zarr hierarchy within the bucket.
    #[serde(default)]
    pub store_path: String,
    /// Data variable to read.
    pub variable: String,
    /// Name of the latitude coordinate array.
    #[serde(default = "default_latitude_array")]
    pub latitude_array: String,
    /// Name of the longitude coordinate array.
    #[serde(default = "default_longitude_array")]
    pub longitude_array: String,
    /// Region of interest as [min_lon, min_lat, max_lon, max_lat].
    #[serde(default = "default_region")]
    pub region: [f64; 4],
    /// Hours between consecutive steps on the time axis.
    #[serde(default = "default_step_hours")]
    pub time_step_hours: u32,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Inference endpoint source settings.
///
/// The bearer token is read from the named environment variable, never from
/// the config file itself.
#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    /// Inference endpoint URL.
    pub url: String,
    /// Output channel to request.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Shared rendering settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// Palette name understood by the renderer.
    #[serde(default = "default_palette")]
    pub palette: String,
    /// Fixed value mapped to the bottom of the palette.
    #[serde(default = "default_min_value")]
    pub min_value: f32,
    /// Fixed value mapped to the top of the palette.
    #[serde(default = "default_max_value")]
    pub max_value: f32,
    /// Upscale frames to this width, preserving aspect ratio.
    #[serde(default)]
    pub output_width: Option<u32>,
    /// Flip rows so the first input row renders at the bottom.
    #[serde(default)]
    pub flip_vertical: bool,
    /// Draw graticule lines at this spacing in degrees.
    #[serde(default)]
    pub gridlines_deg: Option<f64>,
    /// Title prefix; the frame's time label is appended.
    #[serde(default)]
    pub title: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            palette: default_palette(),
            min_value: default_min_value(),
            max_value: default_max_value(),
            output_width: None,
            flip_vertical: false,
            gridlines_deg: None,
            title: None,
        }
    }
}

fn default_key_file() -> PathBuf {
    PathBuf::from("gcp_key.json")
}

fn default_key_env() -> String {
    "GCP_SA_KEY".to_string()
}

fn default_band() -> String {
    "2m_temperature".to_string()
}

fn default_member() -> String {
    "0".to_string()
}

fn default_member_property() -> String {
    "ensemble_member".to_string()
}

fn default_hour_property() -> String {
    "forecast_hour".to_string()
}

fn default_region() -> [f64; 4] {
    // CONUS
    [-125.0, 24.0, -66.0, 50.0]
}

fn default_dimensions() -> u32 {
    1000
}

fn default_collection_base_url() -> String {
    "https://earthengine.googleapis.com/v1".to_string()
}

fn default_latitude_array() -> String {
    "latitude".to_string()
}

fn default_longitude_array() -> String {
    "longitude".to_string()
}

fn default_step_hours() -> u32 {
    6
}

fn default_channel() -> String {
    "maximum_radar_reflectivity".to_string()
}

fn default_token_env() -> String {
    "INFERENCE_API_TOKEN".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_palette() -> String {
    "thermal".to_string()
}

fn default_min_value() -> f32 {
    250.0
}

fn default_max_value() -> f32 {
    310.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collection_config() {
        let yaml = r#"
source:
  type: collection
  collection: projects/gcp-public-data-weathernext/assets/weathernext_2_0_0
  band: 2m_temperature
  ensemble_member: "0"
  region: [-125.0, 24.0, -66.0, 50.0]
  dimensions: 1000
  credentials:
    key_file: gcp_key.json
    env_var: GCP_SA_KEY

render:
  palette: thermal
  min_value: 250.0
  max_value: 310.0
  gridlines_deg: 10.0
  title: WeatherNext 2m temperature
"#;

        let config: SourceFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.source.kind(), "collection");
        let SourceConfig::Collection(collection) = config.source else {
            panic!("expected collection source");
        };
        assert_eq!(
            collection.collection,
            "projects/gcp-public-data-weathernext/assets/weathernext_2_0_0"
        );
        assert_eq!(collection.ensemble_member, "0");
        assert_eq!(collection.region, [-125.0, 24.0, -66.0, 50.0]);
        // Defaults fill what the file leaves out
        assert_eq!(collection.member_property, "ensemble_member");
        assert_eq!(collection.base_url, "https://earthengine.googleapis.com/v1");

        assert_eq!(config.render.palette, "thermal");
        assert_eq!(config.render.gridlines_deg, Some(10.0));
        assert_eq!(
            config.render.title.as_deref(),
            Some("WeatherNext 2m temperature")
        );
    }

    #[test]
    fn test_parse_zarr_config_minimal() {
        let yaml = r#"
source:
  type: zarr
  bucket: weathernext
  variable: 2m_temperature
"#;

        let config: SourceFile = serde_yaml::from_str(yaml).unwrap();
        let SourceConfig::Zarr(zarr) = config.source else {
            panic!("expected zarr source");
        };
        assert_eq!(zarr.bucket, "weathernext");
        assert_eq!(zarr.store_path, "");
        assert_eq!(zarr.latitude_array, "latitude");
        assert_eq!(zarr.longitude_array, "longitude");
        assert_eq!(zarr.time_step_hours, 6);
        assert_eq!(zarr.credentials.env_var, "GCP_SA_KEY");
        // Render section may be absent entirely
        assert_eq!(config.render.min_value, 250.0);
        assert_eq!(config.render.max_value, 310.0);
    }

    #[test]
    fn test_parse_inference_config() {
        let yaml = r#"
source:
  type: inference
  url: https://ai.api.nvidia.com/v1/genai/nvidia/corrdiff

render:
  palette: inferno
  min_value: 0.0
  max_value: 60.0
  flip_vertical: true
"#;

        let config: SourceFile = serde_yaml::from_str(yaml).unwrap();
        let SourceConfig::Inference(inference) = config.source else {
            panic!("expected inference source");
        };
        assert_eq!(inference.channel, "maximum_radar_reflectivity");
        assert_eq!(inference.token_env, "INFERENCE_API_TOKEN");
        assert_eq!(inference.timeout_secs, 60);
        assert!(config.render.flip_vertical);
    }

    #[test]
    fn test_unknown_source_type_rejected() {
        let yaml = r#"
source:
  type: carrier_pigeon
  url: nowhere
"#;
        assert!(serde_yaml::from_str::<SourceFile>(yaml).is_err());
    }

    #[test]
    fn test_missing_required_field_rejected() {
        // zarr without a variable
        let yaml = r#"
source:
  type: zarr
  bucket: weathernext
"#;
        assert!(serde_yaml::from_str::<SourceFile>(yaml).is_err());
    }
}
