//! Image collection API source.
//!
//! Lists the collection once at startup, keeps the newest forecast run for
//! the configured ensemble member, and fetches pixels per frame as NPY.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use wx_common::time::{from_epoch_millis, parse_datetime};
use wx_common::{BoundingBox, FrameStamp};

use super::{FrameSource, LabeledGrid, SourceError, EARTH_ENGINE_SCOPE};
use crate::config::CollectionConfig;
use crate::credentials::Credentials;
use crate::npy;

/// Images requested per list call.
const LIST_PAGE_SIZE: u32 = 1000;

pub struct CollectionSource {
    client: reqwest::Client,
    token: String,
    base_url: String,
    collection: String,
    band: String,
    region: BoundingBox,
    width: u32,
    height: u32,
    run_time: DateTime<Utc>,
    frames: Vec<CollectionFrame>,
}

/// One asset of the selected run.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CollectionFrame {
    name: String,
    forecast_hour: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListImagesResponse {
    #[serde(default)]
    images: Vec<ImageEntry>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageEntry {
    name: String,
    /// RFC 3339 run start, when the API surfaces it at the image level.
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    properties: serde_json::Map<String, Value>,
}

impl CollectionSource {
    /// List the collection and pin the newest run of the configured member.
    pub async fn open(
        config: &CollectionConfig,
        credentials: &Credentials,
        client: &reqwest::Client,
    ) -> Result<Self, SourceError> {
        let token = credentials
            .access_token(client, &[EARTH_ENGINE_SCOPE])
            .await?;
        let region = BoundingBox::try_from(config.region)?;

        let images = list_all_images(client, &token, &config.base_url, &config.collection).await?;
        info!(
            collection = %config.collection,
            count = images.len(),
            "Listed collection"
        );

        let mut candidates: Vec<(DateTime<Utc>, u32, String)> = Vec::new();
        for image in &images {
            let Some(member) = property_string(&image.properties, &config.member_property) else {
                continue;
            };
            if member != config.ensemble_member {
                continue;
            }
            let Some(start) = image_start_time(image) else {
                warn!(image = %image.name, "Skipping image without a parseable start time");
                continue;
            };
            let Some(hour) = property_u32(&image.properties, &config.forecast_hour_property)
            else {
                warn!(image = %image.name, "Skipping image without a forecast hour");
                continue;
            };
            candidates.push((start, hour, image.name.clone()));
        }

        let (run_time, frames) =
            select_latest_run(candidates).ok_or_else(|| SourceError::NoImages {
                collection: config.collection.clone(),
                member: config.ensemble_member.clone(),
            })?;

        info!(run = %run_time, frames = frames.len(), "Selected forecast run");

        let width = config.dimensions;
        let height = ((config.dimensions as f64) * region.height() / region.width())
            .round()
            .max(1.0) as u32;

        Ok(Self {
            client: client.clone(),
            token,
            base_url: config.base_url.clone(),
            collection: config.collection.clone(),
            band: config.band.clone(),
            region,
            width,
            height,
            run_time,
            frames,
        })
    }
}

#[async_trait]
impl FrameSource for CollectionSource {
    fn describe(&self) -> String {
        format!("collection {} band {}", self.collection, self.band)
    }

    fn bbox(&self) -> Option<BoundingBox> {
        Some(self.region)
    }

    #[instrument(skip(self), fields(band = %self.band))]
    async fn fetch_frame(&self, index: usize) -> Result<LabeledGrid, SourceError> {
        let frame = self
            .frames
            .get(index)
            .ok_or(SourceError::FrameOutOfRange {
                index,
                len: self.frames.len(),
            })?;

        let url = format!(
            "{}/{}:getPixels",
            self.base_url.trim_end_matches('/'),
            frame.name
        );
        let body = json!({
            "fileFormat": "NPY",
            "bandIds": [self.band],
            "grid": { "dimensions": { "width": self.width, "height": self.height } },
            "region": region_polygon(&self.region),
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { status, body: text });
        }

        let payload: Bytes = response.bytes().await?;
        debug!(image = %frame.name, bytes = payload.len(), "Fetched pixel payload");

        let grid = npy::decode_grid(&payload)?;

        Ok(LabeledGrid {
            grid,
            stamp: FrameStamp::run(self.run_time, frame.forecast_hour),
        })
    }
}

async fn list_all_images(
    client: &reqwest::Client,
    token: &str,
    base_url: &str,
    collection: &str,
) -> Result<Vec<ImageEntry>, SourceError> {
    let url = format!("{}/{}:listImages", base_url.trim_end_matches('/'), collection);
    let mut images = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut request = client
            .get(&url)
            .bearer_auth(token)
            .query(&[("pageSize", LIST_PAGE_SIZE.to_string())]);
        if let Some(next) = &page_token {
            request = request.query(&[("pageToken", next.clone())]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { status, body });
        }

        let raw: Bytes = response.bytes().await?;
        let page: ListImagesResponse = serde_json::from_slice(&raw)?;
        images.extend(page.images);

        match page.next_page_token {
            Some(next) if !next.is_empty() => page_token = Some(next),
            _ => break,
        }
    }

    Ok(images)
}

/// Pick the newest run start among candidates and order its frames by hour.
///
/// Starts are compared as datetimes, so runs sort correctly regardless of
/// how the API formatted its timestamps.
fn select_latest_run(
    candidates: Vec<(DateTime<Utc>, u32, String)>,
) -> Option<(DateTime<Utc>, Vec<CollectionFrame>)> {
    let run_time = candidates.iter().map(|(start, _, _)| *start).max()?;

    let mut frames: Vec<CollectionFrame> = candidates
        .into_iter()
        .filter(|(start, _, _)| *start == run_time)
        .map(|(_, forecast_hour, name)| CollectionFrame {
            name,
            forecast_hour,
        })
        .collect();
    frames.sort_by_key(|f| f.forecast_hour);
    frames.dedup_by_key(|f| f.forecast_hour);

    Some((run_time, frames))
}

fn property_string(props: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match props.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn property_u32(props: &serde_json::Map<String, Value>, key: &str) -> Option<u32> {
    match props.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Run start for an image: the RFC 3339 field when present, otherwise the
/// epoch-millisecond `start_time` property.
fn image_start_time(image: &ImageEntry) -> Option<DateTime<Utc>> {
    if let Some(raw) = &image.start_time {
        if let Ok(dt) = parse_datetime(raw) {
            return Some(dt);
        }
    }
    match image.properties.get("start_time") {
        Some(Value::Number(n)) => n.as_i64().and_then(|ms| from_epoch_millis(ms).ok()),
        Some(Value::String(s)) => parse_datetime(s).ok(),
        _ => None,
    }
}

fn region_polygon(bbox: &BoundingBox) -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[
            [bbox.min_x, bbox.min_y],
            [bbox.max_x, bbox.min_y],
            [bbox.max_x, bbox.max_y],
            [bbox.min_x, bbox.max_y],
            [bbox.min_x, bbox.min_y],
        ]],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(start: &str, hour: u32, name: &str) -> (DateTime<Utc>, u32, String) {
        (parse_datetime(start).unwrap(), hour, name.to_string())
    }

    #[test]
    fn test_latest_run_selected_by_datetime() {
        let candidates = vec![
            candidate("2024-01-02T00:00:00Z", 0, "old/0"),
            candidate("2024-01-02T00:00:00Z", 6, "old/6"),
            candidate("2024-01-10T00:00:00Z", 6, "new/6"),
            candidate("2024-01-10T00:00:00Z", 0, "new/0"),
        ];

        let (run, frames) = select_latest_run(candidates).unwrap();
        assert_eq!(run, parse_datetime("2024-01-10T00:00:00Z").unwrap());
        // Only the newest run survives, ordered by forecast hour
        assert_eq!(
            frames,
            vec![
                CollectionFrame {
                    name: "new/0".to_string(),
                    forecast_hour: 0
                },
                CollectionFrame {
                    name: "new/6".to_string(),
                    forecast_hour: 6
                },
            ]
        );
    }

    #[test]
    fn test_runs_compared_chronologically_not_lexically() {
        // "2024-01-02T00:00:00+05:00" sorts after "2024-01-01T22:00:00Z" as
        // a string but is 2024-01-01T19:00:00Z once parsed.
        let candidates = vec![
            candidate("2024-01-02T00:00:00+05:00", 0, "offset/0"),
            candidate("2024-01-01T22:00:00Z", 0, "utc/0"),
        ];

        let (run, frames) = select_latest_run(candidates).unwrap();
        assert_eq!(run, parse_datetime("2024-01-01T22:00:00Z").unwrap());
        assert_eq!(frames[0].name, "utc/0");
    }

    #[test]
    fn test_duplicate_hours_deduped() {
        let candidates = vec![
            candidate("2024-01-10T00:00:00Z", 6, "a"),
            candidate("2024-01-10T00:00:00Z", 6, "b"),
        ];
        let (_, frames) = select_latest_run(candidates).unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_no_candidates_yields_none() {
        assert!(select_latest_run(Vec::new()).is_none());
    }

    #[test]
    fn test_image_start_time_prefers_rfc3339_field() {
        let entry: ImageEntry = serde_json::from_value(json!({
            "name": "projects/x/assets/y",
            "startTime": "2024-01-15T12:00:00Z",
            "properties": { "start_time": 0 }
        }))
        .unwrap();

        let dt = image_start_time(&entry).unwrap();
        assert_eq!(dt, parse_datetime("2024-01-15T12:00:00Z").unwrap());
    }

    #[test]
    fn test_image_start_time_falls_back_to_epoch_millis() {
        let entry: ImageEntry = serde_json::from_value(json!({
            "name": "projects/x/assets/y",
            "properties": { "start_time": 1_705_320_000_000i64 }
        }))
        .unwrap();

        let dt = image_start_time(&entry).unwrap();
        assert_eq!(dt, parse_datetime("2024-01-15T12:00:00Z").unwrap());
    }

    #[test]
    fn test_property_coercions() {
        let props: serde_json::Map<String, Value> = serde_json::from_value(json!({
            "member_str": "0",
            "member_num": 0,
            "hour_str": "12",
            "hour_num": 12,
        }))
        .unwrap();

        assert_eq!(property_string(&props, "member_str").as_deref(), Some("0"));
        assert_eq!(property_string(&props, "member_num").as_deref(), Some("0"));
        assert_eq!(property_u32(&props, "hour_str"), Some(12));
        assert_eq!(property_u32(&props, "hour_num"), Some(12));
        assert_eq!(property_u32(&props, "absent"), None);
    }

    #[test]
    fn test_region_polygon_closes_ring() {
        let bbox = BoundingBox::new(-125.0, 24.0, -66.0, 50.0).unwrap();
        let polygon = region_polygon(&bbox);

        let ring = polygon["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
        assert_eq!(ring[0][0], -125.0);
        assert_eq!(ring[2][1], 50.0);
    }
}
