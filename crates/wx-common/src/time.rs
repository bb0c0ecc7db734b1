//! Time handling for forecast frames.

use crate::error::TimeParseError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The time identity of one frame.
///
/// Sources that know their model run carry it; sources that only know the
/// lead time (e.g. an inference endpoint indexed by hour) carry that alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameStamp {
    /// Model run time plus forecast offset.
    Run {
        reference_time: DateTime<Utc>,
        forecast_hour: u32,
    },
    /// Bare forecast offset.
    Lead { forecast_hour: u32 },
}

impl FrameStamp {
    pub fn run(reference_time: DateTime<Utc>, forecast_hour: u32) -> Self {
        Self::Run {
            reference_time,
            forecast_hour,
        }
    }

    pub fn lead(forecast_hour: u32) -> Self {
        Self::Lead { forecast_hour }
    }

    pub fn forecast_hour(&self) -> u32 {
        match self {
            Self::Run { forecast_hour, .. } | Self::Lead { forecast_hour } => *forecast_hour,
        }
    }

    /// Actual valid time (reference + offset), when the run is known.
    pub fn valid_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Run {
                reference_time,
                forecast_hour,
            } => Some(*reference_time + Duration::hours(*forecast_hour as i64)),
            Self::Lead { .. } => None,
        }
    }
}

impl fmt::Display for FrameStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run {
                reference_time,
                forecast_hour,
            } => write!(
                f,
                "{} +{:03}h",
                reference_time.format("%Y-%m-%d %HZ"),
                forecast_hour
            ),
            Self::Lead { forecast_hour } => write!(f, "+{}h", forecast_hour),
        }
    }
}

/// Parse an ISO 8601 timestamp, accepting the partial forms collection
/// metadata shows up in.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    // Full datetime with timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Without timezone (assume UTC)
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    // Date only
    if let Ok(nd) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = nd.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// Convert epoch milliseconds (the other shape collection timestamps take).
pub fn from_epoch_millis(ms: i64) -> Result<DateTime<Utc>, TimeParseError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or(TimeParseError::EpochOutOfRange(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_datetime("2024-01-15T12:00:00Z").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn test_parse_partial_forms() {
        let naive = parse_datetime("2024-01-15T06:00:00").unwrap();
        assert_eq!(naive.hour(), 6);

        let date_only = parse_datetime("2024-01-15").unwrap();
        assert_eq!(date_only.hour(), 0);

        assert!(parse_datetime("20240115").is_err());
    }

    #[test]
    fn test_epoch_millis() {
        let dt = from_epoch_millis(1_705_320_000_000).unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn test_stamp_labels() {
        let run = FrameStamp::run(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(), 6);
        assert_eq!(run.to_string(), "2024-01-15 12Z +006h");
        assert_eq!(
            run.valid_datetime().unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 18, 0, 0).unwrap()
        );

        let lead = FrameStamp::lead(7);
        assert_eq!(lead.to_string(), "+7h");
        assert_eq!(lead.valid_datetime(), None);
        assert_eq!(lead.forecast_hour(), 7);
    }
}
