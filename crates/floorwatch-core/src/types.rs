use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rectangular region on the source image, in pixels. Origin is arbitrary;
/// width and height are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A monitored physical zone, optionally mapped to a region on the still.
/// A zone without a region is configured by name only and is skipped when
/// the worker is launched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub region: Option<Region>,
}

/// One captured worker output line. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Epoch milliseconds at capture time.
    pub timestamp: i64,
    pub text: String,
}

/// One contiguous occupied interval for a zone. Open until an end time is
/// recorded; `end_time` and `duration_minutes` are always set together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub zone_id: i64,
    /// Epoch milliseconds.
    pub start_time: i64,
    #[serde(default)]
    pub end_time: Option<i64>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
}

impl Session {
    pub fn open(zone_id: i64, start_time: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            zone_id,
            start_time,
            end_time: None,
            duration_minutes: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Record the end of the interval. Elapsed time is clamped at zero and
    /// rounded to whole minutes, ties up.
    pub fn close(&mut self, end_time: i64) {
        let elapsed_ms = (end_time - self.start_time).max(0);
        self.duration_minutes = Some(round_to_minutes(elapsed_ms));
        self.end_time = Some(end_time);
    }
}

/// Whole-minute rounding of a non-negative millisecond interval, half up.
pub fn round_to_minutes(elapsed_ms: i64) -> i64 {
    (elapsed_ms + 30_000) / 60_000
}

/// Epoch milliseconds now.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
