use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};

/// Layouts Go's `time.Time.String()` produces, after the zone abbreviation
/// and monotonic clock reading have been dropped.
const LEGACY_LAYOUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%d %H:%M:%S %z"];

/// Represents a single task in the tracker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Unique identifier within a store.
    pub id: u64,
    /// What needs doing.
    pub content: String,
    /// Whether the task has been completed.
    #[serde(default)]
    pub done: bool,
    /// Timestamp when the task was created (RFC 3339 for new tasks).
    #[serde(default)]
    pub created_at: String,
}

impl Task {
    /// Builds a fresh, not-yet-done task stamped with the current local time.
    pub fn new(id: u64, content: impl Into<String>) -> Self {
        Task {
            id,
            content: content.into(),
            done: false,
            created_at: Local::now().to_rfc3339(),
        }
    }

    /// Parses `created_at`, accepting both RFC 3339 and legacy Go timestamps.
    pub fn created_time(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(&self.created_at)
    }
}

/// Parses a stored timestamp.
///
/// Legacy values look like `2025-03-01 09:30:00.123456789 +0800 CST m=+0.01`;
/// only the first three fields carry the instant.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    let head = raw.split_whitespace().take(3).collect::<Vec<_>>().join(" ");
    LEGACY_LAYOUTS
        .iter()
        .find_map(|layout| DateTime::parse_from_str(&head, layout).ok())
}
