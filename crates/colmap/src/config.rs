use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How long a built snapshot stays fresh without a forced rebuild.
pub const DEFAULT_TTL: Duration = Duration::from_millis(90_000);

/// Upper bound on data rows advertised per column, counted from the first data row.
pub const MAX_DATA_ROWS_PER_COLUMN: u32 = 50_000;

/// Tunables for [`SnapshotCache`](crate::SnapshotCache).
///
/// The header-row policy (exactly one header row, data from the second row of
/// the used range) is fixed and deliberately not part of the configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotConfig {
    #[serde(rename = "ttlMs", with = "duration_ms")]
    pub ttl: Duration,
    pub max_data_rows: u32,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_data_rows: MAX_DATA_ROWS_PER_COLUMN,
        }
    }
}

impl SnapshotConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_data_rows(mut self, rows: u32) -> Self {
        self.max_data_rows = rows;
        self
    }

    /// Parse from JSON such as `{"ttlMs": 30000, "maxDataRows": 1000}`.
    /// Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
