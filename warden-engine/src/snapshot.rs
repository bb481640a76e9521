use serde::{Deserialize, Serialize};
use warden_model::{DayId, DimensionKey, Metric, Total};

/// Current snapshot schema version. Bumped whenever the wire shape changes
/// in a way that is not forward-compatible (spec §6: "a schema version tag").
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub name: String,
    pub window_seconds: u32,
    pub buckets: Vec<(DimensionKey, usize, i64, i64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleStateSnapshot {
    pub rule_id: String,
    pub state: serde_json::Value,
}

/// Serializable engine state, per spec §6: "a schema version tag; for each
/// shard, the list of `(dim_key, day_id, metric -> value)` entries; for each
/// rate-limit rule, its per-key suspended flags and the raw bucket contents
/// of its window counter". Restoration is parameter-tolerant: fields missing
/// from an older producer default via `#[serde(default)]`; entries referring
/// to rules the restoring engine does not have are rejected (see
/// [`crate::RiskEngine::restore`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub store: Vec<(DimensionKey, DayId, Metric, Total)>,
    #[serde(default)]
    pub windows: Vec<WindowSnapshot>,
    #[serde(default)]
    pub rule_state: Vec<RuleStateSnapshot>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}
