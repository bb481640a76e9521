use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Well-known dimension names recognised by [`warden_catalog::Catalog`].
///
/// Extension names are plain strings registered at runtime; these constants
/// just save callers from typo'ing the built-in five.
pub mod names {
    pub const ACCOUNT_ID: &str = "account_id";
    pub const CONTRACT_ID: &str = "contract_id";
    pub const PRODUCT_ID: &str = "product_id";
    pub const EXCHANGE_ID: &str = "exchange_id";
    pub const ACCOUNT_GROUP_ID: &str = "account_group_id";
}

/// A sorted, deduplicated tuple of `(name, value)` pairs forming the canonical
/// identity of an event's aggregation scope.
///
/// Two keys with the same active names and values compare equal and hash
/// equal, regardless of the order names were inserted in.
#[derive(Debug, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct DimensionKey(Vec<(SmolStr, SmolStr)>);

impl DimensionKey {
    /// Build a key from an unordered set of `(name, value)` pairs, dropping
    /// duplicates (last write wins) and sorting by name.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (SmolStr, SmolStr)>) -> Self {
        let mut map: Vec<(SmolStr, SmolStr)> = Vec::new();
        for (name, value) in pairs {
            if let Some(existing) = map.iter_mut().find(|(n, _)| *n == name) {
                existing.1 = value;
            } else {
                map.push((name, value));
            }
        }
        map.sort_by(|a, b| a.0.cmp(&b.0));
        Self(map)
    }

    pub fn get(&self, name: &str) -> Option<&SmolStr> {
        self.0.iter().find(|(n, _)| n.as_str() == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &SmolStr)> {
        self.0.iter().map(|(n, v)| (n, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Project this key onto a subset of names, preserving sort order.
    ///
    /// Returns `None` if any requested name is absent — callers (cumulative
    /// rules in particular) use this to detect "rule inapplicable" per the
    /// spec's edge policy.
    pub fn project(&self, names: &[&str]) -> Option<DimensionKey> {
        let mut pairs = Vec::with_capacity(names.len());
        for name in names {
            let value = self.get(name)?;
            pairs.push((SmolStr::new(*name), value.clone()));
        }
        Some(DimensionKey::from_pairs(pairs))
    }

    /// Render as a stable, human-readable string for use as an [`crate::action::Action`] subject.
    pub fn to_subject_string(&self) -> String {
        self.0
            .iter()
            .map(|(n, v)| format!("{n}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Whole-day index derived from an event timestamp (UTC, nanosecond epoch).
///
/// `floor(ts_ns / 86_400e9)`. Cumulative aggregates are keyed by
/// `(DimensionKey, DayId)` and thus auto-reset at day boundaries.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct DayId(pub i64);

const NANOS_PER_DAY: u64 = 86_400 * 1_000_000_000;

impl DayId {
    pub fn from_ts_ns(ts_ns: u64) -> Self {
        DayId((ts_ns / NANOS_PER_DAY) as i64)
    }
}
