//! Sharded Counter Store — component B of the Warden pre-trade risk engine.
//!
//! A thread-safe `(DimensionKey, DayId) -> (Metric -> value)` map, partitioned
//! into `N` power-of-two shards each guarded by its own lock, so that hot
//! keys on different shards never contend.

use fnv::FnvHashMap;
use parking_lot::Mutex;
use std::hash::{Hash, Hasher};
use thiserror::Error;
use warden_model::{DayId, DimensionKey, Delta, Metric, MetricKind, Total};

/// Errors the [`CounterStore`] can raise. Per spec §4.E/§7 these are hard
/// errors surfaced synchronously to the caller of `on_*`, never silently
/// absorbed.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum StoreError {
    #[error("metric {metric:?} was first written as {expected:?}, cannot write {observed:?}")]
    MetricTypeMismatch {
        metric: Metric,
        expected: MetricKind,
        observed: MetricKind,
    },
}

type CompositeKey = (DimensionKey, DayId);
type MetricCell = Total;

#[derive(Default)]
struct Shard {
    cells: FnvHashMap<CompositeKey, FnvHashMap<Metric, MetricCell>>,
}

/// Sharded multi-dimensional counter store.
///
/// `add`/`get` are O(1): derive the day id, index the shard, lock it, and
/// mutate a single hash-map cell. No callback into rule code ever runs while
/// a shard lock is held (spec §4.B "Concurrency").
pub struct CounterStore {
    shards: Box<[Mutex<Shard>]>,
    mask: u64,
}

impl CounterStore {
    /// `shard_count` must be a power of two. Spec default is 64.
    pub fn new(shard_count: usize) -> Self {
        assert!(
            shard_count.is_power_of_two() && shard_count > 0,
            "shard_count must be a positive power of two, got {shard_count}"
        );
        let shards = (0..shard_count).map(|_| Mutex::new(Shard::default())).collect();
        Self {
            shards,
            mask: (shard_count - 1) as u64,
        }
    }

    fn shard_index(&self, key: &CompositeKey) -> usize {
        let mut hasher = fnv::FnvHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() & self.mask) as usize
    }

    /// Upsert `(dim_key, day_id(ts_ns))` then `metric`, adding `delta`.
    /// Returns the post-increment total.
    pub fn add(
        &self,
        dim_key: &DimensionKey,
        metric: Metric,
        delta: Delta,
        ts_ns: u64,
    ) -> Result<Total, StoreError> {
        let composite = (dim_key.clone(), DayId::from_ts_ns(ts_ns));
        let idx = self.shard_index(&composite);
        let mut shard = self.shards[idx].lock();
        let metrics = shard.cells.entry(composite).or_default();

        match metrics.get_mut(&metric) {
            Some(existing) => {
                if existing.kind() != delta.kind() {
                    return Err(StoreError::MetricTypeMismatch {
                        metric,
                        expected: existing.kind(),
                        observed: delta.kind(),
                    });
                }
                *existing = existing.add(delta);
                Ok(*existing)
            }
            None => {
                let total = Total::zero(delta.kind()).add(delta);
                metrics.insert(metric, total);
                Ok(total)
            }
        }
    }

    /// Point read; returns `Total::Integer(0)` if the cell has never been written.
    pub fn get(&self, dim_key: &DimensionKey, metric: Metric, ts_ns: u64) -> Total {
        let composite = (dim_key.clone(), DayId::from_ts_ns(ts_ns));
        let idx = self.shard_index(&composite);
        let shard = self.shards[idx].lock();
        shard
            .cells
            .get(&composite)
            .and_then(|metrics| metrics.get(&metric))
            .copied()
            .unwrap_or(Total::Integer(0))
    }

    /// Diagnostic snapshot. Consistent per shard (one shard locked at a
    /// time), not globally consistent across shards — intended for
    /// diagnostics and warm-start persistence, never for rule evaluation.
    pub fn snapshot(&self) -> Vec<(DimensionKey, DayId, Metric, Total)> {
        let mut out = Vec::new();
        for shard in &self.shards {
            let shard = shard.lock();
            for ((dim_key, day_id), metrics) in &shard.cells {
                for (metric, total) in metrics {
                    out.push((dim_key.clone(), *day_id, *metric, *total));
                }
            }
        }
        out
    }

    /// Restore from a prior [`Self::snapshot`]. Entries for unknown metrics
    /// are still accepted (the store has no notion of "unknown metric" since
    /// [`Metric`] is a closed enum); restoration never fails.
    pub fn restore(shard_count: usize, entries: impl IntoIterator<Item = (DimensionKey, DayId, Metric, Total)>) -> Self {
        let store = Self::new(shard_count);
        for (dim_key, day_id, metric, total) in entries {
            let composite = (dim_key, day_id);
            let idx = store.shard_index(&composite);
            let mut shard = store.shards[idx].lock();
            shard.cells.entry(composite).or_default().insert(metric, total);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol_str::SmolStr;

    fn key(account: &str) -> DimensionKey {
        DimensionKey::from_pairs([(SmolStr::new("account_id"), SmolStr::new(account))])
    }

    #[test]
    fn add_accumulates_and_returns_post_increment_total() {
        let store = CounterStore::new(4);
        let k = key("ACC1");
        let total = store.add(&k, Metric::TradeVolume, Delta::Integer(10), 0).unwrap();
        assert_eq!(total, Total::Integer(10));
        let total = store.add(&k, Metric::TradeVolume, Delta::Integer(5), 0).unwrap();
        assert_eq!(total, Total::Integer(15));
    }

    #[test]
    fn get_on_missing_cell_is_zero() {
        let store = CounterStore::new(4);
        let k = key("ACC1");
        assert_eq!(store.get(&k, Metric::TradeVolume, 0), Total::Integer(0));
    }

    #[test]
    fn day_boundary_resets_the_accumulator() {
        let store = CounterStore::new(4);
        let k = key("ACC1");
        let one_day_ns = 86_400 * 1_000_000_000u64;
        store.add(&k, Metric::TradeVolume, Delta::Integer(100), 0).unwrap();
        let total = store.add(&k, Metric::TradeVolume, Delta::Integer(7), one_day_ns).unwrap();
        assert_eq!(total, Total::Integer(7));
    }

    #[test]
    fn mixing_kinds_on_one_metric_is_a_hard_error() {
        let store = CounterStore::new(4);
        let k = key("ACC1");
        store.add(&k, Metric::TradeNotional, Delta::Float(1.5), 0).unwrap();
        let err = store.add(&k, Metric::TradeNotional, Delta::Integer(1), 0).unwrap_err();
        assert_eq!(
            err,
            StoreError::MetricTypeMismatch {
                metric: Metric::TradeNotional,
                expected: MetricKind::Float,
                observed: MetricKind::Integer,
            }
        );
    }

    #[test]
    fn snapshot_round_trips_through_restore() {
        let store = CounterStore::new(4);
        let k = key("ACC1");
        store.add(&k, Metric::OrderCount, Delta::Integer(3), 0).unwrap();
        let snap = store.snapshot();
        let restored = CounterStore::restore(4, snap);
        assert_eq!(restored.get(&k, Metric::OrderCount, 0), Total::Integer(3));
    }

    proptest::proptest! {
        #[test]
        fn counter_is_monotone_non_decreasing_under_non_negative_deltas(deltas in proptest::collection::vec(0i64..1000, 1..200)) {
            let store = CounterStore::new(8);
            let k = key("ACC1");
            let mut prev = 0i64;
            for d in deltas {
                let total = store.add(&k, Metric::TradeVolume, Delta::Integer(d), 0).unwrap();
                let Total::Integer(v) = total else { unreachable!() };
                proptest::prop_assert!(v >= prev);
                prev = v;
            }
        }
    }
}
