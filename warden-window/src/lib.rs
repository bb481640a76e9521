//! Rolling Window Counter — component C of the Warden pre-trade risk engine.
//!
//! A per-key integer counter over a sliding window of `W` whole seconds,
//! backed by a ring of `W` buckets. Each bucket is tagged with the second it
//! currently represents so a stale entry from one window earlier can be told
//! apart from the live one and evicted lazily.

use fnv::FnvHashMap;
use parking_lot::Mutex;
use std::hash::{Hash, Hasher};
use tracing::debug;
use warden_model::DimensionKey;

#[derive(Debug, Copy, Clone)]
struct BucketSlot {
    second: i64,
    count: i64,
}

const EMPTY: BucketSlot = BucketSlot { second: i64::MIN, count: 0 };

type ShardKey = (DimensionKey, usize);

/// Sliding-window counter over `window_seconds` whole seconds.
///
/// Shards keyed by `(key, ring_slot)` so that buckets belonging to the same
/// logical key but different seconds never contend on the same lock, matching
/// the concurrency model of [`warden_store::CounterStore`].
pub struct RollingWindowCounter {
    window_seconds: i64,
    shards: Box<[Mutex<FnvHashMap<ShardKey, BucketSlot>>]>,
    mask: u64,
}

impl RollingWindowCounter {
    pub fn new(window_seconds: u32, shard_count: usize) -> Self {
        assert!(window_seconds >= 1, "window_seconds must be >= 1");
        assert!(
            shard_count.is_power_of_two() && shard_count > 0,
            "shard_count must be a positive power of two, got {shard_count}"
        );
        let shards = (0..shard_count).map(|_| Mutex::new(FnvHashMap::default())).collect();
        Self {
            window_seconds: window_seconds as i64,
            shards,
            mask: (shard_count - 1) as u64,
        }
    }

    fn shard_index(&self, shard_key: &ShardKey) -> usize {
        let mut hasher = fnv::FnvHasher::default();
        shard_key.hash(&mut hasher);
        (hasher.finish() & self.mask) as usize
    }

    fn current_second(ts_ns: u64) -> i64 {
        (ts_ns / 1_000_000_000) as i64
    }

    fn ring_slot(&self, second: i64) -> usize {
        second.rem_euclid(self.window_seconds) as usize
    }

    /// Increment `key`'s count for the second containing `ts_ns`. Returns the
    /// count accumulated in that current second (not the window total).
    ///
    /// A write whose second is older than the second currently held in that
    /// key's ring slot is silently ignored: it would already have been
    /// evicted from the window (spec §5 "Ordering guarantees").
    pub fn add(&self, key: &DimensionKey, ts_ns: u64, delta: i64) -> i64 {
        let current_second = Self::current_second(ts_ns);
        let slot = self.ring_slot(current_second);
        let shard_key = (key.clone(), slot);
        let idx = self.shard_index(&shard_key);
        let mut shard = self.shards[idx].lock();
        let entry = shard.entry(shard_key).or_insert(EMPTY);

        match current_second.cmp(&entry.second) {
            std::cmp::Ordering::Equal => {
                entry.count += delta;
                entry.count
            }
            std::cmp::Ordering::Greater => {
                entry.second = current_second;
                entry.count = delta;
                entry.count
            }
            std::cmp::Ordering::Less => {
                debug!(
                    key = %key.to_subject_string(),
                    stale_second = current_second,
                    live_second = entry.second,
                    "RollingWindowCounter ignored stale out-of-order write"
                );
                0
            }
        }
    }

    /// Sum over the ring for seconds in `(current_second - W, current_second]`,
    /// skipping any slot whose stored second has fallen outside that range.
    pub fn total(&self, key: &DimensionKey, ts_ns: u64) -> i64 {
        let current_second = Self::current_second(ts_ns);
        let mut total = 0i64;
        for offset in 0..self.window_seconds {
            let second = current_second - offset;
            if second < 0 {
                continue;
            }
            let slot = self.ring_slot(second);
            let shard_key = (key.clone(), slot);
            let idx = self.shard_index(&shard_key);
            let shard = self.shards[idx].lock();
            if let Some(entry) = shard.get(&shard_key) {
                if entry.second == second {
                    total += entry.count;
                }
            }
        }
        total
    }

    pub fn window_seconds(&self) -> u32 {
        self.window_seconds as u32
    }

    /// Raw bucket contents as `(key, ring_slot, second, count)`, for the
    /// snapshot format's "raw bucket contents of its window counter" (spec
    /// §6).
    pub fn snapshot(&self) -> Vec<(DimensionKey, usize, i64, i64)> {
        let mut out = Vec::new();
        for shard in &self.shards {
            let shard = shard.lock();
            for ((key, slot), bucket) in shard.iter() {
                out.push((key.clone(), *slot, bucket.second, bucket.count));
            }
        }
        out
    }

    /// Rebuild a counter from a prior [`Self::snapshot`]. Never fails:
    /// restoration is parameter-tolerant per spec §6.
    pub fn restore(
        window_seconds: u32,
        shard_count: usize,
        entries: impl IntoIterator<Item = (DimensionKey, usize, i64, i64)>,
    ) -> Self {
        let counter = Self::new(window_seconds, shard_count);
        for (key, slot, second, count) in entries {
            let shard_key = (key, slot);
            let idx = counter.shard_index(&shard_key);
            let mut shard = counter.shards[idx].lock();
            shard.insert(shard_key, BucketSlot { second, count });
        }
        counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol_str::SmolStr;

    fn key() -> DimensionKey {
        DimensionKey::from_pairs([(SmolStr::new("account_id"), SmolStr::new("ACC1"))])
    }

    const SEC: u64 = 1_000_000_000;

    #[test]
    fn add_returns_count_within_current_second_only() {
        let window = RollingWindowCounter::new(5, 4);
        let k = key();
        assert_eq!(window.add(&k, 0, 1), 1);
        assert_eq!(window.add(&k, 0, 1), 2);
        assert_eq!(window.add(&k, SEC, 1), 1);
    }

    #[test]
    fn total_sums_across_the_window_and_evicts_outside_it() {
        let window = RollingWindowCounter::new(3, 4);
        let k = key();
        window.add(&k, 0, 1);
        window.add(&k, SEC, 1);
        window.add(&k, 2 * SEC, 1);
        assert_eq!(window.total(&k, 2 * SEC), 3);

        // Advance past the window: second 0 falls out of (current-3, current].
        window.add(&k, 3 * SEC, 1);
        assert_eq!(window.total(&k, 3 * SEC), 3);
    }

    #[test]
    fn stale_out_of_order_write_to_the_same_ring_slot_is_ignored() {
        let window = RollingWindowCounter::new(2, 4);
        let k = key();
        // second 5 and second 3 share ring slot (x % 2 == 1); second 3 is
        // older and arrives after, so it must be dropped, not counted.
        assert_eq!(window.add(&k, 5 * SEC, 1), 1);
        assert_eq!(window.add(&k, 3 * SEC, 1), 0);
        assert_eq!(window.total(&k, 5 * SEC), 1);
    }

    #[test]
    fn snapshot_round_trips_through_restore() {
        let window = RollingWindowCounter::new(3, 4);
        let k = key();
        window.add(&k, 0, 1);
        window.add(&k, SEC, 2);
        let snap = window.snapshot();
        let restored = RollingWindowCounter::restore(3, 4, snap);
        assert_eq!(restored.total(&k, SEC), 3);
    }

    proptest::proptest! {
        #[test]
        fn total_matches_brute_force_count_over_window(
            seconds in proptest::collection::vec(0u64..50, 1..100)
        ) {
            let w = 5u32;
            let window = RollingWindowCounter::new(w, 8);
            let k = key();
            let mut sorted = seconds.clone();
            sorted.sort_unstable();
            for s in &sorted {
                window.add(&k, *s * SEC, 1);
            }
            let query_second = *sorted.last().unwrap();
            let expected = sorted
                .iter()
                .filter(|s| **s as i64 > query_second as i64 - w as i64 && **s as i64 <= query_second as i64)
                .count() as i64;
            let actual = window.total(&k, query_second * SEC);
            proptest::prop_assert_eq!(actual, expected);
        }
    }
}
