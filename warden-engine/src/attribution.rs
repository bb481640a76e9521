use lru::LruCache;
use parking_lot::Mutex;
use smol_str::SmolStr;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

/// Bounded `order_id -> (account_id, contract_id)` side table, consulted when
/// a trade or cancel omits those fields (spec §4.E). Sharded the same way as
/// [`warden_store::CounterStore`] so a burst of orders for one account does
/// not serialize attribution lookups for unrelated accounts.
///
/// Eviction policy (LRU, per-shard capacity) is an implementation detail, not
/// part of the public contract — see DESIGN.md.
pub struct OrderAttributionTable {
    shards: Box<[Mutex<LruCache<u64, (SmolStr, SmolStr)>>]>,
    mask: u64,
}

const DEFAULT_CAPACITY: usize = 1_000_000;

impl OrderAttributionTable {
    pub fn new(shard_count: usize, capacity: usize) -> Self {
        assert!(
            shard_count.is_power_of_two() && shard_count > 0,
            "shard_count must be a positive power of two, got {shard_count}"
        );
        let per_shard = (capacity / shard_count).max(1);
        let cap = NonZeroUsize::new(per_shard).expect("per-shard capacity must be non-zero");
        let shards = (0..shard_count).map(|_| Mutex::new(LruCache::new(cap))).collect();
        Self {
            shards,
            mask: (shard_count - 1) as u64,
        }
    }

    pub fn with_default_capacity(shard_count: usize) -> Self {
        Self::new(shard_count, DEFAULT_CAPACITY)
    }

    fn shard_index(&self, order_id: u64) -> usize {
        let mut hasher = fnv::FnvHasher::default();
        order_id.hash(&mut hasher);
        (hasher.finish() & self.mask) as usize
    }

    pub fn record(&self, order_id: u64, account_id: SmolStr, contract_id: SmolStr) {
        let idx = self.shard_index(order_id);
        self.shards[idx].lock().put(order_id, (account_id, contract_id));
    }

    pub fn lookup(&self, order_id: u64) -> Option<(SmolStr, SmolStr)> {
        let idx = self.shard_index(order_id);
        self.shards[idx].lock().get(&order_id).cloned()
    }
}
