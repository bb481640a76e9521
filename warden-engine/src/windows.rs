use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use warden_rules::WindowRegistry;
use warden_window::RollingWindowCounter;

/// Concrete, engine-owned registry of named [`RollingWindowCounter`]s.
///
/// One counter per distinct rule-chosen name (built-in rate-limit rules key
/// this by their own `rule_id`). A `window_seconds` change on an existing
/// name replaces the counter outright; see `DESIGN.md` for why in-flight
/// window state is not migrated across such a resize.
pub struct NamedWindowRegistry {
    shard_count: usize,
    windows: RwLock<HashMap<String, Arc<RollingWindowCounter>>>,
}

impl NamedWindowRegistry {
    pub fn new(shard_count: usize) -> Self {
        Self {
            shard_count,
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Raw per-name counters, for snapshotting rate-limit rule state.
    pub fn get(&self, name: &str) -> Option<Arc<RollingWindowCounter>> {
        self.windows.read().get(name).cloned()
    }

    /// All registered names and their counters, for `RiskEngine::snapshot`.
    pub fn all(&self) -> Vec<(String, Arc<RollingWindowCounter>)> {
        self.windows.read().iter().map(|(k, v)| (k.clone(), Arc::clone(v))).collect()
    }

    /// Rebuild a registry from a prior snapshot (name, window_seconds, raw buckets).
    pub fn restore(
        shard_count: usize,
        entries: impl IntoIterator<Item = (String, u32, Vec<(warden_model::DimensionKey, usize, i64, i64)>)>,
    ) -> Self {
        let registry = Self::new(shard_count);
        let mut windows = registry.windows.write();
        for (name, window_seconds, buckets) in entries {
            let counter = RollingWindowCounter::restore(window_seconds, shard_count, buckets);
            windows.insert(name, Arc::new(counter));
        }
        drop(windows);
        registry
    }
}

impl WindowRegistry for NamedWindowRegistry {
    fn get_or_create(&self, name: &str, window_seconds: u32) -> Arc<RollingWindowCounter> {
        if let Some(existing) = self.windows.read().get(name) {
            if existing.window_seconds() == window_seconds {
                return Arc::clone(existing);
            }
        }
        let mut guard = self.windows.write();
        if let Some(existing) = guard.get(name) {
            if existing.window_seconds() == window_seconds {
                return Arc::clone(existing);
            }
        }
        let counter = Arc::new(RollingWindowCounter::new(window_seconds, self.shard_count));
        guard.insert(name.to_string(), Arc::clone(&counter));
        counter
    }
}
