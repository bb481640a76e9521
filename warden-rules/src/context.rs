use smol_str::SmolStr;
use std::sync::Arc;
use warden_model::dimension::names;
use warden_model::DimensionKey;
use warden_store::CounterStore;
use warden_window::RollingWindowCounter;

/// Engine-owned registry of named [`RollingWindowCounter`]s, kept behind a
/// trait so that `warden-rules` never depends on `warden-engine` (the
/// concrete registry lives there and is injected per event via
/// [`RuleContext`]).
pub trait WindowRegistry: Send + Sync {
    /// Return the counter registered under `name`, creating it with
    /// `window_seconds` if absent. If one already exists under a different
    /// `window_seconds` (a dynamic `window_seconds` parameter change), it is
    /// replaced with a freshly-sized counter — in-flight window state for
    /// that name is not migrated (see DESIGN.md).
    fn get_or_create(&self, name: &str, window_seconds: u32) -> Arc<RollingWindowCounter>;
}

/// Per-event context handed to a [`crate::rule::Rule`] by the engine.
///
/// Cheap, stack-allocatable: every field is a borrow or a plain copy (spec
/// §4.E step 3).
pub struct RuleContext<'a> {
    dim_key: &'a DimensionKey,
    ts_ns: u64,
    store: &'a CounterStore,
    windows: &'a dyn WindowRegistry,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        dim_key: &'a DimensionKey,
        ts_ns: u64,
        store: &'a CounterStore,
        windows: &'a dyn WindowRegistry,
    ) -> Self {
        Self { dim_key, ts_ns, store, windows }
    }

    pub fn dim_key(&self) -> &DimensionKey {
        self.dim_key
    }

    pub fn ts_ns(&self) -> u64 {
        self.ts_ns
    }

    pub fn store(&self) -> &CounterStore {
        self.store
    }

    pub fn windows(&self) -> &dyn WindowRegistry {
        self.windows
    }

    pub fn account_id(&self) -> Option<&SmolStr> {
        self.dim_key.get(names::ACCOUNT_ID)
    }

    pub fn contract_id(&self) -> Option<&SmolStr> {
        self.dim_key.get(names::CONTRACT_ID)
    }

    pub fn product_id(&self) -> Option<&SmolStr> {
        self.dim_key.get(names::PRODUCT_ID)
    }

    pub fn exchange_id(&self) -> Option<&SmolStr> {
        self.dim_key.get(names::EXCHANGE_ID)
    }

    pub fn account_group_id(&self) -> Option<&SmolStr> {
        self.dim_key.get(names::ACCOUNT_GROUP_ID)
    }
}
