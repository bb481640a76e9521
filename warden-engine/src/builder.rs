use crate::error::EngineError;
use crate::sink::{ActionSink, NullActionSink};
use crate::windows::NamedWindowRegistry;
use crate::RiskEngine;
use arc_swap::ArcSwap;
use std::sync::Arc;
use warden_catalog::Catalog;
use warden_rules::{ConfigError, Rule};

const DEFAULT_SHARD_COUNT: usize = 64;
const DEFAULT_ATTRIBUTION_CAPACITY: usize = 1_000_000;

/// Construction-time configuration surface for a [`RiskEngine`] (spec §6).
///
/// Consuming-`self` builder in the teacher's style
/// (`barter/src/engine/state/builder.rs`): every `with_*` returns `Self`,
/// and `build()` is the single fallible step, validating shard count and
/// attribution capacity before the engine exists.
pub struct RiskEngineBuilder {
    catalog: Catalog,
    shard_count: usize,
    rules: Vec<Arc<dyn Rule>>,
    dedup: bool,
    sink: Arc<dyn ActionSink>,
    attribution_capacity: usize,
}

impl Default for RiskEngineBuilder {
    fn default() -> Self {
        Self {
            catalog: Catalog::builder().build(),
            shard_count: DEFAULT_SHARD_COUNT,
            rules: Vec::new(),
            dedup: true,
            sink: Arc::new(NullActionSink),
            attribution_capacity: DEFAULT_ATTRIBUTION_CAPACITY,
        }
    }
}

impl RiskEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Must be a power of two; validated in [`Self::build`], not here,
    /// since the teacher's builders keep `with_*` infallible.
    pub fn with_shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    pub fn with_rule(mut self, rule: Arc<dyn Rule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_rules(mut self, rules: impl IntoIterator<Item = Arc<dyn Rule>>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn with_action_sink(mut self, sink: Arc<dyn ActionSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_attribution_capacity(mut self, capacity: usize) -> Self {
        self.attribution_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<RiskEngine, EngineError> {
        if !self.shard_count.is_power_of_two() || self.shard_count == 0 {
            return Err(EngineError::Config(ConfigError::InvalidValue {
                name: "shard_count".to_string(),
                reason: format!("must be a positive power of two, got {}", self.shard_count),
            }));
        }
        if self.attribution_capacity == 0 {
            return Err(EngineError::Config(ConfigError::InvalidValue {
                name: "attribution_capacity".to_string(),
                reason: "must be non-zero".to_string(),
            }));
        }

        Ok(RiskEngine {
            catalog: self.catalog,
            store: ArcSwap::from_pointee(warden_store::CounterStore::new(self.shard_count)),
            windows: ArcSwap::from_pointee(NamedWindowRegistry::new(self.shard_count)),
            rules: ArcSwap::from_pointee(self.rules),
            dedup: self.dedup,
            sink: ArcSwap::from_pointee(self.sink),
            attribution: crate::attribution::OrderAttributionTable::new(self.shard_count, self.attribution_capacity),
            shard_count: self.shard_count,
        })
    }
}
