//! Risk Engine — component E of the Warden pre-trade risk engine.
//!
//! Owns the catalog, counter store, named rolling-window registry, a
//! hot-swappable rule list, the action sink, and the order-attribution
//! table. This is the only crate in the workspace on the hot path end to
//! end: `on_order`/`on_trade`/`on_cancel` resolve dimensions, run every
//! configured rule in order, deduplicate, and forward to the sink.

pub mod attribution;
pub mod builder;
pub mod error;
pub mod sink;
pub mod snapshot;
pub mod windows;

pub use builder::RiskEngineBuilder;
pub use error::EngineError;
pub use sink::{ActionSink, NullActionSink};
pub use snapshot::EngineSnapshot;

use arc_swap::ArcSwap;
use attribution::OrderAttributionTable;
use snapshot::{RuleStateSnapshot, WindowSnapshot, SCHEMA_VERSION};
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, warn};
use warden_catalog::{Catalog, Extras};
use warden_model::{ActionKind, Cancel, Emitted, Event, Order, Trade};
use warden_rules::{Rule, RuleContext, RuleResult};
use warden_store::CounterStore;
use windows::NamedWindowRegistry;

/// Which event kind is being dispatched, so the shared per-event procedure
/// can call the matching `Rule` callback without a higher-ranked closure.
#[derive(Clone, Copy)]
enum EventRef<'a> {
    Order(&'a Order),
    Trade(&'a Trade),
    Cancel(&'a Cancel),
}

/// Orchestrator tying together components A–D (spec §4.E).
///
/// Every ingest method may be called from any thread concurrently: the rule
/// list, counter store, and window registry are each reached through an
/// [`ArcSwap`], so a reader never blocks a writer performing `replace_rules`
/// or `restore`, and never observes a partially-updated snapshot.
pub struct RiskEngine {
    catalog: Catalog,
    store: ArcSwap<CounterStore>,
    windows: ArcSwap<NamedWindowRegistry>,
    rules: ArcSwap<Vec<Arc<dyn Rule>>>,
    dedup: bool,
    sink: ArcSwap<Arc<dyn ActionSink>>,
    attribution: OrderAttributionTable,
    shard_count: usize,
}

impl RiskEngine {
    pub fn builder() -> RiskEngineBuilder {
        RiskEngineBuilder::new()
    }

    pub fn on_order(&self, order: &Order) -> Result<Vec<Emitted>, EngineError> {
        self.attribution.record(order.order_id, order.account_id.clone(), order.contract_id.clone());

        let dim_key = self.catalog.resolve(
            Some(&order.account_id),
            Some(&order.contract_id),
            order.exchange_id.as_ref(),
            order.account_group_id.as_ref(),
            Extras::default(),
        );

        let event = Event::from(order.clone());
        self.dispatch(&dim_key, order.ts_ns, &event, EventRef::Order(order))
    }

    pub fn on_trade(&self, trade: &Trade) -> Result<Vec<Emitted>, EngineError> {
        let (account_id, contract_id) = match (&trade.account_id, &trade.contract_id) {
            (Some(account), Some(contract)) => (Some(account.clone()), Some(contract.clone())),
            _ => {
                let attributed = self.attribution.lookup(trade.order_id);
                (
                    trade.account_id.clone().or_else(|| attributed.as_ref().map(|(a, _)| a.clone())),
                    trade.contract_id.clone().or_else(|| attributed.as_ref().map(|(_, c)| c.clone())),
                )
            }
        };

        let dim_key = self.catalog.resolve(account_id.as_ref(), contract_id.as_ref(), None, None, Extras::default());

        let event = Event::from(trade.clone());
        self.dispatch(&dim_key, trade.ts_ns, &event, EventRef::Trade(trade))
    }

    pub fn on_cancel(&self, cancel: &Cancel) -> Result<Vec<Emitted>, EngineError> {
        let (account_id, contract_id) = match (&cancel.account_id, &cancel.contract_id) {
            (Some(account), Some(contract)) => (Some(account.clone()), Some(contract.clone())),
            _ => {
                let attributed = self.attribution.lookup(cancel.cancelled_order_id);
                (
                    cancel.account_id.clone().or_else(|| attributed.as_ref().map(|(a, _)| a.clone())),
                    cancel.contract_id.clone().or_else(|| attributed.as_ref().map(|(_, c)| c.clone())),
                )
            }
        };

        let dim_key = self.catalog.resolve(account_id.as_ref(), contract_id.as_ref(), None, None, Extras::default());

        let event = Event::from(cancel.clone());
        self.dispatch(&dim_key, cancel.ts_ns, &event, EventRef::Cancel(cancel))
    }

    fn invoke(rule: &dyn Rule, ctx: &RuleContext<'_>, event: EventRef<'_>) -> warden_rules::RuleOutcome {
        match event {
            EventRef::Order(order) => rule.on_order(ctx, order),
            EventRef::Trade(trade) => rule.on_trade(ctx, trade),
            EventRef::Cancel(cancel) => rule.on_cancel(ctx, cancel),
        }
    }

    /// Shared per-event procedure (spec §4.E): build context, run every rule
    /// in order under the loaded snapshot, flatten, dedup, sink, return.
    fn dispatch(
        &self,
        dim_key: &warden_model::DimensionKey,
        ts_ns: u64,
        event: &Event,
        source: EventRef<'_>,
    ) -> Result<Vec<Emitted>, EngineError> {
        let store = self.store.load();
        let windows = self.windows.load();
        let store_ref: &CounterStore = &store;
        let windows_ref: &NamedWindowRegistry = &windows;
        let ctx = RuleContext::new(dim_key, ts_ns, store_ref, windows_ref as &dyn warden_rules::WindowRegistry);

        let rules = self.rules.load();
        let mut raw = Vec::new();
        for rule in rules.iter() {
            let outcome = catch_unwind(AssertUnwindSafe(|| Self::invoke(rule.as_ref(), &ctx, source)));
            match outcome {
                Ok(Ok(Some(result))) => raw.push((rule.id().to_string(), result)),
                Ok(Ok(None)) => {}
                Ok(Err(err)) => return Err(EngineError::from(err)),
                Err(_panic) => {
                    error!(rule_id = %rule.id(), "rule callback panicked");
                }
            }
        }
        drop(rules);
        drop(windows);
        drop(store);

        let mut emitted = Vec::new();
        for (rule_id, RuleResult { actions, subject, reason, metadata }) in raw {
            let subject_str = subject.to_subject_string();
            for kind in actions {
                emitted.push(Emitted {
                    action: warden_model::Action {
                        kind,
                        subject: subject_str.clone(),
                        rule_id: rule_id.clone(),
                        reason: reason.clone(),
                        ts_ns,
                        metadata: metadata.clone(),
                    },
                    subject_event: event.clone(),
                });
            }
        }

        let survivors = if self.dedup {
            let mut seen: HashSet<(ActionKind, String)> = HashSet::new();
            emitted
                .into_iter()
                .filter(|e| seen.insert((e.action.kind, e.action.subject.clone())))
                .collect()
        } else {
            emitted
        };

        let sink = self.sink.load();
        for emitted in &survivors {
            let result = catch_unwind(AssertUnwindSafe(|| sink.handle(emitted)));
            if result.is_err() {
                warn!(rule_id = %emitted.action.rule_id, kind = ?emitted.action.kind, "action sink panicked");
            }
        }

        Ok(survivors)
    }

    pub fn add_rule(&self, rule: Arc<dyn Rule>) {
        let current = self.rules.load();
        let mut updated = (**current).clone();
        updated.push(rule);
        self.rules.store(Arc::new(updated));
    }

    pub fn remove_rule(&self, rule_id: &str) -> Result<(), EngineError> {
        let current = self.rules.load();
        let updated: Vec<Arc<dyn Rule>> = current.iter().filter(|r| r.id() != rule_id).cloned().collect();
        if updated.len() == current.len() {
            return Err(EngineError::UnknownRule(rule_id.to_string()));
        }
        self.rules.store(Arc::new(updated));
        Ok(())
    }

    pub fn replace_rules(&self, rules: Vec<Arc<dyn Rule>>) {
        self.rules.store(Arc::new(rules));
    }

    pub fn update_rule_parameter(
        &self,
        rule_id: &str,
        name: &str,
        value: warden_rules::ParamValue,
    ) -> Result<(), EngineError> {
        let rules = self.rules.load();
        let rule = rules.iter().find(|r| r.id() == rule_id).ok_or_else(|| EngineError::UnknownRule(rule_id.to_string()))?;
        rule.update_parameter(name, value)?;
        Ok(())
    }

    pub fn set_action_sink(&self, sink: Arc<dyn ActionSink>) {
        self.sink.store(Arc::new(sink));
    }

    pub fn register_extension(&self, name: impl Into<smol_str::SmolStr>) -> bool {
        self.catalog.register_extension(name)
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let store_entries = self.store.load().snapshot();

        let windows = self
            .windows
            .load()
            .all()
            .into_iter()
            .map(|(name, counter)| WindowSnapshot {
                name,
                window_seconds: counter.window_seconds(),
                buckets: counter.snapshot(),
            })
            .collect();

        let rule_state = self
            .rules
            .load()
            .iter()
            .filter_map(|rule| rule.snapshot_state().map(|state| RuleStateSnapshot { rule_id: rule.id().to_string(), state }))
            .collect();

        EngineSnapshot {
            schema_version: SCHEMA_VERSION,
            store: store_entries,
            windows,
            rule_state,
        }
    }

    /// Restore counter store, window state, and rule-internal state from a
    /// prior [`Self::snapshot`]. The rule list itself is not part of the
    /// snapshot — rules must already be registered (by id) on `self` before
    /// calling this, matching spec §6's "restoration is parameter-tolerant
    /// ... unknown entries are rejected": a `rule_state` entry naming a rule
    /// id this engine does not have is an error, not silently dropped.
    pub fn restore(&self, snapshot: EngineSnapshot) -> Result<(), EngineError> {
        if snapshot.schema_version != SCHEMA_VERSION {
            return Err(EngineError::Snapshot(format!(
                "unsupported schema version {} (expected {})",
                snapshot.schema_version, SCHEMA_VERSION
            )));
        }

        let store = CounterStore::restore(self.shard_count, snapshot.store);
        self.store.store(Arc::new(store));

        let windows = NamedWindowRegistry::restore(
            self.shard_count,
            snapshot.windows.into_iter().map(|w| (w.name, w.window_seconds, w.buckets)),
        );
        self.windows.store(Arc::new(windows));

        let rules = self.rules.load();
        for RuleStateSnapshot { rule_id, state } in snapshot.rule_state {
            let rule = rules
                .iter()
                .find(|r| r.id() == rule_id)
                .ok_or_else(|| EngineError::Snapshot(format!("unknown rule id in snapshot: {rule_id:?}")))?;
            rule.restore_state(state)?;
        }

        Ok(())
    }
}
