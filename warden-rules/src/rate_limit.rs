use crate::context::RuleContext;
use crate::error::ConfigError;
use crate::rule::{ParamValue, Rule, RuleOutcome, RuleResult};
use fnv::FnvHashMap;
use parking_lot::RwLock;
use smol_str::SmolStr;
use warden_model::{ActionKind, Cancel, DimensionKey, Order};

/// Which event kind a [`RateLimit`] rule counts.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CountedEvent {
    Order,
    Cancel,
}

struct Params {
    threshold: i64,
    window_seconds: u32,
    dims: Vec<SmolStr>,
    suspend_actions: Vec<ActionKind>,
    resume_actions: Vec<ActionKind>,
}

/// Built-in rule family: rate limit with automatic resume. Spec §4.D.2.
///
/// Tracks a per-aggregation-key `suspended` flag that persists across
/// events; transitions are the only points at which this rule emits.
pub struct RateLimit {
    rule_id: String,
    counted_event: CountedEvent,
    window_name: String,
    params: RwLock<Params>,
    suspended: RwLock<FnvHashMap<DimensionKey, bool>>,
}

impl RateLimit {
    pub fn new(
        rule_id: impl Into<String>,
        counted_event: CountedEvent,
        threshold: i64,
        window_seconds: u32,
        dims: Vec<SmolStr>,
        suspend_actions: Vec<ActionKind>,
        resume_actions: Vec<ActionKind>,
    ) -> Result<Self, ConfigError> {
        if threshold <= 0 {
            return Err(ConfigError::InvalidThreshold(threshold as f64));
        }
        if window_seconds < 1 {
            return Err(ConfigError::InvalidWindowSeconds(window_seconds));
        }
        if dims.is_empty() {
            return Err(ConfigError::EmptyDimensionSelection);
        }
        let rule_id = rule_id.into();
        let window_name = rule_id.clone();
        Ok(Self {
            rule_id,
            counted_event,
            window_name,
            params: RwLock::new(Params { threshold, window_seconds, dims, suspend_actions, resume_actions }),
            suspended: RwLock::new(FnvHashMap::default()),
        })
    }

    pub fn suspended(&self, key: &DimensionKey) -> bool {
        self.suspended.read().get(key).copied().unwrap_or(false)
    }

    /// Raw bucket contents plus suspended flags, for snapshot/restore (spec §6).
    pub fn suspended_flags(&self) -> Vec<(DimensionKey, bool)> {
        self.suspended.read().iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    pub fn restore_suspended_flags(&self, flags: impl IntoIterator<Item = (DimensionKey, bool)>) {
        let mut guard = self.suspended.write();
        guard.clear();
        guard.extend(flags);
    }

    pub fn window_name(&self) -> &str {
        &self.window_name
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, dim_key: &DimensionKey, ts_ns: u64) -> RuleOutcome {
        let params = self.params.read();
        let dim_refs: Vec<&str> = params.dims.iter().map(SmolStr::as_str).collect();
        let Some(agg_key) = dim_key.project(&dim_refs) else {
            return Ok(None);
        };

        let window = ctx.windows().get_or_create(&self.window_name, params.window_seconds);
        window.add(&agg_key, ts_ns, 1);
        let window_total = window.total(&agg_key, ts_ns);

        let mut suspended = self.suspended.write();
        let was_suspended = suspended.get(&agg_key).copied().unwrap_or(false);

        if window_total >= params.threshold && !was_suspended {
            suspended.insert(agg_key.clone(), true);
            let reason = format!(
                "rate {} >= threshold {} over {}s for {}",
                window_total, params.threshold, params.window_seconds, agg_key.to_subject_string(),
            );
            Ok(Some(RuleResult::new(params.suspend_actions.clone(), agg_key, reason)))
        } else if window_total < params.threshold && was_suspended {
            suspended.insert(agg_key.clone(), false);
            let reason = format!(
                "rate {} < threshold {} over {}s for {}",
                window_total, params.threshold, params.window_seconds, agg_key.to_subject_string(),
            );
            Ok(Some(RuleResult::new(params.resume_actions.clone(), agg_key, reason)))
        } else {
            Ok(None)
        }
    }
}

impl Rule for RateLimit {
    fn id(&self) -> &str {
        &self.rule_id
    }

    fn on_order(&self, ctx: &RuleContext<'_>, order: &Order) -> RuleOutcome {
        if self.counted_event != CountedEvent::Order {
            return Ok(None);
        }
        self.evaluate(ctx, ctx.dim_key(), order.ts_ns)
    }

    fn on_cancel(&self, ctx: &RuleContext<'_>, cancel: &Cancel) -> RuleOutcome {
        if self.counted_event != CountedEvent::Cancel {
            return Ok(None);
        }
        self.evaluate(ctx, ctx.dim_key(), cancel.ts_ns)
    }

    fn update_parameter(&self, name: &str, value: ParamValue) -> Result<(), ConfigError> {
        let mut params = self.params.write();
        match (name, value) {
            ("threshold", ParamValue::Number(v)) => {
                if v <= 0.0 {
                    return Err(ConfigError::InvalidThreshold(v));
                }
                params.threshold = v as i64;
                Ok(())
            }
            ("window_seconds", ParamValue::WindowSeconds(v)) => {
                if v < 1 {
                    return Err(ConfigError::InvalidWindowSeconds(v));
                }
                params.window_seconds = v;
                Ok(())
            }
            ("dims", ParamValue::Dimensions(v)) => {
                if v.is_empty() {
                    return Err(ConfigError::EmptyDimensionSelection);
                }
                params.dims = v;
                Ok(())
            }
            (other, _) => Err(ConfigError::UnknownParameter(other.to_string())),
        }
    }

    fn snapshot_state(&self) -> Option<serde_json::Value> {
        let flags = self.suspended_flags();
        serde_json::to_value(flags).ok()
    }

    fn restore_state(&self, state: serde_json::Value) -> Result<(), ConfigError> {
        let flags: Vec<(DimensionKey, bool)> = serde_json::from_value(state).map_err(|err| ConfigError::InvalidValue {
            name: "suspended_flags".to_string(),
            reason: err.to_string(),
        })?;
        self.restore_suspended_flags(flags);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::InMemoryWindowRegistry;
    use warden_store::CounterStore;

    fn key(account: &str) -> DimensionKey {
        DimensionKey::from_pairs([(SmolStr::new("account_id"), SmolStr::new(account))])
    }

    #[test]
    fn suspends_once_threshold_crossed_and_resumes_once_it_falls_back() {
        let rule = RateLimit::new(
            "order-rate",
            CountedEvent::Order,
            5,
            1,
            vec![SmolStr::new("account_id")],
            vec![ActionKind::SuspendOrdering],
            vec![ActionKind::ResumeOrdering],
        )
        .unwrap();

        let store = CounterStore::new(4);
        let windows = InMemoryWindowRegistry::default();
        let dim_key = key("A");

        let mut last_result = None;
        for i in 0..5u64 {
            let order = Order {
                order_id: i, account_id: SmolStr::new("A"), contract_id: SmolStr::new("T1"),
                side: warden_model::Side::Bid, price: 1.0, volume: 1, ts_ns: i * 10,
                exchange_id: None, account_group_id: None,
            };
            let ctx = RuleContext::new(&dim_key, order.ts_ns, &store, &windows);
            last_result = rule.on_order(&ctx, &order).unwrap();
        }
        let result = last_result.expect("5th order should cross the threshold and trigger suspension");
        assert_eq!(result.actions, vec![ActionKind::SuspendOrdering]);

        // 1.5s later: a single order, window total drops to 1 < 5, must resume.
        let order = Order {
            order_id: 100, account_id: SmolStr::new("A"), contract_id: SmolStr::new("T1"),
            side: warden_model::Side::Bid, price: 1.0, volume: 1, ts_ns: 1_500_000_000,
            exchange_id: None, account_group_id: None,
        };
        let ctx = RuleContext::new(&dim_key, order.ts_ns, &store, &windows);
        let result = rule.on_order(&ctx, &order).unwrap().expect("should resume");
        assert_eq!(result.actions, vec![ActionKind::ResumeOrdering]);
    }

    #[test]
    fn does_not_re_suspend_until_a_second_crossing() {
        let rule = RateLimit::new(
            "order-rate", CountedEvent::Order, 2, 1,
            vec![SmolStr::new("account_id")],
            vec![ActionKind::SuspendOrdering], vec![ActionKind::ResumeOrdering],
        ).unwrap();
        let store = CounterStore::new(4);
        let windows = InMemoryWindowRegistry::default();
        let dim_key = key("A");

        let make_order = |i: u64, ts: u64| Order {
            order_id: i, account_id: SmolStr::new("A"), contract_id: SmolStr::new("T1"),
            side: warden_model::Side::Bid, price: 1.0, volume: 1, ts_ns: ts,
            exchange_id: None, account_group_id: None,
        };

        let o1 = make_order(1, 0);
        let ctx = RuleContext::new(&dim_key, 0, &store, &windows);
        assert!(rule.on_order(&ctx, &o1).unwrap().is_none());

        let o2 = make_order(2, 1);
        let ctx = RuleContext::new(&dim_key, 1, &store, &windows);
        assert!(rule.on_order(&ctx, &o2).unwrap().is_some()); // suspend

        let o3 = make_order(3, 2);
        let ctx = RuleContext::new(&dim_key, 2, &store, &windows);
        assert!(rule.on_order(&ctx, &o3).unwrap().is_none()); // already suspended, still over
    }
}
