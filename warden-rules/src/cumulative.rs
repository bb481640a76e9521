use crate::context::RuleContext;
use crate::error::ConfigError;
use crate::rule::{ParamValue, Rule, RuleOutcome, RuleResult};
use parking_lot::RwLock;
use smol_str::SmolStr;
use warden_model::{ActionKind, Cancel, Delta, Metric, Order, Trade};

struct Params {
    threshold: f64,
    dims: Vec<SmolStr>,
    actions: Vec<ActionKind>,
}

/// Built-in rule family: fires when a cumulative metric for a fixed
/// aggregation key crosses a threshold. Spec §4.D.1.
///
/// Comparison is `>=`; the rule never decrements and re-fires on every
/// subsequent event once past threshold (dedup at the engine level is what
/// suppresses repeats, per spec's edge policy).
pub struct CumulativeMetricLimit {
    rule_id: String,
    metric: Metric,
    params: RwLock<Params>,
}

impl CumulativeMetricLimit {
    pub fn new(
        rule_id: impl Into<String>,
        metric: Metric,
        threshold: f64,
        dims: Vec<SmolStr>,
        actions: Vec<ActionKind>,
    ) -> Result<Self, ConfigError> {
        if threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        if dims.is_empty() {
            return Err(ConfigError::EmptyDimensionSelection);
        }
        Ok(Self {
            rule_id: rule_id.into(),
            metric,
            params: RwLock::new(Params { threshold, dims, actions }),
        })
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, delta: Option<Delta>) -> RuleOutcome {
        let Some(delta) = delta else { return Ok(None) };

        let params = self.params.read();
        let dim_refs: Vec<&str> = params.dims.iter().map(SmolStr::as_str).collect();
        let Some(agg_key) = ctx.dim_key().project(&dim_refs) else {
            return Ok(None);
        };

        let new_total = ctx.store().add(&agg_key, self.metric, delta, ctx.ts_ns())?;

        if new_total.as_f64() >= params.threshold {
            let reason = format!(
                "{:?} reached {} (threshold {}) for {}",
                self.metric,
                new_total.as_f64(),
                params.threshold,
                agg_key.to_subject_string(),
            );
            Ok(Some(RuleResult::new(params.actions.clone(), agg_key, reason)))
        } else {
            Ok(None)
        }
    }
}

impl Rule for CumulativeMetricLimit {
    fn id(&self) -> &str {
        &self.rule_id
    }

    fn on_order(&self, ctx: &RuleContext<'_>, order: &Order) -> RuleOutcome {
        let delta = match self.metric {
            Metric::OrderCount => Some(Delta::Integer(1)),
            Metric::OrderVolume => Some(Delta::Integer(order.volume as i64)),
            Metric::OrderNotional => Some(Delta::Float(order.volume as f64 * order.price)),
            _ => None,
        };
        self.evaluate(ctx, delta)
    }

    fn on_trade(&self, ctx: &RuleContext<'_>, trade: &Trade) -> RuleOutcome {
        let delta = match self.metric {
            Metric::TradeVolume => Some(Delta::Integer(trade.volume as i64)),
            Metric::TradeNotional => Some(Delta::Float(trade.volume as f64 * trade.price)),
            Metric::TradeCount => Some(Delta::Integer(1)),
            _ => None,
        };
        self.evaluate(ctx, delta)
    }

    fn on_cancel(&self, ctx: &RuleContext<'_>, cancel: &Cancel) -> RuleOutcome {
        let delta = match self.metric {
            Metric::CancelCount => Some(Delta::Integer(1)),
            Metric::CancelVolume => Some(Delta::Integer(cancel.cancel_volume as i64)),
            _ => None,
        };
        self.evaluate(ctx, delta)
    }

    fn update_parameter(&self, name: &str, value: ParamValue) -> Result<(), ConfigError> {
        let mut params = self.params.write();
        match (name, value) {
            ("threshold", ParamValue::Number(v)) => {
                if v <= 0.0 {
                    return Err(ConfigError::InvalidThreshold(v));
                }
                params.threshold = v;
                Ok(())
            }
            ("dims", ParamValue::Dimensions(v)) => {
                if v.is_empty() {
                    return Err(ConfigError::EmptyDimensionSelection);
                }
                params.dims = v;
                Ok(())
            }
            ("actions", ParamValue::Actions(v)) => {
                params.actions = v;
                Ok(())
            }
            (other, _) => Err(ConfigError::UnknownParameter(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::NullWindowRegistry;
    use warden_catalog::{Catalog, Extras};
    use warden_store::CounterStore;

    fn ctx_key(account: &str, product: &str) -> warden_model::DimensionKey {
        let catalog = Catalog::builder()
            .with_contract_product("T2303", product)
            .build();
        let account = smol_str::SmolStr::new(account);
        let contract = smol_str::SmolStr::new("T2303");
        catalog.resolve(Some(&account), Some(&contract), None, None, Extras::default())
    }

    #[test]
    fn fires_on_the_event_that_crosses_the_threshold() {
        let rule = CumulativeMetricLimit::new(
            "vol-limit",
            Metric::TradeVolume,
            1000.0,
            vec![SmolStr::new("account_id"), SmolStr::new("product_id")],
            vec![ActionKind::SuspendAccountTrading],
        )
        .unwrap();

        let store = CounterStore::new(4);
        let windows = NullWindowRegistry;
        let dim_key = ctx_key("A", "T10Y");

        let trade1 = Trade { trade_id: 1, order_id: 1, price: 1.0, volume: 990, ts_ns: 0, account_id: None, contract_id: None };
        let ctx = RuleContext::new(&dim_key, 0, &store, &windows);
        assert!(rule.on_trade(&ctx, &trade1).unwrap().is_none());

        let trade2 = Trade { trade_id: 2, order_id: 2, price: 1.0, volume: 10, ts_ns: 1, account_id: None, contract_id: None };
        let ctx = RuleContext::new(&dim_key, 1, &store, &windows);
        let result = rule.on_trade(&ctx, &trade2).unwrap().unwrap();
        assert_eq!(result.actions, vec![ActionKind::SuspendAccountTrading]);
        assert_eq!(result.subject.get("account_id").unwrap().as_str(), "A");
        assert_eq!(result.subject.get("product_id").unwrap().as_str(), "T10Y");
        assert!(result.subject.get("contract_id").is_none());
    }

    #[test]
    fn refires_on_every_event_once_past_threshold() {
        let rule = CumulativeMetricLimit::new(
            "vol-limit",
            Metric::TradeVolume,
            10.0,
            vec![SmolStr::new("account_id")],
            vec![ActionKind::Alert],
        )
        .unwrap();
        let store = CounterStore::new(4);
        let windows = NullWindowRegistry;
        let dim_key = ctx_key("A", "T10Y");

        for i in 0..3u64 {
            let trade = Trade { trade_id: i, order_id: i, price: 1.0, volume: 10, ts_ns: i, account_id: None, contract_id: None };
            let ctx = RuleContext::new(&dim_key, i, &store, &windows);
            assert!(rule.on_trade(&ctx, &trade).unwrap().is_some());
        }
    }

    #[test]
    fn inapplicable_when_a_selected_dimension_is_missing() {
        let rule = CumulativeMetricLimit::new(
            "vol-limit",
            Metric::TradeVolume,
            10.0,
            vec![SmolStr::new("exchange_id")],
            vec![ActionKind::Alert],
        )
        .unwrap();
        let store = CounterStore::new(4);
        let windows = NullWindowRegistry;
        let dim_key = ctx_key("A", "T10Y");
        let trade = Trade { trade_id: 1, order_id: 1, price: 1.0, volume: 100, ts_ns: 0, account_id: None, contract_id: None };
        let ctx = RuleContext::new(&dim_key, 0, &store, &windows);
        assert!(rule.on_trade(&ctx, &trade).unwrap().is_none());
    }

    #[test]
    fn construction_rejects_non_positive_threshold() {
        assert!(CumulativeMetricLimit::new("r", Metric::TradeVolume, 0.0, vec![SmolStr::new("account_id")], vec![]).is_err());
    }
}
