use crate::context::RuleContext;
use crate::error::{ConfigError, RuleError};
use smol_str::SmolStr;
use warden_model::{ActionKind, Cancel, DimensionKey, Order, Trade};

/// A dynamically-settable rule parameter, passed to
/// [`Rule::update_parameter`]. Spec §9 "dynamic dispatch & plug-in rules":
/// the duck-typed rule objects of the source become this trait plus a small
/// value type for parameter mutation, rather than per-rule bespoke setters.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    WindowSeconds(u32),
    Dimensions(Vec<SmolStr>),
    Actions(Vec<ActionKind>),
}

/// Zero or more remediations a [`Rule`] recommends for a single event.
///
/// `actions` is non-empty by construction of the built-in rules; a custom
/// rule returning an empty `actions` list is a caller error the engine does
/// not attempt to detect (the spec leaves this to the rule author).
#[derive(Debug, Clone, PartialEq)]
pub struct RuleResult {
    pub actions: Vec<ActionKind>,
    pub subject: DimensionKey,
    pub reason: String,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl RuleResult {
    pub fn new(actions: Vec<ActionKind>, subject: DimensionKey, reason: impl Into<String>) -> Self {
        Self { actions, subject, reason: reason.into(), metadata: None }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

pub type RuleOutcome = Result<Option<RuleResult>, RuleError>;

/// The rule contract: three per-event callbacks, any of which may be a
/// no-op, plus a uniform dynamic-parameter surface.
///
/// Implementations must be `Send + Sync` — the engine holds rules behind a
/// shared, atomically-swappable list read concurrently from every ingest
/// thread (spec §5, §9).
pub trait Rule: Send + Sync {
    fn id(&self) -> &str;

    fn on_order(&self, _ctx: &RuleContext<'_>, _order: &Order) -> RuleOutcome {
        Ok(None)
    }

    fn on_trade(&self, _ctx: &RuleContext<'_>, _trade: &Trade) -> RuleOutcome {
        Ok(None)
    }

    fn on_cancel(&self, _ctx: &RuleContext<'_>, _cancel: &Cancel) -> RuleOutcome {
        Ok(None)
    }

    /// Mutate a single named parameter in place. Built-in rules validate the
    /// invariants named in spec §4.E (`threshold > 0`, `window_seconds >= 1`,
    /// non-empty dimension selection) before applying the change.
    fn update_parameter(&self, name: &str, _value: ParamValue) -> Result<(), ConfigError> {
        Err(ConfigError::UnknownParameter(name.to_string()))
    }

    /// Opaque, rule-owned state to carry through `snapshot()`/`restore()`
    /// (spec §6: "per-key suspended flags" for rate-limit rules). Most rules
    /// have none; [`crate::rate_limit::RateLimit`] is the one built-in that
    /// overrides this.
    fn snapshot_state(&self) -> Option<serde_json::Value> {
        None
    }

    /// Apply previously-snapshotted state. Called only with a value this
    /// same rule produced via `snapshot_state`; a mismatched shape is a
    /// caller error, not a silently-absorbed one.
    fn restore_state(&self, _state: serde_json::Value) -> Result<(), ConfigError> {
        Ok(())
    }
}
