use crate::event::Event;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Closed taxonomy of remediation kinds a [`Rule`](warden_rules::Rule) may
/// recommend. Extensible only by the caller's own interpretation of
/// [`Action::metadata`]; the core never adds variants at runtime.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, Serialize, Deserialize)]
pub enum ActionKind {
    SuspendAccountTrading,
    ResumeAccountTrading,
    SuspendOrdering,
    ResumeOrdering,
    BlockOrder,
    Alert,
    ReducePosition,
    IncreaseMargin,
    SuspendContract,
    SuspendProduct,
    SuspendExchange,
    SuspendAccountGroup,
    ForceClose,
    BlockCancel,
}

/// A single remediation record emitted by a rule.
///
/// `subject` is the stringified aggregation key the action pertains to
/// (spec glossary: "Subject"); it is what [`crate::action::Emitted::dedup_key`]
/// dedupes on, paired with `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub subject: String,
    pub rule_id: String,
    pub reason: String,
    pub ts_ns: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// An [`Action`] paired with the event that caused it, as returned from the
/// engine's `on_order`/`on_trade`/`on_cancel` and handed to the action sink.
///
/// Spec §6 describes the sink contract as `sink(action, rule_id, subject_event)`;
/// `rule_id` already lives on [`Action`], so this type carries exactly the two
/// remaining pieces the sink and the caller both need: the action itself and
/// the originating event for traceability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emitted {
    pub action: Action,
    pub subject_event: Event,
}

impl Emitted {
    /// Dedup identity per spec §4.E step 7: `(action kind, subject)`.
    pub fn dedup_key(&self) -> (ActionKind, &str) {
        (self.action.kind, self.action.subject.as_str())
    }
}
