use thiserror::Error;
use warden_rules::{ConfigError, RuleError};
use warden_store::StoreError;

/// Errors the [`crate::RiskEngine`] (or its builder) can raise.
///
/// Mirrors the teacher's recoverable/unrecoverable split, but the line is
/// drawn differently for this domain: a [`StoreError`] is a hard error
/// surfaced synchronously from `on_*` (spec §4.E/§7) — it is not recoverable
/// in the sense of being silently absorbed, but it also never terminates the
/// engine; the caller simply gets an `Err` for that one event and may keep
/// calling `on_*` for the next. A rule callback *panic* is the one failure
/// mode the engine does absorb: it is caught, logged, and the event
/// continues through the remaining rules.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("counter store error: {0}")]
    Store(#[from] StoreError),

    #[error("rule configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("unknown rule id: {0:?}")]
    UnknownRule(String),

    #[error("snapshot restore failed: {0}")]
    Snapshot(String),
}

impl From<RuleError> for EngineError {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::Store(err) => EngineError::Store(err),
        }
    }
}
