use thiserror::Error;

/// Validation failures surfaced from rule construction or
/// [`crate::rule::Rule::update_parameter`]. Spec §4.E: "invariants on
/// threshold (>0), window_seconds (≥1), dimension selection (non-empty and
/// registered)".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("threshold must be positive, got {0}")]
    InvalidThreshold(f64),

    #[error("window_seconds must be >= 1, got {0}")]
    InvalidWindowSeconds(u32),

    #[error("dimension selection must be non-empty")]
    EmptyDimensionSelection,

    #[error("unknown dimension: {0}")]
    UnknownDimension(String),

    #[error("unknown parameter {0:?} for this rule")]
    UnknownParameter(String),

    #[error("parameter {name:?} cannot be set to this value: {reason}")]
    InvalidValue { name: String, reason: String },
}

/// Errors a [`crate::rule::Rule`] callback can raise. Distinct from "rule is
/// inapplicable" (`Ok(None)`): a `RuleError` is a hard error per spec §7 and
/// propagates out of the engine's `on_*` to the caller.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum RuleError {
    #[error(transparent)]
    Store(#[from] warden_store::StoreError),
}
