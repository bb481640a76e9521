use serde::{Deserialize, Serialize};

/// Closed enumeration of counter slots backing the stats engine.
///
/// Only the first eight variants are written by the built-in rules
/// ([`CumulativeMetricLimit`](warden_rules)); the remainder are reserved
/// extension slots custom rules may populate.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Metric {
    TradeVolume,
    TradeNotional,
    TradeCount,
    OrderCount,
    OrderVolume,
    OrderNotional,
    CancelCount,
    CancelVolume,
    CancelRate,
    PositionVolume,
    PositionNotional,
    RealizedPnl,
    UnrealizedPnl,
    UsedMargin,
}

impl Metric {
    /// `true` for slots no built-in rule ever writes (spec §3: "reserved
    /// extension slots that custom rules may populate").
    pub fn is_reserved_extension_slot(self) -> bool {
        matches!(
            self,
            Metric::CancelRate
                | Metric::PositionVolume
                | Metric::PositionNotional
                | Metric::RealizedPnl
                | Metric::UnrealizedPnl
                | Metric::UsedMargin
        )
    }
}

/// The numeric kind a [`Metric`] is latched to on its first write.
///
/// Spec §4.B: "a metric is effectively typed on first write; mixing kinds on
/// one metric is a caller error" — this is that latch, made explicit rather
/// than left to float/int coercion.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum MetricKind {
    Integer,
    Float,
}

/// A counter delta, tagged with the numeric kind it was produced as.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum Delta {
    Integer(i64),
    Float(f64),
}

impl Delta {
    pub fn kind(self) -> MetricKind {
        match self {
            Delta::Integer(_) => MetricKind::Integer,
            Delta::Float(_) => MetricKind::Float,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Delta::Integer(v) => v as f64,
            Delta::Float(v) => v,
        }
    }
}

/// A counter total, tagged with the numeric kind it was accumulated as.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum Total {
    Integer(i64),
    Float(f64),
}

impl Total {
    pub fn as_f64(self) -> f64 {
        match self {
            Total::Integer(v) => v as f64,
            Total::Float(v) => v,
        }
    }

    pub fn kind(self) -> MetricKind {
        match self {
            Total::Integer(_) => MetricKind::Integer,
            Total::Float(_) => MetricKind::Float,
        }
    }

    pub fn zero(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Integer => Total::Integer(0),
            MetricKind::Float => Total::Float(0.0),
        }
    }

    pub fn add(self, delta: Delta) -> Self {
        match (self, delta) {
            (Total::Integer(a), Delta::Integer(b)) => Total::Integer(a + b),
            (Total::Float(a), Delta::Float(b)) => Total::Float(a + b),
            // Kind mismatches are caught by warden_store before reaching here;
            // widen defensively rather than panic in a hot path.
            (Total::Integer(a), Delta::Float(b)) => Total::Float(a as f64 + b),
            (Total::Float(a), Delta::Integer(b)) => Total::Float(a + b as f64),
        }
    }
}
