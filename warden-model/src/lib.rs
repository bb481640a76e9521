//! Core value types shared across the Warden pre-trade risk engine: ingest
//! events, the dimension key / day id used to index aggregates, the closed
//! [`Metric`] enumeration, and the [`Action`] taxonomy rules emit.
//!
//! This crate has no behavior of its own — everything here is a plain,
//! `Serialize`/`Deserialize`-able value type, cheap to clone, free of locks or
//! I/O.

pub mod action;
pub mod dimension;
pub mod event;
pub mod metric;

pub use action::{Action, ActionKind, Emitted};
pub use dimension::{DayId, DimensionKey};
pub use event::{Cancel, Event, Order, Side, Trade};
pub use metric::{Delta, Metric, MetricKind, Total};
