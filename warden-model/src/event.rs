use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Side of an [`Order`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

/// An immutable order-entry event.
///
/// `exchange_id` and `account_group_id` are overrides: when present they take
/// priority over whatever the [`Catalog`](warden_catalog) would otherwise resolve
/// from `contract_id` / `account_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: u64,
    pub account_id: SmolStr,
    pub contract_id: SmolStr,
    pub side: Side,
    pub price: f64,
    pub volume: i32,
    pub ts_ns: u64,
    pub exchange_id: Option<SmolStr>,
    pub account_group_id: Option<SmolStr>,
}

/// An immutable trade (fill) event.
///
/// `account_id` / `contract_id` are optional on the wire: when absent the
/// engine attributes the trade using its order-attribution table (see
/// `warden_engine::attribution`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: u64,
    pub order_id: u64,
    pub price: f64,
    pub volume: i32,
    pub ts_ns: u64,
    pub account_id: Option<SmolStr>,
    pub contract_id: Option<SmolStr>,
}

/// An immutable cancel event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cancel {
    pub cancel_id: u64,
    pub cancelled_order_id: u64,
    pub cancel_volume: i32,
    pub ts_ns: u64,
    pub account_id: Option<SmolStr>,
    pub contract_id: Option<SmolStr>,
}

/// The union of ingestable event kinds, retained on an emitted [`crate::action::Emitted`]
/// purely for downstream traceability (spec §6 "subject_event").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Order(Order),
    Trade(Trade),
    Cancel(Cancel),
}

impl Event {
    pub fn ts_ns(&self) -> u64 {
        match self {
            Event::Order(o) => o.ts_ns,
            Event::Trade(t) => t.ts_ns,
            Event::Cancel(c) => c.ts_ns,
        }
    }
}

impl From<Order> for Event {
    fn from(value: Order) -> Self {
        Event::Order(value)
    }
}

impl From<Trade> for Event {
    fn from(value: Trade) -> Self {
        Event::Trade(value)
    }
}

impl From<Cancel> for Event {
    fn from(value: Cancel) -> Self {
        Event::Cancel(value)
    }
}
