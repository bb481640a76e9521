//! Instrument Catalog — component A of the Warden pre-trade risk engine.
//!
//! Static maps (contract→product, contract→exchange, account→group) that
//! resolve the canonical [`DimensionKey`] for an event. Immutable after
//! construction, save for the append-only extension-dimension registry.

use parking_lot::RwLock;
use smol_str::SmolStr;
use std::collections::{HashMap, HashSet};
use warden_model::dimension::names;
use warden_model::DimensionKey;

/// Builder for a [`Catalog`], mirroring the consuming-`self` builder style
/// used throughout the reference workspace's instrument-index crate.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    contract_to_product: HashMap<SmolStr, SmolStr>,
    contract_to_exchange: HashMap<SmolStr, SmolStr>,
    account_to_group: HashMap<SmolStr, SmolStr>,
    extensions: HashSet<SmolStr>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contract_product(mut self, contract_id: impl Into<SmolStr>, product_id: impl Into<SmolStr>) -> Self {
        self.contract_to_product.insert(contract_id.into(), product_id.into());
        self
    }

    pub fn with_contract_exchange(mut self, contract_id: impl Into<SmolStr>, exchange_id: impl Into<SmolStr>) -> Self {
        self.contract_to_exchange.insert(contract_id.into(), exchange_id.into());
        self
    }

    pub fn with_account_group(mut self, account_id: impl Into<SmolStr>, group_id: impl Into<SmolStr>) -> Self {
        self.account_to_group.insert(account_id.into(), group_id.into());
        self
    }

    pub fn with_extension(mut self, name: impl Into<SmolStr>) -> Self {
        self.extensions.insert(name.into());
        self
    }

    pub fn build(self) -> Catalog {
        Catalog {
            contract_to_product: self.contract_to_product,
            contract_to_exchange: self.contract_to_exchange,
            account_to_group: self.account_to_group,
            extensions: RwLock::new(self.extensions),
        }
    }
}

/// Static reference-data catalog resolving an event's [`DimensionKey`].
///
/// The catalog never fails to resolve: unmapped contracts and accounts
/// simply yield keys without those dimensions (spec §4.A).
#[derive(Debug)]
pub struct Catalog {
    contract_to_product: HashMap<SmolStr, SmolStr>,
    contract_to_exchange: HashMap<SmolStr, SmolStr>,
    account_to_group: HashMap<SmolStr, SmolStr>,
    extensions: RwLock<HashSet<SmolStr>>,
}

/// Optional overrides and extension dimensions passed alongside the event's
/// identifying fields. Mirrors the Python original's `**extras` kwargs as an
/// explicit, typed slice.
#[derive(Debug, Default, Clone)]
pub struct Extras<'a>(pub &'a [(&'a str, Option<&'a SmolStr>)]);

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Register a new extension dimension name ahead of first use.
    ///
    /// Returns `true` if the name was newly registered, `false` if it was
    /// already known — registration is idempotent, not an error (supplements
    /// the distilled spec per `examples/original_source/risk_engine/dimensions.py`).
    pub fn register_extension(&self, name: impl Into<SmolStr>) -> bool {
        self.extensions.write().insert(name.into())
    }

    pub fn is_extension_registered(&self, name: &str) -> bool {
        self.extensions.read().contains(name)
    }

    /// Resolve the canonical [`DimensionKey`] for an event's identifying
    /// fields, per spec §4.A's resolution rules.
    pub fn resolve(
        &self,
        account_id: Option<&SmolStr>,
        contract_id: Option<&SmolStr>,
        exchange_id: Option<&SmolStr>,
        account_group_id: Option<&SmolStr>,
        extras: Extras<'_>,
    ) -> DimensionKey {
        let mut pairs = Vec::with_capacity(5 + extras.0.len());

        if let Some(account_id) = account_id {
            pairs.push((SmolStr::new_static(names::ACCOUNT_ID), account_id.clone()));
        }

        let mut exchange_id = exchange_id.cloned();
        let mut product_id = None;
        if let Some(contract_id) = contract_id {
            pairs.push((SmolStr::new_static(names::CONTRACT_ID), contract_id.clone()));

            if exchange_id.is_none() {
                exchange_id = self.contract_to_exchange.get(contract_id).cloned();
            }
            product_id = self.contract_to_product.get(contract_id).cloned();
        }

        if let Some(product_id) = product_id {
            pairs.push((SmolStr::new_static(names::PRODUCT_ID), product_id));
        }

        if let Some(exchange_id) = exchange_id {
            pairs.push((SmolStr::new_static(names::EXCHANGE_ID), exchange_id));
        }

        let mut account_group_id = account_group_id.cloned();
        if account_group_id.is_none() {
            if let Some(account_id) = account_id {
                account_group_id = self.account_to_group.get(account_id).cloned();
            }
        }
        if let Some(account_group_id) = account_group_id {
            pairs.push((SmolStr::new_static(names::ACCOUNT_GROUP_ID), account_group_id));
        }

        let registered = self.extensions.read();
        for (name, value) in extras.0 {
            if let Some(value) = value {
                if registered.contains(*name) {
                    pairs.push((SmolStr::new(*name), (*value).clone()));
                }
            }
        }
        drop(registered);

        DimensionKey::from_pairs(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::builder()
            .with_contract_product("T2303", "T10Y")
            .with_contract_product("T2306", "T10Y")
            .with_contract_exchange("T2303", "CFFEX")
            .with_contract_exchange("T2306", "CFFEX")
            .with_account_group("ACC1", "GROUPA")
            .build()
    }

    #[test]
    fn resolves_product_and_exchange_from_contract() {
        let cat = catalog();
        let contract = SmolStr::new("T2303");
        let key = cat.resolve(None, Some(&contract), None, None, Extras::default());
        assert_eq!(key.get("product_id").map(|s| s.as_str()), Some("T10Y"));
        assert_eq!(key.get("exchange_id").map(|s| s.as_str()), Some("CFFEX"));
    }

    #[test]
    fn explicit_exchange_overrides_catalog_lookup() {
        let cat = catalog();
        let contract = SmolStr::new("T2303");
        let override_exchange = SmolStr::new("SHFE");
        let key = cat.resolve(None, Some(&contract), Some(&override_exchange), None, Extras::default());
        assert_eq!(key.get("exchange_id").map(|s| s.as_str()), Some("SHFE"));
    }

    #[test]
    fn unmapped_contract_omits_product_and_exchange() {
        let cat = catalog();
        let contract = SmolStr::new("UNKNOWN");
        let key = cat.resolve(None, Some(&contract), None, None, Extras::default());
        assert!(key.get("product_id").is_none());
        assert!(key.get("exchange_id").is_none());
        assert_eq!(key.get("contract_id").map(|s| s.as_str()), Some("UNKNOWN"));
    }

    #[test]
    fn account_group_resolved_from_catalog_when_not_overridden() {
        let cat = catalog();
        let account = SmolStr::new("ACC1");
        let key = cat.resolve(Some(&account), None, None, None, Extras::default());
        assert_eq!(key.get("account_group_id").map(|s| s.as_str()), Some("GROUPA"));
    }

    #[test]
    fn unregistered_extension_is_dropped() {
        let cat = catalog();
        let account = SmolStr::new("ACC1");
        let strategy = SmolStr::new("MOMENTUM");
        let extras = [("strategy_id", Some(&strategy))];
        let key = cat.resolve(Some(&account), None, None, None, Extras(&extras));
        assert!(key.get("strategy_id").is_none());
    }

    #[test]
    fn registered_extension_is_carried_through() {
        let cat = catalog();
        assert!(cat.register_extension("strategy_id"));
        assert!(!cat.register_extension("strategy_id"));

        let account = SmolStr::new("ACC1");
        let strategy = SmolStr::new("MOMENTUM");
        let extras = [("strategy_id", Some(&strategy))];
        let key = cat.resolve(Some(&account), None, None, None, Extras(&extras));
        assert_eq!(key.get("strategy_id").map(|s| s.as_str()), Some("MOMENTUM"));
    }
}
