//! Ship upgrade resource calculator.
//!
//! Given which ships are selected, their current levels and a common target
//! level, works out what the upgrades require, what is still missing after
//! subtracting owned stock, and what the missing part costs in the chosen
//! currencies. Everything here is a pure function of its inputs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::resources::{Currency, ResourceOrigin};
use crate::ships::{ShipCatalog, BASE_LEVEL, DEFAULT_SELECTED_SHIP, MIN_TARGET_LEVEL};
use crate::types::{ResourceKey, ShipName};

/// Resource quantities keyed by resource key.
pub type Quantities = BTreeMap<ResourceKey, u64>;

// ---------------------------------------------------------------------------
// Selection state
// ---------------------------------------------------------------------------

/// Everything the user has entered into the calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub selected_ships: BTreeMap<ShipName, bool>,
    pub current_levels: BTreeMap<ShipName, u32>,
    pub target_level: u32,
    pub owned_common: Quantities,
    pub owned_per_ship: BTreeMap<ShipName, Quantities>,
}

impl SelectionState {
    /// Fresh state: only the default ship selected, every ship at the base
    /// level, target at the catalog maximum, nothing owned.
    pub fn default_for(catalog: &ShipCatalog) -> Self {
        let selected_ships = catalog
            .ships()
            .iter()
            .map(|s| (s.name.clone(), s.name == DEFAULT_SELECTED_SHIP))
            .collect();
        let current_levels = catalog
            .ships()
            .iter()
            .map(|s| (s.name.clone(), BASE_LEVEL))
            .collect();
        let owned_common = catalog
            .common_resources()
            .map(|r| (r.key.clone(), 0))
            .collect();
        let owned_per_ship = catalog
            .ships()
            .iter()
            .map(|s| {
                let owned = catalog
                    .ship_resources(&s.name)
                    .map(|r| (r.key.clone(), 0))
                    .collect();
                (s.name.clone(), owned)
            })
            .collect();

        Self {
            selected_ships,
            current_levels,
            target_level: catalog.max_level(),
            owned_common,
            owned_per_ship,
        }
    }

    /// Reconcile possibly stale saved state with the catalog: unknown ships
    /// and resources are dropped, missing ones get defaults, and levels are
    /// clamped into range.
    pub fn sanitized(self, catalog: &ShipCatalog) -> Self {
        let defaults = Self::default_for(catalog);

        let selected_ships = defaults
            .selected_ships
            .iter()
            .map(|(ship, default)| {
                let value = self.selected_ships.get(ship).copied().unwrap_or(*default);
                (ship.clone(), value)
            })
            .collect();

        let current_levels = catalog
            .ships()
            .iter()
            .map(|ship| {
                let level = self
                    .current_levels
                    .get(&ship.name)
                    .copied()
                    .unwrap_or(BASE_LEVEL)
                    .clamp(BASE_LEVEL, ship.max_level);
                (ship.name.clone(), level)
            })
            .collect();

        let owned_common = defaults
            .owned_common
            .keys()
            .map(|key| (key.clone(), self.owned_common.get(key).copied().unwrap_or(0)))
            .collect();

        let owned_per_ship = defaults
            .owned_per_ship
            .iter()
            .map(|(ship, keys)| {
                let saved = self.owned_per_ship.get(ship);
                let owned = keys
                    .keys()
                    .map(|key| {
                        let qty = saved.and_then(|m| m.get(key)).copied().unwrap_or(0);
                        (key.clone(), qty)
                    })
                    .collect();
                (ship.clone(), owned)
            })
            .collect();

        let max_target = catalog.max_level().max(MIN_TARGET_LEVEL);
        Self {
            selected_ships,
            current_levels,
            target_level: self.target_level.clamp(MIN_TARGET_LEVEL, max_target),
            owned_common,
            owned_per_ship,
        }
    }

    pub fn is_selected(&self, ship: &str) -> bool {
        self.selected_ships.get(ship).copied().unwrap_or(false)
    }

    /// Names of the currently selected ships.
    pub fn selected(&self) -> impl Iterator<Item = &str> {
        self.selected_ships
            .iter()
            .filter(|(_, selected)| **selected)
            .map(|(ship, _)| ship.as_str())
    }

    pub fn current_level(&self, ship: &str) -> u32 {
        self.current_levels.get(ship).copied().unwrap_or(BASE_LEVEL)
    }

    /// Flip the selection of `ship`, returning the new state.
    pub fn toggle_ship(&mut self, ship: &str, catalog: &ShipCatalog) -> Result<bool, CoreError> {
        require_ship(catalog, ship)?;
        let entry = self.selected_ships.entry(ship.to_string()).or_insert(false);
        *entry = !*entry;
        Ok(*entry)
    }

    pub fn set_current_level(
        &mut self,
        ship: &str,
        level: u32,
        catalog: &ShipCatalog,
    ) -> Result<(), CoreError> {
        let entity = require_ship(catalog, ship)?;
        if !(BASE_LEVEL..=entity.max_level).contains(&level) {
            return Err(CoreError::Validation(format!(
                "Level for {ship} must be between {BASE_LEVEL} and {}, got {level}",
                entity.max_level
            )));
        }
        self.current_levels.insert(ship.to_string(), level);
        Ok(())
    }

    pub fn set_target_level(&mut self, level: u32, catalog: &ShipCatalog) -> Result<(), CoreError> {
        let max = catalog.max_level();
        if !(MIN_TARGET_LEVEL..=max).contains(&level) {
            return Err(CoreError::Validation(format!(
                "Target level must be between {MIN_TARGET_LEVEL} and {max}, got {level}"
            )));
        }
        self.target_level = level;
        Ok(())
    }

    /// Set the owned amount of a resource. Common resources are shared;
    /// ship-specific ones are recorded against their owning ship.
    pub fn set_owned(
        &mut self,
        key: &str,
        quantity: u64,
        catalog: &ShipCatalog,
    ) -> Result<(), CoreError> {
        let definition = catalog
            .resource(key)
            .ok_or_else(|| CoreError::Validation(format!("Unknown resource: {key}")))?;
        match &definition.origin {
            ResourceOrigin::Common => {
                self.owned_common.insert(key.to_string(), quantity);
            }
            ResourceOrigin::ShipSpecific(ship) => {
                self.owned_per_ship
                    .entry(ship.clone())
                    .or_default()
                    .insert(key.to_string(), quantity);
            }
        }
        Ok(())
    }

    /// Owned quantities as seen by the shortfall computation: common stock
    /// as-is, ship-specific stock summed across every selected ship that
    /// tracks the key.
    pub fn pooled_owned(&self) -> Quantities {
        let mut pooled = self.owned_common.clone();
        for ship in self.selected() {
            let Some(owned) = self.owned_per_ship.get(ship) else {
                continue;
            };
            for (key, qty) in owned {
                let total = pooled.entry(key.clone()).or_insert(0);
                *total = total.saturating_add(*qty);
            }
        }
        pooled
    }
}

fn require_ship<'a>(
    catalog: &'a ShipCatalog,
    ship: &str,
) -> Result<&'a crate::ships::ShipEntity, CoreError> {
    catalog
        .ship(ship)
        .ok_or_else(|| CoreError::Validation(format!("Unknown ship: {ship}")))
}

// ---------------------------------------------------------------------------
// Required resources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequiredResources {
    /// Every common resource, zero when not needed.
    pub common: Quantities,
    /// Ship-specific resources actually needed.
    pub specific: Quantities,
}

impl RequiredResources {
    /// Both buckets in one map.
    pub fn combined(&self) -> Quantities {
        self.common
            .iter()
            .chain(&self.specific)
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}

/// Sum the upgrade costs of every selected ship from its current level
/// (exclusive) to the target level (inclusive).
pub fn compute_required(selection: &SelectionState, catalog: &ShipCatalog) -> RequiredResources {
    let mut required = RequiredResources {
        common: catalog.common_resources().map(|r| (r.key.clone(), 0)).collect(),
        specific: Quantities::new(),
    };

    for ship_name in selection.selected() {
        let Some(ship) = catalog.ship(ship_name) else {
            continue;
        };
        let current = selection.current_level(ship_name);
        if current >= selection.target_level {
            continue;
        }

        for level in (current + 1)..=selection.target_level {
            let Some(cost) = ship.cost_for(level) else {
                continue;
            };
            for (key, qty) in cost {
                let bucket = if catalog.is_common(key) {
                    &mut required.common
                } else {
                    &mut required.specific
                };
                let total = bucket.entry(key.clone()).or_insert(0);
                *total = total.saturating_add(*qty);
            }
        }
    }

    required
}

/// Keys with a positive requirement, in key order. These are the resources
/// a currency can be assigned to.
pub fn used_resources(required: &RequiredResources) -> Vec<ResourceKey> {
    required
        .common
        .iter()
        .chain(&required.specific)
        .filter(|(_, qty)| **qty > 0)
        .map(|(key, _)| key.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Shortfall
// ---------------------------------------------------------------------------

/// `max(0, required - owned)` for every required key.
pub fn compute_shortfall(required: &Quantities, owned: &Quantities) -> Quantities {
    required
        .iter()
        .map(|(key, needed)| {
            let have = owned.get(key).copied().unwrap_or(0);
            (key.clone(), needed.saturating_sub(have))
        })
        .collect()
}

/// True iff nothing is missing.
pub fn is_satisfiable(shortfall: &Quantities) -> bool {
    shortfall.values().all(|qty| *qty == 0)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Shortfall {
    pub common: Quantities,
    pub specific: Quantities,
}

impl Shortfall {
    /// Shortfall of both buckets against the selection's pooled stock.
    pub fn of(required: &RequiredResources, selection: &SelectionState) -> Self {
        let owned = selection.pooled_owned();
        Self {
            common: compute_shortfall(&required.common, &owned),
            specific: compute_shortfall(&required.specific, &owned),
        }
    }

    pub fn combined(&self) -> Quantities {
        self.common
            .iter()
            .chain(&self.specific)
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    pub fn is_satisfiable(&self) -> bool {
        is_satisfiable(&self.common) && is_satisfiable(&self.specific)
    }
}

// ---------------------------------------------------------------------------
// Currency selection and pricing
// ---------------------------------------------------------------------------

/// State of the "price everything in" selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "currency", rename_all = "snake_case")]
pub enum GlobalCurrency {
    #[default]
    None,
    Uniform(Currency),
    /// Per-key assignments were edited after the last bulk selection.
    Custom,
}

/// Which currency each shortfall is to be bought with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencySelection {
    pub global: GlobalCurrency,
    pub per_key: BTreeMap<ResourceKey, Currency>,
}

impl CurrencySelection {
    /// Bulk selection. `Some` overwrites every assignment with `currency`
    /// for the given keys; `None` clears all assignments.
    pub fn select_all<'a, I>(&mut self, currency: Option<Currency>, keys: I)
    where
        I: IntoIterator<Item = &'a ResourceKey>,
    {
        self.per_key.clear();
        match currency {
            Some(currency) => {
                self.global = GlobalCurrency::Uniform(currency);
                self.per_key
                    .extend(keys.into_iter().map(|key| (key.clone(), currency)));
            }
            None => self.global = GlobalCurrency::None,
        }
    }

    /// Assign (or with `None`, unassign) one key. Always demotes the global
    /// selector to [`GlobalCurrency::Custom`].
    pub fn assign(&mut self, key: &str, currency: Option<Currency>) {
        match currency {
            Some(currency) => {
                self.per_key.insert(key.to_string(), currency);
            }
            None => {
                self.per_key.remove(key);
            }
        }
        self.global = GlobalCurrency::Custom;
    }

    pub fn currency_for(&self, key: &str) -> Option<Currency> {
        self.per_key.get(key).copied()
    }
}

/// Total currency needed to buy every priced shortfall.
///
/// Keys without an assigned currency, without a definition, or whose price
/// in the assigned currency is `0` contribute nothing.
pub fn price_shortfall(
    shortfall: &Quantities,
    catalog: &ShipCatalog,
    currencies: &CurrencySelection,
) -> BTreeMap<Currency, u64> {
    let mut totals = BTreeMap::new();
    for (key, missing) in shortfall {
        if *missing == 0 {
            continue;
        }
        let Some(currency) = currencies.currency_for(key) else {
            continue;
        };
        let price = catalog.resource(key).map(|r| r.price(currency)).unwrap_or(0);
        if price == 0 {
            continue;
        }
        let total = totals.entry(currency).or_insert(0u64);
        *total = total.saturating_add(missing.saturating_mul(price));
    }
    totals
}

// ---------------------------------------------------------------------------
// Full plan
// ---------------------------------------------------------------------------

/// Everything the calculator shows for one selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradePlan {
    pub required: RequiredResources,
    pub shortfall: Shortfall,
    pub costs: BTreeMap<Currency, u64>,
    pub satisfiable: bool,
}

impl UpgradePlan {
    pub fn compute(
        selection: &SelectionState,
        catalog: &ShipCatalog,
        currencies: &CurrencySelection,
    ) -> Self {
        let required = compute_required(selection, catalog);
        let shortfall = Shortfall::of(&required, selection);
        let costs = price_shortfall(&shortfall.combined(), catalog, currencies);
        let satisfiable = shortfall.is_satisfiable();
        Self {
            required,
            shortfall,
            costs,
            satisfiable,
        }
    }
}
