//! Upgrade resources, their grades, and the currencies they can be bought
//! with.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{ResourceKey, ShipName};

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Alternate currencies a shortfall can be priced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Currency {
    AdventureSeal,
    PirateCoin,
    OceanCoin,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Self::AdventureSeal, Self::PirateCoin, Self::OceanCoin];

    /// Wire/storage key, e.g. `pirateCoin`.
    pub fn key(self) -> &'static str {
        match self {
            Self::AdventureSeal => "adventureSeal",
            Self::PirateCoin => "pirateCoin",
            Self::OceanCoin => "oceanCoin",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::AdventureSeal => "Adventure Seal",
            Self::PirateCoin => "Pirate Coin",
            Self::OceanCoin => "Ocean Coin",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Currency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::Validation(format!("Unknown currency: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Grade
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Common,
    Advanced,
    Rare,
    Heroic,
    Legendary,
}

impl Grade {
    pub const ALL: [Grade; 5] = [
        Self::Common,
        Self::Advanced,
        Self::Rare,
        Self::Heroic,
        Self::Legendary,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Advanced => "Advanced",
            Self::Rare => "Rare",
            Self::Heroic => "Heroic",
            Self::Legendary => "Legendary",
        }
    }
}

// ---------------------------------------------------------------------------
// Resource definitions
// ---------------------------------------------------------------------------

/// Where a resource comes from. Common resources are shared by every ship;
/// ship-specific ones are tracked per owning ship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ship", rename_all = "snake_case")]
pub enum ResourceOrigin {
    Common,
    ShipSpecific(ShipName),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    pub key: ResourceKey,
    pub name: String,
    pub grade: Grade,
    /// Unit price per currency; `0` means not purchasable with it.
    pub prices: BTreeMap<Currency, u64>,
    pub origin: ResourceOrigin,
}

impl ResourceDefinition {
    /// Unit price in `currency`, `0` when the resource cannot be bought with it.
    pub fn price(&self, currency: Currency) -> u64 {
        self.prices.get(&currency).copied().unwrap_or(0)
    }

    pub fn is_common(&self) -> bool {
        self.origin == ResourceOrigin::Common
    }

    /// Currencies this resource can actually be bought with.
    pub fn purchasable_with(&self) -> Vec<Currency> {
        Currency::ALL
            .into_iter()
            .filter(|c| self.price(*c) > 0)
            .collect()
    }
}

/// Group resource definitions by grade, preserving input order within each
/// grade. Every grade is present in the result, possibly empty.
pub fn group_by_grade<'a, I>(resources: I) -> BTreeMap<Grade, Vec<&'a ResourceDefinition>>
where
    I: IntoIterator<Item = &'a ResourceDefinition>,
{
    let mut grouped: BTreeMap<Grade, Vec<&ResourceDefinition>> =
        Grade::ALL.into_iter().map(|g| (g, Vec::new())).collect();
    for resource in resources {
        grouped.entry(resource.grade).or_default().push(resource);
    }
    grouped
}
