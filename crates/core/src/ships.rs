//! Static ship upgrade tables and the resource catalog.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::resources::{Currency, Grade, ResourceDefinition, ResourceOrigin};
use crate::types::{ResourceKey, ShipName};

/// Quantity of each resource needed to reach one level from the previous.
pub type ResourceCost = BTreeMap<ResourceKey, u64>;

/// Lowest level a ship can have; it has no upgrade cost.
pub const BASE_LEVEL: u32 = 1;
/// Highest level any ship in the standard catalog reaches.
pub const MAX_SHIP_LEVEL: u32 = 11;
/// Lowest selectable target level.
pub const MIN_TARGET_LEVEL: u32 = BASE_LEVEL + 1;
/// Ship selected when no saved selection exists.
pub const DEFAULT_SELECTED_SHIP: &str = "Pungbaek";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipEntity {
    pub name: ShipName,
    pub max_level: u32,
    /// Cost of reaching each level, keyed by the level reached.
    pub upgrades: BTreeMap<u32, ResourceCost>,
}

impl ShipEntity {
    /// Cost of reaching `level`, if the table defines one.
    pub fn cost_for(&self, level: u32) -> Option<&ResourceCost> {
        self.upgrades.get(&level)
    }
}

/// Ships plus the definitions of every resource their tables mention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipCatalog {
    ships: Vec<ShipEntity>,
    resources: BTreeMap<ResourceKey, ResourceDefinition>,
}

static STANDARD_CATALOG: LazyLock<ShipCatalog> = LazyLock::new(build_standard_catalog);

impl ShipCatalog {
    pub fn new(ships: Vec<ShipEntity>, resources: Vec<ResourceDefinition>) -> Self {
        Self {
            ships,
            resources: resources.into_iter().map(|r| (r.key.clone(), r)).collect(),
        }
    }

    /// The game's eight upgradeable ships.
    pub fn standard() -> &'static ShipCatalog {
        &STANDARD_CATALOG
    }

    /// Ships in display order.
    pub fn ships(&self) -> &[ShipEntity] {
        &self.ships
    }

    pub fn ship(&self, name: &str) -> Option<&ShipEntity> {
        self.ships.iter().find(|s| s.name == name)
    }

    pub fn resource(&self, key: &str) -> Option<&ResourceDefinition> {
        self.resources.get(key)
    }

    /// Whether `key` is a shared resource. Keys without a definition are
    /// treated as ship-specific.
    pub fn is_common(&self, key: &str) -> bool {
        self.resource(key).is_some_and(ResourceDefinition::is_common)
    }

    pub fn common_resources(&self) -> impl Iterator<Item = &ResourceDefinition> {
        self.resources.values().filter(|r| r.is_common())
    }

    /// Resources tracked separately for `ship`.
    pub fn ship_resources<'a>(
        &'a self,
        ship: &'a str,
    ) -> impl Iterator<Item = &'a ResourceDefinition> + 'a {
        self.resources
            .values()
            .filter(move |r| matches!(&r.origin, ResourceOrigin::ShipSpecific(owner) if owner == ship))
    }

    /// Highest level across all ships, used as the default target.
    pub fn max_level(&self) -> u32 {
        self.ships
            .iter()
            .map(|s| s.max_level)
            .max()
            .unwrap_or(BASE_LEVEL)
    }
}

// ---------------------------------------------------------------------------
// Standard data
// ---------------------------------------------------------------------------

/// `(name, [blueprint, rare, heroic, legendary_a, legendary_b])` resource
/// keys and display names per ship.
const SHIP_SPECIFIC: [(&str, [(&str, &str); 5]); 8] = [
    (
        "Estoc",
        [
            ("estokBlueprint", "Estoc Blueprint"),
            ("bilbulinWood", "Bilbrin Timber"),
            ("grayHammerIron", "Grayhammer Ingot"),
            ("maneWaveCloth", "Manewave Sailcloth"),
            ("eagleWheelFragment", "Eagle Helm Fragment"),
        ],
    ),
    (
        "Pungbaek",
        [
            ("pongbaekBlueprint", "Pungbaek Blueprint"),
            ("soundForestBamboo", "Sounding Forest Bamboo"),
            ("delphiStringDye", "Delphi String Dye"),
            ("changcheonSilkCloth", "Azure Silk Sailcloth"),
            ("pongyunAmulet", "Windcloud Talisman"),
        ],
    ),
    (
        "Bakhstum",
        [
            ("bakhstumBlueprint", "Bakhstum Blueprint"),
            ("sternReinforcedWood", "Stern Reinforced Timber"),
            ("reinforcedGlass", "Reinforced Glass"),
            ("manastoneEngine", "Manastone Engine Part"),
            ("glacierCrusher", "Glacier Crusher Part"),
        ],
    ),
    (
        "Pneuma",
        [
            ("pnyumaBlueprint", "Pneuma Blueprint"),
            ("lightWood", "Lightweight Timber"),
            ("premiumLubricant", "Premium Lubricant"),
            ("limraykeMountainOar", "Limrake Oar"),
            ("premiumCloth", "Finest Sailcloth"),
        ],
    ),
    (
        "Brahms",
        [
            ("bramsBlueprint", "Brahms Blueprint"),
            ("parnaWood", "Parna Timber"),
            ("pesnarlLime", "Pesnar Lime"),
            ("magicAcademyDye", "Arcanist Society Dye"),
            ("bellionGiantCloth", "Bellion Giant Sailcloth"),
        ],
    ),
    (
        "Tragon",
        [
            ("tragonBlueprint", "Tragon Blueprint"),
            ("boldaikWood", "Voldaik Timber"),
            ("arrogantSteel", "Steel of Arrogance"),
            ("highOutputEngine", "High-Output Engine Part"),
            ("reinforcedArmor", "Reinforced Outer Armor"),
        ],
    ),
    (
        "Astray",
        [
            ("astrayBlueprint", "Astray Blueprint"),
            ("pirateKnotRope", "Pirate Knot Rope"),
            ("lightningWood", "Lightning-Struck Timber"),
            ("fightingSpiritWheel", "Fighting Spirit Helm Piece"),
            ("freedomPendant", "Pendant of Freedom"),
        ],
    ),
    (
        "Ebon's Scar",
        [
            ("ebonBlueprint", "Ebon Blueprint"),
            ("bloodWood", "Bloodstained Timber"),
            ("deadCloth", "Sailcloth of the Dead"),
            ("cursedOar", "Cursed Oar"),
            ("ebonGold", "Ebon Gold Coin"),
        ],
    ),
];

/// Grades and adventure-seal prices of the five ship-specific slots. Every
/// slot but the blueprint also sells for 25 ocean coins.
const SPECIFIC_SLOTS: [(Grade, u64); 5] = [
    (Grade::Advanced, 40),
    (Grade::Rare, 50),
    (Grade::Heroic, 60),
    (Grade::Legendary, 70),
    (Grade::Legendary, 80),
];

const SPECIFIC_OCEAN_COIN_PRICE: u64 = 25;

/// `(key, name, grade, adventure seal, pirate coin)`; common resources are
/// never sold for ocean coins.
const COMMON: [(&str, &str, Grade, u64, u64); 7] = [
    ("basicPart", "Basic Ship Part", Grade::Common, 0, 0),
    ("advancedPart", "Advanced Ship Part", Grade::Advanced, 0, 0),
    ("rarePart", "Rare Ship Part", Grade::Rare, 0, 0),
    ("basicWood", "Common Timber", Grade::Advanced, 40, 250),
    ("steelPlate", "Steel Plate", Grade::Heroic, 80, 500),
    ("specialSteelPlate", "Special Steel Plate", Grade::Legendary, 100, 625),
    ("seaEssence", "Essence of the Sea", Grade::Legendary, 120, 750),
];

fn prices(seal: u64, pirate: u64, ocean: u64) -> BTreeMap<Currency, u64> {
    BTreeMap::from([
        (Currency::AdventureSeal, seal),
        (Currency::PirateCoin, pirate),
        (Currency::OceanCoin, ocean),
    ])
}

fn cost(entries: &[(&str, u64)]) -> ResourceCost {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Upgrade table shared by every ship, parameterized by its five specific
/// resource keys.
fn upgrade_table(specific: [&str; 5]) -> BTreeMap<u32, ResourceCost> {
    let [blueprint, rare, heroic, legendary_a, legendary_b] = specific;
    BTreeMap::from([
        (2, cost(&[("basicPart", 25), ("advancedPart", 7), ("basicWood", 30)])),
        (
            3,
            cost(&[("basicPart", 25), ("advancedPart", 7), ("basicWood", 30), (blueprint, 10)]),
        ),
        (
            4,
            cost(&[("basicPart", 46), ("advancedPart", 13), ("basicWood", 50), (blueprint, 20)]),
        ),
        (
            5,
            cost(&[("basicPart", 70), ("advancedPart", 20), ("basicWood", 70), (blueprint, 30)]),
        ),
        (
            6,
            cost(&[("basicPart", 102), ("advancedPart", 29), ("basicWood", 90), (rare, 50)]),
        ),
        (
            7,
            cost(&[("basicPart", 137), ("advancedPart", 41), ("basicWood", 100), (rare, 62)]),
        ),
        (
            8,
            cost(&[("basicPart", 172), ("rarePart", 25), ("steelPlate", 110), (heroic, 74)]),
        ),
        (
            9,
            cost(&[("basicPart", 214), ("rarePart", 31), ("steelPlate", 120), (heroic, 96)]),
        ),
        (
            10,
            cost(&[
                ("basicPart", 263),
                ("rarePart", 38),
                ("specialSteelPlate", 130),
                (legendary_a, 128),
            ]),
        ),
        (
            11,
            cost(&[("basicPart", 329), ("rarePart", 48), ("seaEssence", 163), (legendary_b, 161)]),
        ),
    ])
}

fn build_standard_catalog() -> ShipCatalog {
    let mut resources: Vec<ResourceDefinition> = COMMON
        .iter()
        .map(|(key, name, grade, seal, pirate)| ResourceDefinition {
            key: key.to_string(),
            name: name.to_string(),
            grade: *grade,
            prices: prices(*seal, *pirate, 0),
            origin: ResourceOrigin::Common,
        })
        .collect();

    let mut ships = Vec::with_capacity(SHIP_SPECIFIC.len());
    for (ship, slots) in SHIP_SPECIFIC {
        for (index, (key, name)) in slots.iter().enumerate() {
            let (grade, seal) = SPECIFIC_SLOTS[index];
            let ocean = if index == 0 { 0 } else { SPECIFIC_OCEAN_COIN_PRICE };
            resources.push(ResourceDefinition {
                key: key.to_string(),
                name: name.to_string(),
                grade,
                prices: prices(seal, 0, ocean),
                origin: ResourceOrigin::ShipSpecific(ship.to_string()),
            });
        }
        ships.push(ShipEntity {
            name: ship.to_string(),
            max_level: MAX_SHIP_LEVEL,
            upgrades: upgrade_table(slots.map(|(key, _)| key)),
        });
    }

    ShipCatalog::new(ships, resources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_has_eight_ships() {
        let catalog = ShipCatalog::standard();
        assert_eq!(catalog.ships().len(), 8);
        assert!(catalog.ship(DEFAULT_SELECTED_SHIP).is_some());
        assert_eq!(catalog.max_level(), MAX_SHIP_LEVEL);
    }

    #[test]
    fn base_level_has_no_cost() {
        let estoc = ShipCatalog::standard().ship("Estoc").unwrap();
        assert!(estoc.cost_for(BASE_LEVEL).is_none());
        assert_eq!(estoc.cost_for(2).unwrap()["basicPart"], 25);
        assert_eq!(estoc.cost_for(11).unwrap()["eagleWheelFragment"], 161);
    }

    #[test]
    fn every_cost_key_has_a_definition() {
        let catalog = ShipCatalog::standard();
        for ship in catalog.ships() {
            for cost in ship.upgrades.values() {
                for key in cost.keys() {
                    assert!(catalog.resource(key).is_some(), "{key} has no definition");
                }
            }
        }
    }

    #[test]
    fn specific_keys_belong_to_exactly_one_ship() {
        let catalog = ShipCatalog::standard();
        let total: usize = catalog
            .ships()
            .iter()
            .map(|s| catalog.ship_resources(&s.name).count())
            .sum();
        assert_eq!(total, 8 * 5);
        assert_eq!(catalog.common_resources().count(), 7);
    }

    #[test]
    fn common_timber_prices() {
        let wood = ShipCatalog::standard().resource("basicWood").unwrap();
        assert!(wood.is_common());
        assert_eq!(wood.price(Currency::PirateCoin), 250);
        assert_eq!(wood.price(Currency::AdventureSeal), 40);
        assert_eq!(wood.price(Currency::OceanCoin), 0);
    }

    #[test]
    fn blueprints_are_not_sold_for_ocean_coins() {
        let catalog = ShipCatalog::standard();
        let blueprint = catalog.resource("tragonBlueprint").unwrap();
        assert_eq!(blueprint.price(Currency::OceanCoin), 0);
        assert_eq!(catalog.resource("boldaikWood").unwrap().price(Currency::OceanCoin), 25);
        assert!(!catalog.is_common("tragonBlueprint"));
        assert!(!catalog.is_common("unknownKey"));
    }
}
