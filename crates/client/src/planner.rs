//! Persistence of the ship calculator state.
//!
//! Each part of [`SelectionState`] lives under its own store key, so an
//! unreadable entry only resets that part.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tidemark_core::calculator::SelectionState;
use tidemark_core::error::CoreError;
use tidemark_core::ships::ShipCatalog;

use crate::error::ClientError;
use crate::store::KeyValueStore;

pub const SELECTED_SHIPS_KEY: &str = "ship_calculator_selected_ships";
pub const CURRENT_LEVELS_KEY: &str = "ship_calculator_current_levels";
pub const TARGET_LEVEL_KEY: &str = "ship_calculator_target_level";
pub const COMMON_RESOURCES_KEY: &str = "ship_calculator_common_resources";
pub const SHIP_RESOURCES_KEY: &str = "ship_calculator_ship_resources";

const ALL_KEYS: [&str; 5] = [
    SELECTED_SHIPS_KEY,
    CURRENT_LEVELS_KEY,
    TARGET_LEVEL_KEY,
    COMMON_RESOURCES_KEY,
    SHIP_RESOURCES_KEY,
];

pub struct PlannerStore<'a, S> {
    store: S,
    catalog: &'a ShipCatalog,
}

impl<'a, S: KeyValueStore> PlannerStore<'a, S> {
    pub fn new(store: S, catalog: &'a ShipCatalog) -> Self {
        Self { store, catalog }
    }

    pub fn catalog(&self) -> &'a ShipCatalog {
        self.catalog
    }

    /// Load saved state merged over the defaults and reconciled with the
    /// catalog.
    pub fn load(&self) -> Result<SelectionState, ClientError> {
        let mut state = SelectionState::default_for(self.catalog);
        if let Some(selected) = self.read(SELECTED_SHIPS_KEY)? {
            state.selected_ships = selected;
        }
        if let Some(levels) = self.read(CURRENT_LEVELS_KEY)? {
            state.current_levels = levels;
        }
        if let Some(target) = self.read(TARGET_LEVEL_KEY)? {
            state.target_level = target;
        }
        if let Some(common) = self.read(COMMON_RESOURCES_KEY)? {
            state.owned_common = common;
        }
        if let Some(per_ship) = self.read(SHIP_RESOURCES_KEY)? {
            state.owned_per_ship = per_ship;
        }
        Ok(state.sanitized(self.catalog))
    }

    pub fn save(&self, state: &SelectionState) -> Result<(), ClientError> {
        self.write(SELECTED_SHIPS_KEY, &state.selected_ships)?;
        self.write(CURRENT_LEVELS_KEY, &state.current_levels)?;
        self.write(TARGET_LEVEL_KEY, &state.target_level)?;
        self.write(COMMON_RESOURCES_KEY, &state.owned_common)?;
        self.write(SHIP_RESOURCES_KEY, &state.owned_per_ship)?;
        Ok(())
    }

    /// Load, apply `mutate`, and save. Nothing is written if `mutate` fails.
    pub fn update<T, F>(&self, mutate: F) -> Result<(SelectionState, T), ClientError>
    where
        F: FnOnce(&mut SelectionState, &ShipCatalog) -> Result<T, CoreError>,
    {
        let mut state = self.load()?;
        let value = mutate(&mut state, self.catalog)?;
        self.save(&state)?;
        Ok((state, value))
    }

    /// Remove every saved part and return the defaults.
    pub fn reset(&self) -> Result<SelectionState, ClientError> {
        for key in ALL_KEYS {
            self.store.remove(key)?;
        }
        tracing::info!("Calculator state reset");
        Ok(SelectionState::default_for(self.catalog))
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ClientError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring unreadable calculator state");
                Ok(None)
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ClientError> {
        self.store.set(key, &serde_json::to_string(value)?)?;
        Ok(())
    }
}
