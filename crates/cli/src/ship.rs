//! Ship upgrade calculator commands. State is kept locally; nothing here
//! talks to the backend.

use anyhow::Result;
use tidemark_client::planner::PlannerStore;
use tidemark_core::calculator::{
    compute_required, used_resources, CurrencySelection, Quantities, SelectionState, UpgradePlan,
};
use tidemark_core::error::CoreError;
use tidemark_core::resources::{group_by_grade, Currency, ResourceDefinition};
use tidemark_core::ships::ShipCatalog;

use crate::{App, ShipCommand};

pub fn run(app: &App, command: ShipCommand) -> Result<()> {
    let planner = PlannerStore::new(app.store.clone(), ShipCatalog::standard());

    match command {
        ShipCommand::Select { ships } => {
            let (_, selected) = planner.update(|state, catalog| {
                ships
                    .iter()
                    .map(|ship| Ok((ship.clone(), state.toggle_ship(ship, catalog)?)))
                    .collect::<Result<Vec<_>, CoreError>>()
            })?;
            for (ship, on) in selected {
                println!("{ship}: {}", if on { "selected" } else { "not selected" });
            }
        }
        ShipCommand::Level { ship, level } => {
            planner.update(|state, catalog| state.set_current_level(&ship, level, catalog))?;
            println!("{ship} is at level {level}");
        }
        ShipCommand::Target { level } => {
            planner.update(|state, catalog| state.set_target_level(level, catalog))?;
            println!("Target level {level}");
        }
        ShipCommand::Own { resource, quantity } => {
            planner.update(|state, catalog| state.set_owned(&resource, quantity, catalog))?;
            println!("Own {quantity} x {resource}");
        }
        ShipCommand::Show {
            currency,
            prices,
            json,
        } => {
            let state = planner.load()?;
            let currencies = currency_selection(&state, planner.catalog(), currency, &prices)?;
            show(&state, planner.catalog(), &currencies, json)?;
        }
        ShipCommand::Reset => {
            planner.reset()?;
            println!("Calculator reset");
        }
    }
    Ok(())
}

/// Uniform currency for every needed resource first, then per-resource
/// overrides in the order given.
fn currency_selection(
    state: &SelectionState,
    catalog: &ShipCatalog,
    currency: Option<Currency>,
    prices: &[(String, Option<Currency>)],
) -> Result<CurrencySelection, CoreError> {
    let mut currencies = CurrencySelection::default();
    if currency.is_some() {
        let required = compute_required(state, catalog);
        currencies.select_all(currency, &used_resources(&required));
    }
    for (key, currency) in prices {
        if catalog.resource(key).is_none() {
            return Err(CoreError::Validation(format!("Unknown resource: {key}")));
        }
        currencies.assign(key, *currency);
    }
    Ok(currencies)
}

fn show(
    state: &SelectionState,
    catalog: &ShipCatalog,
    currencies: &CurrencySelection,
    json: bool,
) -> Result<()> {
    let plan = UpgradePlan::compute(state, catalog, currencies);

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("Target level {}", state.target_level);
    let selected: Vec<&str> = state.selected().collect();
    if selected.is_empty() {
        println!("No ships selected");
        return Ok(());
    }
    for ship in &selected {
        println!("  {ship}: level {} -> {}", state.current_level(ship), state.target_level);
    }

    let owned = state.pooled_owned();

    println!("\nCommon resources");
    for (grade, resources) in group_by_grade(catalog.common_resources()) {
        for resource in resources {
            print_row(
                resource,
                grade.label(),
                &plan.required.common,
                &owned,
                &plan.shortfall.common,
            );
        }
    }

    for ship in &selected {
        let rows: Vec<&ResourceDefinition> = catalog
            .ship_resources(ship)
            .filter(|r| plan.required.specific.get(&r.key).copied().unwrap_or(0) > 0)
            .collect();
        if rows.is_empty() {
            continue;
        }
        println!("\n{ship} resources");
        for resource in rows {
            print_row(
                resource,
                resource.grade.label(),
                &plan.required.specific,
                &owned,
                &plan.shortfall.specific,
            );
        }
    }

    if !plan.costs.is_empty() {
        println!("\nCost of missing resources");
        for (currency, amount) in &plan.costs {
            println!("  {:<16} {amount}", currency.label());
        }
    }

    println!();
    if plan.satisfiable {
        println!("Upgrade possible with owned resources");
    } else {
        println!("Not enough resources");
    }
    Ok(())
}

fn print_row(
    resource: &ResourceDefinition,
    grade: &str,
    required: &Quantities,
    owned: &Quantities,
    shortfall: &Quantities,
) {
    let needed = required.get(&resource.key).copied().unwrap_or(0);
    if needed == 0 {
        return;
    }
    println!(
        "  {:<28} {:<10} required {:>6}  owned {:>6}  missing {:>6}",
        resource.name,
        grade,
        needed,
        owned.get(&resource.key).copied().unwrap_or(0),
        shortfall.get(&resource.key).copied().unwrap_or(0),
    );
}
