//! Published emission factors and the pure activity-to-CO2e conversions.
//!
//! All functions here are total: an unknown region or fuel kind falls back
//! to the documented default factor instead of failing. Input validation
//! (negative or non-finite quantities) happens in the footprint aggregator,
//! before any of these run.

use crate::units::{KgCo2e, TonnesCo2e};

/// Grid electricity factors, kg CO2e per kWh consumed.
const GRID_FACTORS: &[(&str, f64)] = &[
    ("UK", 0.21233),
    ("EU", 0.23230),
    ("US", 0.38550),
    ("CN", 0.58100),
    ("IN", 0.71600),
    ("AU", 0.65600),
];

/// Used when a region is missing from the table; roughly the world average
/// grid intensity in kg CO2e per kWh.
pub const DEFAULT_GRID_FACTOR: f64 = 0.43600;

/// Fuel combustion factors, kg CO2e per unit burned. Units are the ones the
/// activity data is reported in: kWh for gas, litres for liquid fuels, kg
/// for coal.
const FUEL_FACTORS: &[(&str, f64)] = &[
    ("natural-gas", 0.18254), // per kWh
    ("diesel", 2.68787),      // per litre
    ("petrol", 2.31495),      // per litre
    ("lpg", 1.55537),         // per litre
    ("heating-oil", 2.96240), // per litre
    ("coal", 2.40384),        // per kg
];

/// Used when a fuel kind is missing from the table, kg CO2e per unit.
pub const DEFAULT_FUEL_FACTOR: f64 = 2.00000;

/// Per-employee commuting emissions, tonnes CO2e per reporting year.
pub const COMMUTING_TONNES_PER_EMPLOYEE: f64 = 0.85;

/// Per-employee operational waste emissions, tonnes CO2e per reporting year.
pub const WASTE_TONNES_PER_EMPLOYEE: f64 = 0.15;

/// Purchased goods and services estimate, kg CO2e per unit of revenue.
pub const PURCHASED_GOODS_KG_PER_REVENUE: f64 = 0.32;

/// Convert grid electricity consumption to CO2e for the given region.
pub fn electricity_to_co2e(kwh: f64, region: &str) -> KgCo2e {
    let factor = lookup(GRID_FACTORS, region).unwrap_or(DEFAULT_GRID_FACTOR);
    KgCo2e(kwh * factor)
}

/// Convert fuel combustion to CO2e for the given fuel kind.
pub fn fuel_to_co2e(fuel_kind: &str, amount: f64) -> KgCo2e {
    let factor = lookup(FUEL_FACTORS, fuel_kind).unwrap_or(DEFAULT_FUEL_FACTOR);
    KgCo2e(amount * factor)
}

/// Simplified Scope 3 estimate: per-employee commuting and waste heuristics,
/// a revenue-proportional purchased-goods term, and direct business travel.
/// All terms are additive and non-negative for non-negative inputs.
pub fn scope3_simplified(
    employees: u32,
    revenue: f64,
    business_travel: TonnesCo2e,
) -> TonnesCo2e {
    let commuting = f64::from(employees) * COMMUTING_TONNES_PER_EMPLOYEE;
    let waste = f64::from(employees) * WASTE_TONNES_PER_EMPLOYEE;
    let purchased_goods = KgCo2e(revenue * PURCHASED_GOODS_KG_PER_REVENUE).to_tonnes();
    TonnesCo2e(commuting + waste) + purchased_goods + business_travel
}

fn lookup(table: &[(&str, f64)], key: &str) -> Option<f64> {
    let key = key.trim();
    table
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, factor)| *factor)
}
