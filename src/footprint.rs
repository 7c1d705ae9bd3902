//! Footprint aggregation: raw activity inputs to a validated Footprint.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::factors;
use crate::models::{Footprint, FootprintStatus};
use crate::units::TonnesCo2e;

/// Reporting-entity details that feed the Scope 3 heuristics.
#[derive(Debug, Clone)]
pub struct CompanyInfo {
    pub reporting_period: String,
    pub employees: u32,
    pub annual_revenue: f64,
}

/// One fuel-combustion entry (direct emissions).
#[derive(Debug, Clone)]
pub struct FuelUse {
    pub kind: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Scope1Inputs {
    pub fuels: Vec<FuelUse>,
}

/// One metered electricity entry (purchased-energy emissions).
#[derive(Debug, Clone)]
pub struct ElectricityUse {
    pub kwh: f64,
    pub region: String,
}

#[derive(Debug, Clone, Default)]
pub struct Scope2Inputs {
    pub meters: Vec<ElectricityUse>,
}

#[derive(Debug, Clone, Default)]
pub struct Scope3Inputs {
    pub business_travel: TonnesCo2e,
}

/// Run the emission factor calculators over the scope inputs and produce a
/// draft footprint. Fails fast on any negative or non-finite quantity; no
/// state is touched before validation passes.
pub fn build_footprint(
    company: &CompanyInfo,
    scope1: &Scope1Inputs,
    scope2: &Scope2Inputs,
    scope3: &Scope3Inputs,
) -> Result<Footprint> {
    validate_inputs(company, scope1, scope2, scope3)?;

    let scope1_total = scope1
        .fuels
        .iter()
        .map(|fuel| factors::fuel_to_co2e(&fuel.kind, fuel.amount).to_tonnes())
        .sum();

    let scope2_total = scope2
        .meters
        .iter()
        .map(|meter| factors::electricity_to_co2e(meter.kwh, &meter.region).to_tonnes())
        .sum();

    let scope3_total = factors::scope3_simplified(
        company.employees,
        company.annual_revenue,
        scope3.business_travel,
    );

    Ok(footprint_from_scopes(
        &company.reporting_period,
        scope1_total,
        scope2_total,
        scope3_total,
    ))
}

/// Assemble a draft footprint from already-computed scope totals. The total
/// is always the sum of the scopes.
pub fn footprint_from_scopes(
    reporting_period: &str,
    scope1: TonnesCo2e,
    scope2: TonnesCo2e,
    scope3: TonnesCo2e,
) -> Footprint {
    Footprint {
        id: Uuid::new_v4().to_string(),
        reporting_period: reporting_period.to_string(),
        scope1,
        scope2,
        scope3,
        total: scope1 + scope2 + scope3,
        status: FootprintStatus::Draft,
        created_at: Utc::now(),
    }
}

fn validate_inputs(
    company: &CompanyInfo,
    scope1: &Scope1Inputs,
    scope2: &Scope2Inputs,
    scope3: &Scope3Inputs,
) -> Result<()> {
    check_quantity("annual revenue", company.annual_revenue)?;
    for fuel in &scope1.fuels {
        check_quantity(&format!("fuel amount for '{}'", fuel.kind), fuel.amount)?;
    }
    for meter in &scope2.meters {
        check_quantity(&format!("electricity kWh for '{}'", meter.region), meter.kwh)?;
    }
    check_quantity("business travel tonnes", scope3.business_travel.value())?;
    Ok(())
}

fn check_quantity(what: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(EngineError::Validation(format!("{what} is not finite")));
    }
    if value < 0.0 {
        return Err(EngineError::Validation(format!(
            "{what} is negative ({value})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company() -> CompanyInfo {
        CompanyInfo {
            reporting_period: "2025".to_string(),
            employees: 40,
            annual_revenue: 2_500_000.0,
        }
    }

    #[test]
    fn total_is_sum_of_scopes() {
        let footprint = footprint_from_scopes(
            "2025",
            TonnesCo2e(125.5),
            TonnesCo2e(340.2),
            TonnesCo2e(892.1),
        );
        assert!((footprint.total.value() - 1357.8).abs() < 1e-6);
        assert!(footprint.identity_holds());
        assert_eq!(footprint.status, FootprintStatus::Draft);
    }

    #[test]
    fn builds_from_activity_inputs() {
        let scope1 = Scope1Inputs {
            fuels: vec![FuelUse {
                kind: "natural-gas".to_string(),
                amount: 50_000.0,
            }],
        };
        let scope2 = Scope2Inputs {
            meters: vec![ElectricityUse {
                kwh: 120_000.0,
                region: "UK".to_string(),
            }],
        };
        let scope3 = Scope3Inputs {
            business_travel: TonnesCo2e(12.5),
        };

        let footprint = build_footprint(&company(), &scope1, &scope2, &scope3).unwrap();
        assert!(footprint.identity_holds());
        assert!((footprint.scope1.value() - 50_000.0 * 0.18254 / 1000.0).abs() < 1e-9);
        assert!((footprint.scope2.value() - 120_000.0 * 0.21233 / 1000.0).abs() < 1e-9);
        assert!(footprint.scope3.value() > 12.5);
    }

    #[test]
    fn empty_inputs_still_build() {
        let footprint = build_footprint(
            &CompanyInfo {
                reporting_period: "2025".to_string(),
                employees: 0,
                annual_revenue: 0.0,
            },
            &Scope1Inputs::default(),
            &Scope2Inputs::default(),
            &Scope3Inputs::default(),
        )
        .unwrap();
        assert_eq!(footprint.total.value(), 0.0);
    }

    #[test]
    fn negative_fuel_amount_is_rejected() {
        let scope1 = Scope1Inputs {
            fuels: vec![FuelUse {
                kind: "diesel".to_string(),
                amount: -10.0,
            }],
        };
        let err = build_footprint(
            &company(),
            &scope1,
            &Scope2Inputs::default(),
            &Scope3Inputs::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn nan_electricity_is_rejected() {
        let scope2 = Scope2Inputs {
            meters: vec![ElectricityUse {
                kwh: f64::NAN,
                region: "UK".to_string(),
            }],
        };
        let err = build_footprint(
            &company(),
            &Scope1Inputs::default(),
            &scope2,
            &Scope3Inputs::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
