//! Domain records for footprints, offset products and purchases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::units::TonnesCo2e;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FootprintStatus {
    Draft,
    Submitted,
    Verified,
}

impl FootprintStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FootprintStatus::Draft => "draft",
            FootprintStatus::Submitted => "submitted",
            FootprintStatus::Verified => "verified",
        }
    }

    pub fn parse(s: &str) -> Result<Self, EngineError> {
        match s {
            "draft" => Ok(FootprintStatus::Draft),
            "submitted" => Ok(FootprintStatus::Submitted),
            "verified" => Ok(FootprintStatus::Verified),
            other => Err(EngineError::Parse(format!(
                "unknown footprint status '{other}'"
            ))),
        }
    }
}

/// A GHG-Protocol-classified emissions snapshot for one reporting period.
///
/// Superseded, never edited in place: the ledger keeps every committed
/// footprint and treats the most recent as current.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Footprint {
    pub id: String,
    pub reporting_period: String,
    pub scope1: TonnesCo2e,
    pub scope2: TonnesCo2e,
    pub scope3: TonnesCo2e,
    pub total: TonnesCo2e,
    pub status: FootprintStatus,
    pub created_at: DateTime<Utc>,
}

impl Footprint {
    /// GHG Protocol identity: total equals the sum of the three scopes,
    /// within floating-point tolerance.
    pub fn identity_holds(&self) -> bool {
        let sum = self.scope1.value() + self.scope2.value() + self.scope3.value();
        (self.total.value() - sum).abs() < 1e-6
    }
}

/// How long an offset's CO2 storage is guaranteed. Ordered from shortest
/// to longest guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermanenceClass {
    Temporary,
    High,
    VeryHigh,
    UltraHigh,
    Millennial,
    Eternal,
}

impl PermanenceClass {
    pub fn as_str(self) -> &'static str {
        match self {
            PermanenceClass::Temporary => "temporary",
            PermanenceClass::High => "high",
            PermanenceClass::VeryHigh => "very-high",
            PermanenceClass::UltraHigh => "ultra-high",
            PermanenceClass::Millennial => "millennial",
            PermanenceClass::Eternal => "eternal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductCategory {
    Reuse,
    Sequestration,
    Renewable,
    Forestry,
    Removal,
    Social,
}

impl ProductCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductCategory::Reuse => "reuse",
            ProductCategory::Sequestration => "sequestration",
            ProductCategory::Renewable => "renewable",
            ProductCategory::Forestry => "forestry",
            ProductCategory::Removal => "removal",
            ProductCategory::Social => "social",
        }
    }
}

/// A purchasable offset credit. Immutable reference data for the session;
/// `available_units` is informational and not enforced at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffsetProduct {
    pub id: String,
    pub name: String,
    pub price_per_tonne: f64,
    pub co2_offset_per_unit: f64,
    pub permanence: PermanenceClass,
    pub available_units: u32,
    pub category: ProductCategory,
}

/// Ephemeral cart entry. Quantity 0 is equivalent to absence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseItem {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub co2_offset: TonnesCo2e,
}

/// A completed checkout. Append-only: never mutated or deleted once it is
/// in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub id: String,
    pub items: Vec<PurchaseItem>,
    pub total_co2_offset: TonnesCo2e,
    pub total_price: f64,
    pub purchased_at: DateTime<Utc>,
}

/// Derived balance projection. Never persisted; recomputed on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonBalance {
    pub gross_emissions: TonnesCo2e,
    pub offsets_applied: TonnesCo2e,
    pub net_emissions: TonnesCo2e,
    pub neutrality_percent: f64,
}

/// One weighted slice of an offset portfolio recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedCredit {
    pub product: OffsetProduct,
    pub percentage: f64,
}

/// A named offset portfolio for a required tonnage. Percentages sum to 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub name: String,
    pub credits: Vec<WeightedCredit>,
    pub total_cost: f64,
    pub average_price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for status in [
            FootprintStatus::Draft,
            FootprintStatus::Submitted,
            FootprintStatus::Verified,
        ] {
            assert_eq!(FootprintStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(FootprintStatus::parse("archived").is_err());
    }

    #[test]
    fn permanence_ordering() {
        assert!(PermanenceClass::Temporary < PermanenceClass::High);
        assert!(PermanenceClass::Millennial < PermanenceClass::Eternal);
    }

    #[test]
    fn footprint_identity_tolerance() {
        let footprint = Footprint {
            id: "fp-1".to_string(),
            reporting_period: "2025".to_string(),
            scope1: TonnesCo2e(125.5),
            scope2: TonnesCo2e(340.2),
            scope3: TonnesCo2e(892.1),
            total: TonnesCo2e(1357.8),
            status: FootprintStatus::Draft,
            created_at: Utc::now(),
        };
        assert!(footprint.identity_holds());

        let mut broken = footprint.clone();
        broken.total = TonnesCo2e(1400.0);
        assert!(!broken.identity_holds());
    }
}
