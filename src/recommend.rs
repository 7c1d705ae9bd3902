//! Offset portfolio recommendations.
//!
//! Strategies are fixed weightings over catalog categories, presented in a
//! fixed order: the set shows options, it does not rank a single optimum.
//! Each strategy line resolves to the cheapest product of its category, so
//! the result is deterministic for a given catalog.

use chrono::Utc;
use uuid::Uuid;

use crate::catalog::OffsetCatalog;
use crate::error::{EngineError, Result};
use crate::models::{
    CartLine, PermanenceClass, ProductCategory, PurchaseItem, PurchaseRecord, Recommendation,
    WeightedCredit,
};
use crate::units::TonnesCo2e;

struct StrategyLine {
    category: ProductCategory,
    percentage: f64,
}

struct Strategy {
    name: &'static str,
    lines: &'static [StrategyLine],
}

const STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "Budget Mix",
        lines: &[
            StrategyLine {
                category: ProductCategory::Renewable,
                percentage: 60.0,
            },
            StrategyLine {
                category: ProductCategory::Forestry,
                percentage: 40.0,
            },
        ],
    },
    Strategy {
        name: "Balanced Blend",
        lines: &[
            StrategyLine {
                category: ProductCategory::Renewable,
                percentage: 40.0,
            },
            StrategyLine {
                category: ProductCategory::Forestry,
                percentage: 30.0,
            },
            StrategyLine {
                category: ProductCategory::Sequestration,
                percentage: 30.0,
            },
        ],
    },
    Strategy {
        name: "Premium Portfolio",
        lines: &[
            StrategyLine {
                category: ProductCategory::Renewable,
                percentage: 25.0,
            },
            StrategyLine {
                category: ProductCategory::Forestry,
                percentage: 25.0,
            },
            StrategyLine {
                category: ProductCategory::Sequestration,
                percentage: 20.0,
            },
            StrategyLine {
                category: ProductCategory::Removal,
                percentage: 30.0,
            },
        ],
    },
];

/// Eternal-class credits are scarce; the 100%-eternal option is only shown
/// for small volumes.
const ETERNAL_RESERVE_MAX_TONNES: f64 = 100.0;

/// Build the recommendation set for a required offset tonnage.
///
/// A strategy is only included when every category it weights exists in the
/// catalog. The everlasting option is appended for volumes below
/// `ETERNAL_RESERVE_MAX_TONNES` when an eternal-class product exists.
pub fn recommend(catalog: &OffsetCatalog, required: TonnesCo2e) -> Result<Vec<Recommendation>> {
    let tonnes = required.value();
    if !tonnes.is_finite() || tonnes <= 0.0 {
        return Err(EngineError::Validation(format!(
            "required offset tonnage must be positive, got {tonnes}"
        )));
    }

    let mut recommendations = Vec::new();
    for strategy in STRATEGIES {
        let mut credits = Vec::with_capacity(strategy.lines.len());
        for line in strategy.lines {
            match catalog.cheapest_in_category(line.category) {
                Some(product) => credits.push(WeightedCredit {
                    product: product.clone(),
                    percentage: line.percentage,
                }),
                None => {
                    log::debug!(
                        "skipping strategy '{}': no {} product in catalog",
                        strategy.name,
                        line.category.as_str()
                    );
                    credits.clear();
                    break;
                }
            }
        }
        if !credits.is_empty() {
            recommendations.push(price_portfolio(strategy.name, credits, tonnes));
        }
    }

    if tonnes < ETERNAL_RESERVE_MAX_TONNES {
        if let Some(product) = catalog.cheapest_with_permanence(PermanenceClass::Eternal) {
            let credits = vec![WeightedCredit {
                product: product.clone(),
                percentage: 100.0,
            }];
            recommendations.push(price_portfolio("Everlasting Reserve", credits, tonnes));
        }
    }

    Ok(recommendations)
}

fn price_portfolio(name: &str, credits: Vec<WeightedCredit>, tonnes: f64) -> Recommendation {
    let total_cost: f64 = credits
        .iter()
        .map(|credit| credit.product.price_per_tonne * tonnes * credit.percentage / 100.0)
        .sum();
    Recommendation {
        name: name.to_string(),
        credits,
        total_cost,
        average_price: total_cost / tonnes,
    }
}

/// Expand a chosen recommendation into concrete cart lines: enough whole
/// units of each product to cover its tonnage share.
pub fn expand(recommendation: &Recommendation, required: TonnesCo2e) -> Vec<CartLine> {
    recommendation
        .credits
        .iter()
        .filter_map(|credit| {
            let share = required.value() * credit.percentage / 100.0;
            let quantity = (share / credit.product.co2_offset_per_unit).ceil() as u32;
            (quantity > 0).then(|| CartLine {
                product_id: credit.product.id.clone(),
                quantity,
            })
        })
        .collect()
}

/// Price a cart against the catalog and produce the purchase record for the
/// ledger. Zero-quantity lines are treated as absent.
pub fn checkout(catalog: &OffsetCatalog, lines: &[CartLine]) -> Result<PurchaseRecord> {
    let mut items = Vec::new();
    for line in lines {
        if line.quantity == 0 {
            continue;
        }
        let product = catalog.get(&line.product_id).ok_or_else(|| {
            EngineError::Validation(format!("unknown offset product '{}'", line.product_id))
        })?;
        if line.quantity > product.available_units {
            log::warn!(
                "cart requests {} units of '{}' but only {} are advertised",
                line.quantity,
                product.id,
                product.available_units
            );
        }
        let unit_price = product.price_per_tonne * product.co2_offset_per_unit;
        items.push(PurchaseItem {
            product_id: product.id.clone(),
            quantity: line.quantity,
            unit_price,
            co2_offset: TonnesCo2e(f64::from(line.quantity) * product.co2_offset_per_unit),
        });
    }

    if items.is_empty() {
        return Err(EngineError::Validation(
            "cart has no offsets to purchase".to_string(),
        ));
    }

    let total_co2_offset = items.iter().map(|item| item.co2_offset).sum();
    let total_price = items
        .iter()
        .map(|item| item.unit_price * f64::from(item.quantity))
        .sum();
    Ok(PurchaseRecord {
        id: Uuid::new_v4().to_string(),
        items,
        total_co2_offset,
        total_price,
        purchased_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OffsetProduct;

    fn by_name<'a>(recs: &'a [Recommendation], name: &str) -> &'a Recommendation {
        recs.iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn budget_mix_pricing() {
        // 10 t over renewable at 7.50 (60%) and forestry at 15 (40%):
        // 10*7.50*0.6 + 10*15*0.4 = 45 + 60 = 105.
        let catalog = OffsetCatalog::builtin();
        let recs = recommend(&catalog, TonnesCo2e(10.0)).unwrap();
        let budget = by_name(&recs, "Budget Mix");
        assert!((budget.total_cost - 105.0).abs() < 1e-9);
        assert!((budget.average_price - 10.5).abs() < 1e-9);
    }

    #[test]
    fn percentages_sum_to_hundred() {
        let catalog = OffsetCatalog::builtin();
        for rec in recommend(&catalog, TonnesCo2e(25.0)).unwrap() {
            let sum: f64 = rec.credits.iter().map(|c| c.percentage).sum();
            assert!((sum - 100.0).abs() < 1e-9, "{} sums to {sum}", rec.name);
        }
    }

    #[test]
    fn total_cost_matches_credit_sum() {
        let catalog = OffsetCatalog::builtin();
        let tonnes = 42.0;
        for rec in recommend(&catalog, TonnesCo2e(tonnes)).unwrap() {
            let expected: f64 = rec
                .credits
                .iter()
                .map(|c| c.product.price_per_tonne * tonnes * c.percentage / 100.0)
                .sum();
            assert!((rec.total_cost - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn presentation_order_is_fixed() {
        let catalog = OffsetCatalog::builtin();
        let names: Vec<String> = recommend(&catalog, TonnesCo2e(10.0))
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "Budget Mix",
                "Balanced Blend",
                "Premium Portfolio",
                "Everlasting Reserve"
            ]
        );
    }

    #[test]
    fn eternal_reserve_gated_by_volume() {
        let catalog = OffsetCatalog::builtin();
        let small = recommend(&catalog, TonnesCo2e(50.0)).unwrap();
        assert!(small.iter().any(|r| r.name == "Everlasting Reserve"));

        let large = recommend(&catalog, TonnesCo2e(500.0)).unwrap();
        assert!(!large.iter().any(|r| r.name == "Everlasting Reserve"));
    }

    #[test]
    fn non_positive_tonnage_rejected() {
        let catalog = OffsetCatalog::builtin();
        assert!(recommend(&catalog, TonnesCo2e(0.0)).is_err());
        assert!(recommend(&catalog, TonnesCo2e(-3.0)).is_err());
        assert!(recommend(&catalog, TonnesCo2e(f64::NAN)).is_err());
    }

    #[test]
    fn expand_rounds_units_up() {
        let catalog = OffsetCatalog::builtin();
        let recs = recommend(&catalog, TonnesCo2e(10.0)).unwrap();
        let lines = expand(by_name(&recs, "Budget Mix"), TonnesCo2e(10.0));
        assert_eq!(
            lines,
            vec![
                CartLine {
                    product_id: "community-solar".to_string(),
                    quantity: 6,
                },
                CartLine {
                    product_id: "woodland-restoration".to_string(),
                    quantity: 4,
                },
            ]
        );

        // Fractional shares round up to whole units.
        let lines = expand(by_name(&recs, "Budget Mix"), TonnesCo2e(1.0));
        assert!(lines.iter().all(|line| line.quantity == 1));
    }

    #[test]
    fn expand_respects_product_unit_size() {
        let catalog = OffsetCatalog::new(vec![OffsetProduct {
            id: "half-tonne".to_string(),
            name: "Half-tonne Credits".to_string(),
            price_per_tonne: 10.0,
            co2_offset_per_unit: 0.5,
            permanence: PermanenceClass::Eternal,
            available_units: 1_000,
            category: ProductCategory::Removal,
        }]);
        let recs = recommend(&catalog, TonnesCo2e(10.0)).unwrap();
        let reserve = by_name(&recs, "Everlasting Reserve");
        let lines = expand(reserve, TonnesCo2e(10.0));
        assert_eq!(lines[0].quantity, 20);
    }

    #[test]
    fn checkout_prices_the_cart() {
        let catalog = OffsetCatalog::builtin();
        let lines = vec![
            CartLine {
                product_id: "community-solar".to_string(),
                quantity: 6,
            },
            CartLine {
                product_id: "woodland-restoration".to_string(),
                quantity: 4,
            },
        ];
        let record = checkout(&catalog, &lines).unwrap();
        assert!((record.total_price - 105.0).abs() < 1e-9);
        assert!((record.total_co2_offset.value() - 10.0).abs() < 1e-9);
        assert_eq!(record.items.len(), 2);
    }

    #[test]
    fn checkout_skips_zero_quantity_lines() {
        let catalog = OffsetCatalog::builtin();
        let lines = vec![
            CartLine {
                product_id: "biochar".to_string(),
                quantity: 3,
            },
            CartLine {
                product_id: "community-solar".to_string(),
                quantity: 0,
            },
        ];
        let record = checkout(&catalog, &lines).unwrap();
        assert_eq!(record.items.len(), 1);
        assert_eq!(record.items[0].product_id, "biochar");
    }

    #[test]
    fn checkout_rejects_unknown_product_and_empty_cart() {
        let catalog = OffsetCatalog::builtin();
        let unknown = vec![CartLine {
            product_id: "perpetual-motion".to_string(),
            quantity: 1,
        }];
        assert!(matches!(
            checkout(&catalog, &unknown).unwrap_err(),
            EngineError::Validation(_)
        ));

        let empty = vec![CartLine {
            product_id: "biochar".to_string(),
            quantity: 0,
        }];
        assert!(matches!(
            checkout(&catalog, &empty).unwrap_err(),
            EngineError::Validation(_)
        ));
    }
}
