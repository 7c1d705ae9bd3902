//! Offset product catalog.
//!
//! Ships with a built-in reference catalog so the engine works without any
//! external data; an externally supplied JSON catalog can replace it. The
//! catalog is immutable for the lifetime of a session.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, Result};
use crate::models::{OffsetProduct, PermanenceClass, ProductCategory};

pub struct OffsetCatalog {
    products: Vec<OffsetProduct>,
}

impl OffsetCatalog {
    pub fn new(products: Vec<OffsetProduct>) -> Self {
        OffsetCatalog { products }
    }

    /// The built-in reference catalog. Prices are per tonne CO2e.
    pub fn builtin() -> Self {
        let products = vec![
            product(
                "verified-reuse",
                "Verified Reuse Credits",
                4.20,
                PermanenceClass::Temporary,
                40_000,
                ProductCategory::Reuse,
            ),
            product(
                "community-solar",
                "Community Solar Portfolio",
                7.50,
                PermanenceClass::High,
                50_000,
                ProductCategory::Renewable,
            ),
            product(
                "clean-cookstoves",
                "Clean Cookstove Distribution",
                9.80,
                PermanenceClass::Temporary,
                15_000,
                ProductCategory::Social,
            ),
            product(
                "woodland-restoration",
                "Woodland Restoration",
                15.00,
                PermanenceClass::VeryHigh,
                20_000,
                ProductCategory::Forestry,
            ),
            product(
                "soil-carbon",
                "Regenerative Soil Carbon",
                22.00,
                PermanenceClass::UltraHigh,
                8_000,
                ProductCategory::Sequestration,
            ),
            product(
                "biochar",
                "Biochar Sequestration",
                34.00,
                PermanenceClass::Millennial,
                3_000,
                ProductCategory::Sequestration,
            ),
            product(
                "direct-air-capture",
                "Direct Air Capture Storage",
                95.00,
                PermanenceClass::Eternal,
                500,
                ProductCategory::Removal,
            ),
            product(
                "mineral-weathering",
                "Enhanced Rock Weathering",
                145.00,
                PermanenceClass::Eternal,
                250,
                ProductCategory::Removal,
            ),
        ];
        OffsetCatalog { products }
    }

    /// Parse a catalog from a JSON array of products.
    pub fn from_json(json: &str) -> Result<Self> {
        let products: Vec<OffsetProduct> = serde_json::from_str(json)
            .map_err(|err| EngineError::Parse(format!("bad catalog JSON: {err}")))?;
        if products.is_empty() {
            return Err(EngineError::Parse("catalog is empty".to_string()));
        }
        Ok(OffsetCatalog { products })
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn products(&self) -> &[OffsetProduct] {
        &self.products
    }

    pub fn get(&self, id: &str) -> Option<&OffsetProduct> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Cheapest product in a category. Ties keep catalog order.
    pub fn cheapest_in_category(&self, category: ProductCategory) -> Option<&OffsetProduct> {
        cheapest(self.products.iter().filter(|p| p.category == category))
    }

    /// Cheapest product with at least the given permanence guarantee.
    pub fn cheapest_with_permanence(&self, min: PermanenceClass) -> Option<&OffsetProduct> {
        cheapest(self.products.iter().filter(|p| p.permanence >= min))
    }
}

/// First strictly-cheapest product, so equal prices resolve to catalog order.
fn cheapest<'a>(products: impl Iterator<Item = &'a OffsetProduct>) -> Option<&'a OffsetProduct> {
    products.fold(None, |best: Option<&OffsetProduct>, candidate| match best {
        Some(current) if current.price_per_tonne <= candidate.price_per_tonne => Some(current),
        _ => Some(candidate),
    })
}

fn product(
    id: &str,
    name: &str,
    price_per_tonne: f64,
    permanence: PermanenceClass,
    available_units: u32,
    category: ProductCategory,
) -> OffsetProduct {
    OffsetProduct {
        id: id.to_string(),
        name: name.to_string(),
        price_per_tonne,
        co2_offset_per_unit: 1.0,
        permanence,
        available_units,
        category,
    }
}
