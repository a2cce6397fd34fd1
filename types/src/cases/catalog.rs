use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error as ThisError;

use super::Rarity;

#[derive(Debug, ThisError, PartialEq)]
pub enum CatalogError {
    #[error("case id must not be empty")]
    EmptyId,
    #[error("duplicate case id: {0}")]
    DuplicateId(String),
    #[error("case {0} has no items")]
    EmptyCase(String),
    #[error("case {case} has invalid price {price}")]
    InvalidPrice { case: String, price: f64 },
    #[error("item {item} in case {case} has invalid range [{min}, {max}]")]
    InvalidRange {
        case: String,
        item: String,
        min: f64,
        max: f64,
    },
}

/// An item that can drop from exactly one case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseItem {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub min_value: f64,
    pub max_value: f64,
    pub rarity: Rarity,
}

impl CaseItem {
    pub fn new(name: &str, icon: &str, min_value: f64, max_value: f64, rarity: Rarity) -> Self {
        Self {
            name: name.to_string(),
            icon: icon.to_string(),
            min_value,
            max_value,
            rarity,
        }
    }

    pub fn midpoint(&self) -> f64 {
        (self.min_value + self.max_value) / 2.0
    }
}

/// Static catalog entry for a purchasable case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseDefinition {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub items: Vec<CaseItem>,
}

impl CaseDefinition {
    fn validate(&self) -> Result<(), CatalogError> {
        if self.id.trim().is_empty() {
            return Err(CatalogError::EmptyId);
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(CatalogError::InvalidPrice {
                case: self.id.clone(),
                price: self.price,
            });
        }
        // Nothing could be delivered for the price.
        if self.items.is_empty() {
            return Err(CatalogError::EmptyCase(self.id.clone()));
        }
        for item in &self.items {
            let valid = item.min_value.is_finite()
                && item.max_value.is_finite()
                && item.min_value >= 0.0
                && item.min_value <= item.max_value;
            if !valid {
                return Err(CatalogError::InvalidRange {
                    case: self.id.clone(),
                    item: item.name.clone(),
                    min: item.min_value,
                    max: item.max_value,
                });
            }
        }
        Ok(())
    }
}

/// The immutable set of cases the server sells.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CaseDefinition>", into = "Vec<CaseDefinition>")]
pub struct Catalog {
    cases: Vec<CaseDefinition>,
}

impl Catalog {
    pub fn new(cases: Vec<CaseDefinition>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for case in &cases {
            case.validate()?;
            if !seen.insert(case.id.as_str()) {
                return Err(CatalogError::DuplicateId(case.id.clone()));
            }
        }
        Ok(Self { cases })
    }

    pub fn get(&self, id: &str) -> Option<&CaseDefinition> {
        self.cases.iter().find(|case| case.id == id)
    }

    pub fn cases(&self) -> &[CaseDefinition] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

impl TryFrom<Vec<CaseDefinition>> for Catalog {
    type Error = CatalogError;

    fn try_from(cases: Vec<CaseDefinition>) -> Result<Self, Self::Error> {
        Self::new(cases)
    }
}

impl From<Catalog> for Vec<CaseDefinition> {
    fn from(catalog: Catalog) -> Self {
        catalog.cases
    }
}

impl Default for Catalog {
    /// Built-in catalog used when no catalog file is configured.
    fn default() -> Self {
        use Rarity::*;

        let starter_box = CaseDefinition {
            id: "starter_box".to_string(),
            name: "Starter Box".to_string(),
            price: 5.0,
            items: vec![
                CaseItem::new("Rusty Coin", "coin_rusty", 0.5, 1.5, Common),
                CaseItem::new("Paper Crown", "crown_paper", 1.0, 2.5, Common),
                CaseItem::new("Pebble Charm", "charm_pebble", 1.0, 3.0, Common),
                CaseItem::new("Copper Ring", "ring_copper", 3.0, 6.0, Uncommon),
                CaseItem::new("Glass Orb", "orb_glass", 4.0, 8.0, Uncommon),
                CaseItem::new("Silver Compass", "compass_silver", 8.0, 15.0, Rare),
                CaseItem::new("Jade Idol", "idol_jade", 15.0, 30.0, Epic),
                CaseItem::new("Golden Chalice", "chalice_gold", 40.0, 75.0, Legendary),
            ],
        };

        let neon_box = CaseDefinition {
            id: "neon_box".to_string(),
            name: "Neon Box".to_string(),
            price: 25.0,
            items: vec![
                CaseItem::new("Glow Stick", "glow_stick", 3.0, 8.0, Common),
                CaseItem::new("Neon Visor", "visor_neon", 5.0, 12.0, Common),
                CaseItem::new("Synth Gloves", "gloves_synth", 12.0, 22.0, Uncommon),
                CaseItem::new("Pulse Blade", "blade_pulse", 20.0, 40.0, Rare),
                CaseItem::new("Holo Jacket", "jacket_holo", 35.0, 60.0, Rare),
                CaseItem::new("Plasma Core", "core_plasma", 60.0, 120.0, Epic),
                CaseItem::new("Chrome Wings", "wings_chrome", 150.0, 300.0, Legendary),
                CaseItem::new("Quantum Heart", "heart_quantum", 500.0, 1000.0, Mythic),
            ],
        };

        let mythic_vault = CaseDefinition {
            id: "mythic_vault".to_string(),
            name: "Mythic Vault".to_string(),
            price: 100.0,
            items: vec![
                CaseItem::new("Ancient Scroll", "scroll_ancient", 40.0, 80.0, Rare),
                CaseItem::new("Dragon Scale", "scale_dragon", 60.0, 110.0, Rare),
                CaseItem::new("Phoenix Feather", "feather_phoenix", 120.0, 200.0, Epic),
                CaseItem::new("Titan Gauntlet", "gauntlet_titan", 250.0, 500.0, Legendary),
                CaseItem::new("Void Crown", "crown_void", 1000.0, 2500.0, Mythic),
            ],
        };

        Self {
            cases: vec![starter_box, neon_box, mythic_vault],
        }
    }
}
