use serde::{Deserialize, Serialize};

use super::Rarity;

/// A concrete item produced by one roll.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpenedItem {
    pub name: String,
    pub icon: String,
    pub rarity: Rarity,
    /// Sampled from the item's value range and rounded to 2 decimal places.
    pub value: f64,
}

/// One purchased unit: the reel the client animates and the prize it lands on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub items: Vec<OpenedItem>,
    pub winner_index: usize,
    pub winner: OpenedItem,
}
