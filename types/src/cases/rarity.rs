use serde::{Deserialize, Serialize};

/// Rarity tier of a case item.
///
/// Declaration order is the canonical order used when building weighted pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl Rarity {
    pub const ALL: [Rarity; 6] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
        Rarity::Mythic,
    ];

    /// Relative chance of the tier before re-normalization over the tiers a case contains.
    pub fn base_weight(self) -> f64 {
        match self {
            Rarity::Common => 55.0,
            Rarity::Uncommon => 25.0,
            Rarity::Rare => 12.0,
            Rarity::Epic => 5.0,
            Rarity::Legendary => 2.5,
            Rarity::Mythic => 0.5,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Legendary => "Legendary",
            Rarity::Mythic => "Mythic",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Rarity::Common => "#b0b3b8",
            Rarity::Uncommon => "#4caf50",
            Rarity::Rare => "#2196f3",
            Rarity::Epic => "#9c27b0",
            Rarity::Legendary => "#ff9800",
            Rarity::Mythic => "#f44336",
        }
    }

    /// Drops of the two highest tiers are announced in global chat.
    pub fn is_broadcast(self) -> bool {
        matches!(self, Rarity::Legendary | Rarity::Mythic)
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
