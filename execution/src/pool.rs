//! Rarity-weighted drop pool for a case.
//!
//! Only the tiers a case actually contains share the 100% probability mass, each in proportion
//! to its base weight; a tier's share is split evenly between its items. A case without a
//! Mythic item therefore redistributes the Mythic mass instead of leaving dead space.

use lootcase_types::api::DropRate;
use lootcase_types::{round2, CaseDefinition, Rarity};

/// One weighted entry of a pool. `cumulative` is a percentage in `(0, 100]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoolEntry {
    /// Index into `CaseDefinition::items`.
    pub item_index: usize,
    pub rarity: Rarity,
    pub cumulative: f64,
}

/// Per-item percentage share, indexed like `CaseDefinition::items`.
pub fn item_chances(case: &CaseDefinition) -> Vec<f64> {
    let mut counts = [0usize; Rarity::ALL.len()];
    for item in &case.items {
        counts[item.rarity.index()] += 1;
    }
    let total_base: f64 = Rarity::ALL
        .iter()
        .filter(|rarity| counts[rarity.index()] > 0)
        .map(|rarity| rarity.base_weight())
        .sum();
    if total_base <= 0.0 {
        return vec![0.0; case.items.len()];
    }

    case.items
        .iter()
        .map(|item| {
            let tier_share = item.rarity.base_weight() / total_base * 100.0;
            tier_share / counts[item.rarity.index()] as f64
        })
        .collect()
}

/// Build the cumulative pool, walking tiers in canonical order. Empty for an empty case.
pub fn build_pool(case: &CaseDefinition) -> Vec<PoolEntry> {
    let chances = item_chances(case);
    let mut pool = Vec::with_capacity(case.items.len());
    let mut cumulative = 0.0;
    for rarity in Rarity::ALL {
        for (item_index, item) in case.items.iter().enumerate() {
            if item.rarity != rarity {
                continue;
            }
            cumulative += chances[item_index];
            pool.push(PoolEntry {
                item_index,
                rarity,
                cumulative,
            });
        }
    }

    // Absorb float drift so the final bucket always closes the range.
    if let Some(last) = pool.last_mut() {
        last.cumulative = 100.0;
    }
    pool
}

/// Display rows for every item in case order, chances rounded to 2 dp.
pub fn drop_rates(case: &CaseDefinition) -> Vec<DropRate> {
    case.items
        .iter()
        .zip(item_chances(case))
        .map(|(item, chance)| DropRate {
            name: item.name.clone(),
            icon: item.icon.clone(),
            rarity: item.rarity,
            color: item.rarity.color().to_string(),
            min_value: item.min_value,
            max_value: item.max_value,
            chance: round2(chance),
        })
        .collect()
}
