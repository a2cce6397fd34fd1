//! Per-slot reels.
//!
//! Every reel entry rolls from its own sub-seed (`{seed}-slot{n}-item{i}`) and the winner
//! position from `{seed}-slot{n}-index`, so slots are independent of each other and any slot
//! can be regenerated on its own. The winner is restricted to a central window so the client
//! animation always has neighbours to scroll past on both sides.

use lootcase_types::{
    CaseDefinition, Slot, REEL_LENGTH, WINNER_WINDOW_END, WINNER_WINDOW_START,
};
use std::ops::Range;
use thiserror::Error;

use crate::pool::build_pool;
use crate::rng::{seeded_random, SeededRng};
use crate::roll::roll_from_pool;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReelConfigError {
    #[error("winner window {start}..{end} is empty")]
    EmptyWindow { start: usize, end: usize },
    #[error("winner window end {end} exceeds reel length {length}")]
    WindowOutOfBounds { end: usize, length: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReelConfig {
    pub length: usize,
    pub winner_window: Range<usize>,
}

impl Default for ReelConfig {
    fn default() -> Self {
        Self {
            length: REEL_LENGTH,
            winner_window: WINNER_WINDOW_START..WINNER_WINDOW_END,
        }
    }
}

impl ReelConfig {
    pub fn new(length: usize, winner_window: Range<usize>) -> Result<Self, ReelConfigError> {
        if winner_window.start >= winner_window.end {
            return Err(ReelConfigError::EmptyWindow {
                start: winner_window.start,
                end: winner_window.end,
            });
        }
        if winner_window.end > length {
            return Err(ReelConfigError::WindowOutOfBounds {
                end: winner_window.end,
                length,
            });
        }
        Ok(Self {
            length,
            winner_window,
        })
    }
}

/// Winner position for a slot, uniformly scaled into the configured window.
pub fn winner_index(seed: &str, slot: usize, config: &ReelConfig) -> usize {
    let window = &config.winner_window;
    let span = window.end.saturating_sub(window.start).max(1);
    let draw = seeded_random(format!("{seed}-slot{slot}-index"));
    let offset = ((draw * span as f64).floor() as usize).min(span - 1);
    window.start + offset
}

/// Generate one slot. `None` when the case has no items.
pub fn generate_slot(
    case: &CaseDefinition,
    seed: &str,
    slot: usize,
    config: &ReelConfig,
) -> Option<Slot> {
    let pool = build_pool(case);
    let items = (0..config.length)
        .map(|i| {
            let mut rng = SeededRng::new(format!("{seed}-slot{slot}-item{i}"));
            roll_from_pool(case, &pool, &mut rng)
        })
        .collect::<Option<Vec<_>>>()?;

    let winner_index = winner_index(seed, slot, config);
    let winner = items.get(winner_index)?.clone();
    Some(Slot {
        items,
        winner_index,
        winner,
    })
}

/// Generate `quantity` slots in order from one master seed.
pub fn generate_slots(
    case: &CaseDefinition,
    seed: &str,
    quantity: u32,
    config: &ReelConfig,
) -> Option<Vec<Slot>> {
    (0..quantity as usize)
        .map(|slot| generate_slot(case, seed, slot, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lootcase_types::{Catalog, Rarity};

    fn starter() -> CaseDefinition {
        Catalog::default()
            .get("starter_box")
            .cloned()
            .expect("starter box")
    }

    #[test]
    fn test_config_validation() {
        assert!(ReelConfig::new(96, 20..76).is_ok());
        assert_eq!(
            ReelConfig::new(96, 50..50),
            Err(ReelConfigError::EmptyWindow { start: 50, end: 50 })
        );
        assert_eq!(
            ReelConfig::new(40, 20..76),
            Err(ReelConfigError::WindowOutOfBounds { end: 76, length: 40 })
        );
        assert_eq!(ReelConfig::default(), ReelConfig::new(96, 20..76).unwrap());
    }

    #[test]
    fn test_slots_have_configured_shape() {
        let config = ReelConfig::default();
        let slots = generate_slots(&starter(), "master", 4, &config).expect("slots");
        assert_eq!(slots.len(), 4);
        for slot in &slots {
            assert_eq!(slot.items.len(), 96);
            assert!(config.winner_window.contains(&slot.winner_index));
            assert_eq!(slot.items[slot.winner_index], slot.winner);
        }
    }

    #[test]
    fn test_known_slot() {
        let slot = generate_slot(&starter(), "abc", 0, &ReelConfig::default()).expect("slot");
        assert_eq!(slot.winner_index, 24);
        assert_eq!(slot.winner.name, "Rusty Coin");
        assert_eq!(slot.winner.rarity, Rarity::Common);
        assert_eq!(slot.winner.value, 0.75);

        let head: Vec<(&str, f64)> = slot.items[..3]
            .iter()
            .map(|item| (item.name.as_str(), item.value))
            .collect();
        assert_eq!(
            head,
            vec![("Silver Compass", 12.15), ("Copper Ring", 3.91), ("Paper Crown", 1.89)]
        );

        let next = generate_slot(&starter(), "abc", 1, &ReelConfig::default()).expect("slot");
        assert_eq!(next.winner_index, 25);
        assert_eq!(next.winner.name, "Copper Ring");
        assert_eq!(next.winner.value, 4.44);
    }

    #[test]
    fn test_winner_index_stays_in_window() {
        let config = ReelConfig::new(10, 3..4).unwrap();
        for n in 0..200 {
            assert_eq!(winner_index(&format!("s{n}"), 0, &config), 3);
        }
        let config = ReelConfig::default();
        for n in 0..2_000 {
            let index = winner_index(&format!("s{n}"), n % 4, &config);
            assert!(config.winner_window.contains(&index));
        }
    }

    #[test]
    fn test_replay_from_seed_is_identical() {
        let config = ReelConfig::default();
        let first = generate_slots(&starter(), "replay-seed", 3, &config);
        let second = generate_slots(&starter(), "replay-seed", 3, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn test_slot_independent_of_quantity() {
        let config = ReelConfig::default();
        let one = generate_slots(&starter(), "shared", 1, &config).expect("slots");
        let three = generate_slots(&starter(), "shared", 3, &config).expect("slots");
        assert_eq!(one[0], three[0]);
        assert_ne!(three[0].items, three[1].items);
    }

    #[test]
    fn test_empty_case_generates_nothing() {
        let case = CaseDefinition {
            id: "empty".to_string(),
            name: "Empty".to_string(),
            price: 1.0,
            items: Vec::new(),
        };
        assert!(generate_slot(&case, "seed", 0, &ReelConfig::default()).is_none());
        assert_eq!(
            generate_slots(&starter(), "seed", 0, &ReelConfig::default()),
            Some(Vec::new())
        );
    }
}
