//! Cost arithmetic and the multi-open entitlement gate.

use lootcase_types::cases::{pass_for_quantity, PassDefinition};
use lootcase_types::{round2, DISCOUNT_LEVEL_BASE_COST, MAX_DISCOUNT_LEVEL};

/// Multiplier applied to list price, `1 - min(level, 40) / 100`.
pub fn discount_factor(discount_level: u32) -> f64 {
    1.0 - f64::from(discount_level.min(MAX_DISCOUNT_LEVEL)) / 100.0
}

/// Total charge for an opening, rounded before it is compared or debited.
pub fn total_cost(price: f64, quantity: u32, discount_level: u32) -> f64 {
    round2(price * f64::from(quantity) * discount_factor(discount_level))
}

/// Pass the caller is missing for `quantity`, if any.
pub fn missing_pass(quantity: u32, unlocked: &[String]) -> Option<&'static PassDefinition> {
    let pass = pass_for_quantity(quantity)?;
    if unlocked.iter().any(|owned| owned == pass.id) {
        None
    } else {
        Some(pass)
    }
}

/// Price of the next discount level, or `None` at the cap.
pub fn discount_upgrade_cost(current_level: u32) -> Option<f64> {
    if current_level >= MAX_DISCOUNT_LEVEL {
        return None;
    }
    Some(round2(DISCOUNT_LEVEL_BASE_COST * f64::from(current_level + 1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_is_capped() {
        assert_eq!(discount_factor(0), 1.0);
        assert_eq!(discount_factor(40), 0.6);
        assert_eq!(discount_factor(95), 0.6);
    }

    #[test]
    fn test_total_cost_rounds_to_cents() {
        assert_eq!(total_cost(5.0, 1, 0), 5.0);
        assert_eq!(total_cost(5.0, 3, 10), 13.5);
        assert_eq!(total_cost(4.99, 3, 7), 13.92);
    }

    #[test]
    fn test_pass_gate() {
        assert!(missing_pass(1, &[]).is_none());
        assert_eq!(missing_pass(3, &[]).map(|pass| pass.id), Some("multi_3x"));
        let owned = vec!["multi_2x".to_string()];
        assert!(missing_pass(2, &owned).is_none());
        assert_eq!(missing_pass(4, &owned).map(|pass| pass.id), Some("multi_4x"));
    }

    #[test]
    fn test_discount_upgrade_cost() {
        assert_eq!(discount_upgrade_cost(0), Some(100.0));
        assert_eq!(discount_upgrade_cost(39), Some(4_000.0));
        assert_eq!(discount_upgrade_cost(40), None);
    }
}
