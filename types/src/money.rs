/// Round a currency amount to 2 decimal places, half away from zero.
///
/// Every amount that is compared against a balance, debited, or shown to a client goes
/// through this function first so the displayed and the charged amount are identical.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round2(1.125), 1.13);
        assert_eq!(round2(-1.125), -1.13);
        assert_eq!(round2(2.5), 2.5);
        assert_eq!(round2(0.004), 0.0);
    }

    #[test]
    fn subtraction_is_stable_after_rounding() {
        let value = round2(12.345 + 3.001);
        let cost = round2(4.0 * 3.0 * 0.9);
        assert_eq!(value, 15.35);
        assert_eq!(cost, 10.8);
        assert_eq!(round2(value - cost), 4.55);
    }
}
