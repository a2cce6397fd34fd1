//! Replayable pseudo-random stream derived from a string seed.
//!
//! The generator is `frac(sin(x) * 10000)` over a 32-bit polynomial hash of the seed. It is
//! not cryptographically secure: unpredictability comes only from the master seed, which the
//! server commits to before anything is rolled. The exact arithmetic must not change, since
//! clients replay reels from previously issued seeds.

use std::fmt::Display;

/// 32-bit polynomial hash of the seed's UTF-16 code units (`acc = acc * 31 + unit`).
pub fn hash_seed(seed: &str) -> i32 {
    seed.encode_utf16()
        .fold(0i32, |acc, unit| acc.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

fn sine_fraction(x: f64) -> f64 {
    let value = x.abs().sin() * 10_000.0;
    let fraction = value - value.floor();
    // Guards the rounding edge where a tiny negative value yields exactly 1.0.
    if fraction >= 1.0 {
        0.0
    } else {
        fraction
    }
}

/// Single-shot draw in `[0, 1)` for a seed. Callers derive a unique seed per use.
pub fn seeded_random(seed: impl Display) -> f64 {
    sine_fraction(f64::from(hash_seed(&seed.to_string())))
}

/// Reusable generator; the n-th call (starting at 1) draws from `hash + n`.
#[derive(Clone, Debug)]
pub struct SeededRng {
    base: f64,
    counter: u64,
}

impl SeededRng {
    pub fn new(seed: impl Display) -> Self {
        Self {
            base: f64::from(hash_seed(&seed.to_string())),
            counter: 0,
        }
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.counter += 1;
        sine_fraction(self.base + self.counter as f64)
    }

    /// Number of values drawn so far.
    pub fn draws(&self) -> u64 {
        self.counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_matches_java_string_hash() {
        assert_eq!(hash_seed(""), 0);
        assert_eq!(hash_seed("a"), 97);
        assert_eq!(hash_seed("hello"), 99_162_322);
        // Wraps to i32::MIN.
        assert_eq!(hash_seed("polygenelubricants"), i32::MIN);
    }

    #[test]
    fn test_hash_uses_utf16_units() {
        // U+1F381 is a surrogate pair: 0xD83C, 0xDF81.
        let expected = 0xD83Ci32.wrapping_mul(31).wrapping_add(0xDF81);
        assert_eq!(hash_seed("\u{1F381}"), expected);
    }

    #[test]
    fn test_known_values() {
        // Already-issued seeds replay against these exact values.
        assert_eq!(seeded_random("abc-slot0-item0"), 0.654100046504027);
        assert_eq!(seeded_random("polygenelubricants"), 0.8982420706070116);

        let mut rng = SeededRng::new("abc-slot0-item0");
        assert_eq!(rng.next_f64(), 0.9135546007237281);
        assert_eq!(rng.next_f64(), 0.5932133737412641);
    }

    #[test]
    fn test_stream_is_replayable() {
        let mut first = SeededRng::new("seed-slot0-item3");
        let mut second = SeededRng::new("seed-slot0-item3");
        let a: Vec<f64> = (0..64).map(|_| first.next_f64()).collect();
        let b: Vec<f64> = (0..64).map(|_| second.next_f64()).collect();
        assert_eq!(a, b);
        assert_eq!(first.draws(), 64);
    }

    #[test]
    fn test_values_in_unit_interval() {
        for seed in ["", "x", "polygenelubricants", "abc-slot3-index"] {
            let mut rng = SeededRng::new(seed);
            for _ in 0..1_000 {
                let value = rng.next_f64();
                assert!((0.0..1.0).contains(&value), "{seed}: {value}");
            }
            let single = seeded_random(seed);
            assert!((0.0..1.0).contains(&single));
        }
    }

    #[test]
    fn test_numeric_seed_matches_string_form() {
        assert_eq!(seeded_random(12345), seeded_random("12345"));
        let mut numeric = SeededRng::new(42u64);
        let mut text = SeededRng::new("42");
        assert_eq!(numeric.next_f64(), text.next_f64());
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = SeededRng::new("seed-slot0-item0");
        let mut b = SeededRng::new("seed-slot0-item1");
        assert_ne!(a.next_f64(), b.next_f64());
        assert_ne!(seeded_random("seed-slot0-index"), seeded_random("seed-slot1-index"));
    }
}
