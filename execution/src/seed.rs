//! Per-request master seed.
//!
//! The only non-deterministic input of an opening. Mixes OS randomness with the caller, the
//! case, the wall clock and a random nonce, so two requests never share a seed even when every
//! visible input matches.

use commonware_cryptography::sha256::Sha256;
use commonware_cryptography::Hasher;
use rand::{rngs::OsRng, Rng, RngCore};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

const ENTROPY_LEN: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MasterSeed(String);

impl MasterSeed {
    pub fn generate(user_id: &str, case_id: &str) -> Self {
        let mut entropy = [0u8; ENTROPY_LEN];
        OsRng.fill_bytes(&mut entropy);
        let nonce: u32 = OsRng.gen();
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        Self::derive(&entropy, user_id, case_id, timestamp_ms, nonce)
    }

    fn derive(
        entropy: &[u8; ENTROPY_LEN],
        user_id: &str,
        case_id: &str,
        timestamp_ms: u64,
        nonce: u32,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"lootcase/seed/v1");
        hasher.update(entropy);
        // Length prefixes keep ("ab", "c") and ("a", "bc") apart.
        hasher.update(&(user_id.len() as u64).to_be_bytes());
        hasher.update(user_id.as_bytes());
        hasher.update(&(case_id.len() as u64).to_be_bytes());
        hasher.update(case_id.as_bytes());
        hasher.update(&timestamp_ms.to_be_bytes());
        hasher.update(&nonce.to_be_bytes());
        Self(commonware_utils::hex(&hasher.finalize().0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for MasterSeed {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for MasterSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_seed_is_hex_digest() {
        let seed = MasterSeed::generate("user-1", "starter_box");
        assert_eq!(seed.as_str().len(), 64);
        assert!(seed.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_seeds_are_unique() {
        let seeds: HashSet<_> = (0..256)
            .map(|_| MasterSeed::generate("user-1", "starter_box"))
            .collect();
        assert_eq!(seeds.len(), 256);
    }

    #[test]
    fn test_derivation_separates_fields() {
        let entropy = [7u8; ENTROPY_LEN];
        let a = MasterSeed::derive(&entropy, "ab", "c", 1, 1);
        let b = MasterSeed::derive(&entropy, "a", "bc", 1, 1);
        assert_ne!(a, b);
        assert_eq!(a, MasterSeed::derive(&entropy, "ab", "c", 1, 1));
        assert_ne!(a, MasterSeed::derive(&entropy, "ab", "c", 1, 2));
    }
}
