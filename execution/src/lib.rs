//! Lootcase execution layer.
//!
//! This crate contains the deterministic reward generator (seeded PRG, rarity pool, item roll,
//! slot reels) and the transactional [`Layer`] that validates, charges, delivers and refunds
//! case openings against a [`Backend`].
//!
//! ## Determinism requirements
//! - Every reel is a pure function of `(case, master seed, slot index)`, so a client holding
//!   the returned seed can replay the animation exactly.
//! - Only the master seed uses OS randomness and wall-clock time; nothing below it does.
//!
//! ## Money invariants
//! A debit is always followed by either the delivery it paid for or exactly one compensating
//! credit of the same amount. The outcome of that credit is reported, never hidden.
//!
//! ## Minimal usage
//! ```rust,ignore
//! use lootcase_execution::{Layer, LayerConfig};
//! use lootcase_types::{ActionRequest, Catalog};
//!
//! # async fn example(backend: impl lootcase_execution::Backend, request: ActionRequest) {
//! let layer = Layer::new(backend, Catalog::default(), LayerConfig::default());
//! match layer.execute(request).await {
//!     Ok(response) => { /* serialize as JSON */ }
//!     Err(err) => { /* err.status(), err.body() */ }
//! }
//! # }
//! ```

pub mod backend;
pub mod pool;
pub mod pricing;
pub mod reel;
pub mod rng;
pub mod roll;
pub mod seed;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

mod layer;

pub use backend::{Backend, ChatMessage, DropRecord, InventoryRow, LedgerError, UserProfile};
pub use layer::{ActionError, Layer, LayerConfig, LayerCounters, LayerCountersSnapshot};
pub use pool::{build_pool, drop_rates, item_chances, PoolEntry};
pub use reel::{generate_slot, generate_slots, winner_index, ReelConfig, ReelConfigError};
pub use rng::{hash_seed, seeded_random, SeededRng};
pub use roll::{roll_from_pool, roll_item};
pub use seed::MasterSeed;
