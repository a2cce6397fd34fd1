//! Shared lootcase types.
//!
//! Holds the static case catalog (rarity tiers, items, case definitions), the realized
//! outcomes of an opening (reels, slots, won items) and the JSON wire types exchanged with
//! the web client.

pub mod api;
pub mod cases;
mod money;

pub use api::{ActionRequest, ActionResponse, ErrorBody};
pub use cases::*;
pub use money::round2;
