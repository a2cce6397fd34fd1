//! Case-opening domain types.
//!
//! Defines rarity tiers, the immutable case catalog, entitlement passes, realized outcomes and
//! the constants used by the execution layer and the server.

mod catalog;
mod constants;
mod opening;
mod passes;
mod rarity;

pub use catalog::*;
pub use constants::*;
pub use opening::*;
pub use passes::*;
pub use rarity::*;
