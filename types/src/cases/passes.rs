/// A purchasable entitlement unlocking multi-case openings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassDefinition {
    pub id: &'static str,
    pub name: &'static str,
    /// Quantity this pass unlocks.
    pub quantity: u32,
    pub price: f64,
}

pub const PASSES: [PassDefinition; 3] = [
    PassDefinition {
        id: "multi_2x",
        name: "2x Multi-Open Pass",
        quantity: 2,
        price: 50.0,
    },
    PassDefinition {
        id: "multi_3x",
        name: "3x Multi-Open Pass",
        quantity: 3,
        price: 100.0,
    },
    PassDefinition {
        id: "multi_4x",
        name: "4x Multi-Open Pass",
        quantity: 4,
        price: 200.0,
    },
];

/// Look up a pass by identifier.
pub fn pass_by_id(id: &str) -> Option<&'static PassDefinition> {
    PASSES.iter().find(|pass| pass.id == id)
}

/// Pass required to open `quantity` cases at once, if any.
pub fn pass_for_quantity(quantity: u32) -> Option<&'static PassDefinition> {
    PASSES.iter().find(|pass| pass.quantity == quantity)
}
