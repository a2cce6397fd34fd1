/// Smallest number of cases that can be opened in one request.
pub const MIN_QUANTITY: u32 = 1;

/// Largest number of cases that can be opened in one request.
pub const MAX_QUANTITY: u32 = 4;

/// Number of rolled items in each slot's reel.
pub const REEL_LENGTH: usize = 96;

/// First reel index (inclusive) the winner may land on.
pub const WINNER_WINDOW_START: usize = 20;

/// Last reel index (exclusive) the winner may land on.
pub const WINNER_WINDOW_END: usize = 76;

/// Discount levels are 1% each and cap at 40%.
pub const MAX_DISCOUNT_LEVEL: u32 = 40;

/// Price of the next discount level is this amount times the level being bought.
pub const DISCOUNT_LEVEL_BASE_COST: f64 = 100.0;

/// Inventory capacity for accounts without an explicit limit.
pub const DEFAULT_INVENTORY_MAX: u32 = 500;

/// Stable error codes returned in the `error` field of failed responses.
pub const ERROR_MISSING_AUTH: &str = "Missing authentication";
pub const ERROR_INVALID_SESSION: &str = "Invalid session";
pub const ERROR_INVALID_REQUEST: &str = "Invalid request";
pub const ERROR_INVALID_QUANTITY: &str = "Invalid quantity";
pub const ERROR_INVALID_CSRF: &str = "Invalid CSRF token";
pub const ERROR_CASE_NOT_FOUND: &str = "Case not found";
pub const ERROR_PASS_REQUIRED: &str = "PASS_REQUIRED";
pub const ERROR_INVENTORY_FULL: &str = "INVENTORY_FULL";
pub const ERROR_INSUFFICIENT_FUNDS: &str = "Insufficient funds";
pub const ERROR_BALANCE_CHANGED: &str = "Balance changed. Please try again.";
pub const ERROR_INVENTORY_WRITE: &str = "Failed to add items to inventory";
pub const ERROR_INVALID_PASS: &str = "Invalid pass";
pub const ERROR_PASS_OWNED: &str = "Pass already owned";
pub const ERROR_MAX_DISCOUNT: &str = "Max discount reached";
pub const ERROR_ENTITLEMENT_WRITE: &str = "Failed to apply purchase";
pub const ERROR_INTERNAL: &str = "Internal server error";
