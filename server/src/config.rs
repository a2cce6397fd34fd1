use anyhow::Context;
use lootcase_execution::ReelConfig;
use lootcase_types::{Catalog, DEFAULT_INVENTORY_MAX};
use std::path::Path;

const DEFAULT_HTTP_RATE_LIMIT_PER_SECOND: u64 = 50;
const DEFAULT_HTTP_RATE_LIMIT_BURST: u32 = 200;
const DEFAULT_ACTION_RATE_LIMIT_PER_MINUTE: u64 = 120;
const DEFAULT_ACTION_RATE_LIMIT_BURST: u32 = 10;
const DEFAULT_HTTP_BODY_LIMIT_BYTES: usize = 16 * 1024;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Browser origins allowed to call the API. `*` allows any origin.
    pub allowed_origins: Vec<String>,
    /// Accept requests without an `Origin` header (non-browser clients).
    pub allow_no_origin: bool,
    pub http_rate_limit_per_second: Option<u64>,
    pub http_rate_limit_burst: Option<u32>,
    pub action_rate_limit_per_minute: Option<u64>,
    pub action_rate_limit_burst: Option<u32>,
    pub http_body_limit_bytes: Option<usize>,
    /// Required on `/metrics/*` when set.
    pub metrics_auth_token: Option<String>,
    pub reel: ReelConfig,
    /// Inventory capacity given to newly provisioned users.
    pub default_inventory_max: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allow_no_origin: false,
            http_rate_limit_per_second: Some(DEFAULT_HTTP_RATE_LIMIT_PER_SECOND),
            http_rate_limit_burst: Some(DEFAULT_HTTP_RATE_LIMIT_BURST),
            action_rate_limit_per_minute: Some(DEFAULT_ACTION_RATE_LIMIT_PER_MINUTE),
            action_rate_limit_burst: Some(DEFAULT_ACTION_RATE_LIMIT_BURST),
            http_body_limit_bytes: Some(DEFAULT_HTTP_BODY_LIMIT_BYTES),
            metrics_auth_token: None,
            reel: ReelConfig::default(),
            default_inventory_max: DEFAULT_INVENTORY_MAX,
        }
    }
}

/// Load the case catalog from a YAML file, or the built-in catalog when no path is given.
pub fn load_catalog(path: Option<&Path>) -> anyhow::Result<Catalog> {
    let Some(path) = path else {
        return Ok(Catalog::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("invalid catalog {}", path.display()))
}
