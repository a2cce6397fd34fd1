use lootcase_types::{
    ActionRequest, ActionResponse, Catalog, ErrorBody, ERROR_BALANCE_CHANGED, ERROR_CASE_NOT_FOUND,
    ERROR_ENTITLEMENT_WRITE, ERROR_INSUFFICIENT_FUNDS, ERROR_INTERNAL, ERROR_INVALID_CSRF,
    ERROR_INVALID_PASS, ERROR_INVALID_QUANTITY, ERROR_INVALID_REQUEST, ERROR_INVALID_SESSION,
    ERROR_INVENTORY_FULL, ERROR_INVENTORY_WRITE, ERROR_MAX_DISCOUNT, ERROR_MISSING_AUTH,
    ERROR_PASS_OWNED, ERROR_PASS_REQUIRED,
};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error as ThisError;
use tracing::debug;

use crate::backend::Backend;
use crate::reel::ReelConfig;

mod handlers;

/// Failure of one action, carrying the HTTP status and the stable client-facing code.
#[derive(Debug, ThisError)]
pub enum ActionError {
    #[error("missing authentication")]
    MissingAuth,
    #[error("invalid session")]
    InvalidSession,
    #[error("invalid request")]
    InvalidRequest,
    #[error("invalid quantity")]
    InvalidQuantity,
    #[error("invalid csrf token")]
    InvalidCsrf,
    #[error("case not found")]
    CaseNotFound,
    #[error("pass {pass_id} required")]
    PassRequired {
        pass_id: &'static str,
        pass_name: &'static str,
    },
    #[error("inventory full ({current}/{max})")]
    InventoryFull { current: u32, max: u32, available: u32 },
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("balance changed concurrently")]
    BalanceChanged,
    #[error("inventory write failed (refunded: {refunded})")]
    InventoryWrite { refunded: bool },
    #[error("invalid pass")]
    InvalidPass,
    #[error("pass already owned")]
    PassOwned,
    #[error("max discount reached")]
    MaxDiscount,
    #[error("entitlement write failed (refunded: {refunded})")]
    EntitlementWrite { refunded: bool },
    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl ActionError {
    pub fn status(&self) -> u16 {
        match self {
            ActionError::MissingAuth
            | ActionError::InvalidRequest
            | ActionError::InvalidQuantity
            | ActionError::InventoryFull { .. }
            | ActionError::InsufficientFunds
            | ActionError::InvalidPass
            | ActionError::PassOwned
            | ActionError::MaxDiscount => 400,
            ActionError::InvalidSession => 401,
            ActionError::InvalidCsrf | ActionError::PassRequired { .. } => 403,
            ActionError::CaseNotFound => 404,
            ActionError::BalanceChanged => 409,
            ActionError::InventoryWrite { .. }
            | ActionError::EntitlementWrite { .. }
            | ActionError::Internal(_) => 500,
        }
    }

    /// JSON body for the client. Internal detail never leaves the process.
    pub fn body(&self) -> ErrorBody {
        match self {
            ActionError::MissingAuth => ErrorBody::new(ERROR_MISSING_AUTH),
            ActionError::InvalidSession => ErrorBody::new(ERROR_INVALID_SESSION),
            ActionError::InvalidRequest => ErrorBody::new(ERROR_INVALID_REQUEST),
            ActionError::InvalidQuantity => ErrorBody::new(ERROR_INVALID_QUANTITY),
            ActionError::InvalidCsrf => ErrorBody::new(ERROR_INVALID_CSRF),
            ActionError::CaseNotFound => ErrorBody::new(ERROR_CASE_NOT_FOUND),
            ActionError::PassRequired { pass_id, pass_name } => ErrorBody {
                required_pass: Some(pass_id.to_string()),
                pass_name: Some(pass_name.to_string()),
                ..ErrorBody::new(ERROR_PASS_REQUIRED)
            },
            ActionError::InventoryFull {
                current,
                max,
                available,
            } => ErrorBody {
                current: Some(*current),
                max: Some(*max),
                available: Some(*available),
                ..ErrorBody::new(ERROR_INVENTORY_FULL)
            },
            ActionError::InsufficientFunds => ErrorBody::new(ERROR_INSUFFICIENT_FUNDS),
            ActionError::BalanceChanged => ErrorBody::new(ERROR_BALANCE_CHANGED),
            ActionError::InventoryWrite { refunded } => ErrorBody {
                refunded: Some(*refunded),
                ..ErrorBody::new(ERROR_INVENTORY_WRITE)
            },
            ActionError::InvalidPass => ErrorBody::new(ERROR_INVALID_PASS),
            ActionError::PassOwned => ErrorBody::new(ERROR_PASS_OWNED),
            ActionError::MaxDiscount => ErrorBody::new(ERROR_MAX_DISCOUNT),
            ActionError::EntitlementWrite { refunded } => ErrorBody {
                refunded: Some(*refunded),
                ..ErrorBody::new(ERROR_ENTITLEMENT_WRITE)
            },
            ActionError::Internal(_) => ErrorBody::new(ERROR_INTERNAL),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LayerConfig {
    pub reel: ReelConfig,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayerCountersSnapshot {
    pub openings: u64,
    pub slots_generated: u64,
    pub refunds_attempted: u64,
    pub refunds_succeeded: u64,
    pub refunds_failed: u64,
    pub side_effect_failures: u64,
}

/// Outcome counters, read by the server's metrics endpoint.
#[derive(Default)]
pub struct LayerCounters {
    openings: AtomicU64,
    slots_generated: AtomicU64,
    refunds_attempted: AtomicU64,
    refunds_succeeded: AtomicU64,
    refunds_failed: AtomicU64,
    side_effect_failures: AtomicU64,
}

impl LayerCounters {
    fn record_opening(&self, slots: usize) {
        self.openings.fetch_add(1, Ordering::Relaxed);
        self.slots_generated
            .fetch_add(slots as u64, Ordering::Relaxed);
    }

    fn record_refund(&self, refunded: bool) {
        self.refunds_attempted.fetch_add(1, Ordering::Relaxed);
        if refunded {
            self.refunds_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.refunds_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_side_effect_failure(&self) {
        self.side_effect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LayerCountersSnapshot {
        LayerCountersSnapshot {
            openings: self.openings.load(Ordering::Relaxed),
            slots_generated: self.slots_generated.load(Ordering::Relaxed),
            refunds_attempted: self.refunds_attempted.load(Ordering::Relaxed),
            refunds_succeeded: self.refunds_succeeded.load(Ordering::Relaxed),
            refunds_failed: self.refunds_failed.load(Ordering::Relaxed),
            side_effect_failures: self.side_effect_failures.load(Ordering::Relaxed),
        }
    }
}

/// Executes client actions against a [`Backend`].
///
/// Holds no per-request state; one instance is shared by every request.
pub struct Layer<B: Backend> {
    backend: B,
    catalog: Catalog,
    config: LayerConfig,
    counters: LayerCounters,
}

impl<B: Backend> Layer<B> {
    pub fn new(backend: B, catalog: Catalog, config: LayerConfig) -> Self {
        Self {
            backend,
            catalog,
            config,
            counters: LayerCounters::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn counters(&self) -> &LayerCounters {
        &self.counters
    }

    pub async fn execute(&self, request: ActionRequest) -> Result<ActionResponse, ActionError> {
        debug!(action = request.name(), "executing action");
        match request {
            ActionRequest::OpenCases(request) => {
                self.handle_open_cases(&request).await.map(ActionResponse::OpenCases)
            }
            ActionRequest::GeneratePreview(request) => self
                .handle_generate_preview(&request)
                .map(ActionResponse::Preview),
            ActionRequest::PurchasePass(request) => self
                .handle_purchase_pass(&request)
                .await
                .map(ActionResponse::PurchasePass),
            ActionRequest::UpgradeCaseDiscount(request) => self
                .handle_upgrade_discount(&request)
                .await
                .map(ActionResponse::UpgradeDiscount),
        }
    }
}
