//! Persistence collaborators consumed by the layer.
//!
//! Every method is a remote call with its own failure surface. Infrastructure failures are
//! `anyhow::Error`; the balance ledger additionally distinguishes the failures the layer must
//! report differently.

use anyhow::Result;
use lootcase_types::OpenedItem;
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("balance changed concurrently")]
    Concurrent,
    #[error("ledger failure: {0}")]
    Other(anyhow::Error),
}

/// Subset of a user's persisted stats the layer needs.
#[derive(Clone, Debug, PartialEq)]
pub struct UserProfile {
    pub user_id: String,
    pub balance: f64,
    pub discount_level: u32,
    pub best_drop: f64,
    pub inventory_count: u32,
    pub inventory_max: u32,
    pub unlocked_passes: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InventoryRow {
    pub user_id: String,
    pub case_id: String,
    pub seed: String,
    pub item: OpenedItem,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DropRecord {
    pub user_id: String,
    pub case_id: String,
    pub item: OpenedItem,
    pub dropped_at_ms: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub user_id: String,
    pub message: String,
    pub item: OpenedItem,
}

pub trait Backend: Send + Sync {
    /// Whether `auth_token` is a live session for `user_id`.
    fn verify_session(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> impl Future<Output = Result<bool>> + Send;

    fn verify_csrf(
        &self,
        user_id: &str,
        csrf_token: &str,
    ) -> impl Future<Output = Result<bool>> + Send;

    fn load_profile(&self, user_id: &str) -> impl Future<Output = Result<Option<UserProfile>>> + Send;

    /// Atomically add `delta` to the balance and return the new balance.
    ///
    /// With `expected_balance` set, fails with [`LedgerError::Concurrent`] if the stored balance
    /// differs. A result below zero fails with [`LedgerError::InsufficientFunds`]. A repeated
    /// `idempotency_key` returns the balance recorded for it without mutating again.
    fn adjust_balance(
        &self,
        user_id: &str,
        delta: f64,
        expected_balance: Option<f64>,
        idempotency_key: Option<&str>,
    ) -> impl Future<Output = Result<f64, LedgerError>> + Send;

    /// Insert all rows or none.
    fn insert_inventory(&self, rows: &[InventoryRow]) -> impl Future<Output = Result<()>> + Send;

    /// Raise the recorded best single drop to `value` if it is higher.
    fn update_best_drop(&self, user_id: &str, value: f64)
        -> impl Future<Output = Result<()>> + Send;

    fn append_drop_history(
        &self,
        records: &[DropRecord],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Single-row path used when the batch append fails.
    fn append_drop_history_row(
        &self,
        record: &DropRecord,
    ) -> impl Future<Output = Result<()>> + Send;

    fn insert_chat_message(&self, message: &ChatMessage)
        -> impl Future<Output = Result<()>> + Send;

    fn grant_pass(&self, user_id: &str, pass_id: &str) -> impl Future<Output = Result<()>> + Send;

    fn set_discount_level(&self, user_id: &str, level: u32)
        -> impl Future<Output = Result<()>> + Send;
}
