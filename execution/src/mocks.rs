//! In-memory [`Backend`] with fault injection, for tests and local development.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::backend::{Backend, ChatMessage, DropRecord, InventoryRow, LedgerError, UserProfile};
use lootcase_types::DEFAULT_INVENTORY_MAX;

/// Failure kind injected into the next debit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerFault {
    InsufficientFunds,
    Concurrent,
    Other,
}

/// Toggles for simulated collaborator failures.
#[derive(Clone, Debug, Default)]
pub struct Faults {
    pub debit: Option<LedgerFault>,
    pub credit: bool,
    pub inventory: bool,
    pub best_drop: bool,
    pub drop_history_batch: bool,
    pub drop_history_row: bool,
    pub chat: bool,
    pub grant_pass: bool,
    pub discount: bool,
}

/// One `adjust_balance` call as observed by the backend, whether or not it succeeded.
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerCall {
    pub user_id: String,
    pub delta: f64,
    pub idempotency_key: Option<String>,
}

#[derive(Clone, Debug)]
struct MemoryUser {
    auth_token: String,
    csrf_token: String,
    profile: UserProfile,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, MemoryUser>,
    inventory: Vec<InventoryRow>,
    drop_history: Vec<DropRecord>,
    chat: Vec<ChatMessage>,
    ledger_calls: Vec<LedgerCall>,
    applied_keys: HashMap<String, f64>,
    faults: Faults,
}

#[derive(Default)]
pub struct Memory {
    inner: Mutex<Inner>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user with the given session, CSRF token and balance.
    pub fn with_user(self, user_id: &str, auth_token: &str, csrf_token: &str, balance: f64) -> Self {
        self.lock().users.insert(
            user_id.to_string(),
            MemoryUser {
                auth_token: auth_token.to_string(),
                csrf_token: csrf_token.to_string(),
                profile: UserProfile {
                    user_id: user_id.to_string(),
                    balance,
                    discount_level: 0,
                    best_drop: 0.0,
                    inventory_count: 0,
                    inventory_max: DEFAULT_INVENTORY_MAX,
                    unlocked_passes: Vec::new(),
                },
            },
        );
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not hide the state from the assertions that follow.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mutate a stored profile (passes, discount, inventory counters).
    pub fn update_profile(&self, user_id: &str, f: impl FnOnce(&mut UserProfile)) {
        if let Some(user) = self.lock().users.get_mut(user_id) {
            f(&mut user.profile);
        }
    }

    pub fn inject(&self, f: impl FnOnce(&mut Faults)) {
        f(&mut self.lock().faults);
    }

    pub fn profile(&self, user_id: &str) -> Option<UserProfile> {
        self.lock().users.get(user_id).map(|user| user.profile.clone())
    }

    pub fn balance(&self, user_id: &str) -> Option<f64> {
        self.profile(user_id).map(|profile| profile.balance)
    }

    pub fn inventory(&self) -> Vec<InventoryRow> {
        self.lock().inventory.clone()
    }

    pub fn drop_history(&self) -> Vec<DropRecord> {
        self.lock().drop_history.clone()
    }

    pub fn chat_messages(&self) -> Vec<ChatMessage> {
        self.lock().chat.clone()
    }

    pub fn ledger_calls(&self) -> Vec<LedgerCall> {
        self.lock().ledger_calls.clone()
    }
}

impl Backend for Memory {
    async fn verify_session(&self, user_id: &str, auth_token: &str) -> Result<bool> {
        Ok(self
            .lock()
            .users
            .get(user_id)
            .is_some_and(|user| user.auth_token == auth_token))
    }

    async fn verify_csrf(&self, user_id: &str, csrf_token: &str) -> Result<bool> {
        Ok(self
            .lock()
            .users
            .get(user_id)
            .is_some_and(|user| user.csrf_token == csrf_token))
    }

    async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.profile(user_id))
    }

    async fn adjust_balance(
        &self,
        user_id: &str,
        delta: f64,
        expected_balance: Option<f64>,
        idempotency_key: Option<&str>,
    ) -> Result<f64, LedgerError> {
        let mut inner = self.lock();
        inner.ledger_calls.push(LedgerCall {
            user_id: user_id.to_string(),
            delta,
            idempotency_key: idempotency_key.map(str::to_string),
        });

        if let Some(balance) = idempotency_key.and_then(|key| inner.applied_keys.get(key)) {
            return Ok(*balance);
        }
        if delta < 0.0 {
            match inner.faults.debit {
                Some(LedgerFault::InsufficientFunds) => return Err(LedgerError::InsufficientFunds),
                Some(LedgerFault::Concurrent) => return Err(LedgerError::Concurrent),
                Some(LedgerFault::Other) => {
                    return Err(LedgerError::Other(anyhow!("injected ledger failure")))
                }
                None => {}
            }
        } else if inner.faults.credit {
            return Err(LedgerError::Other(anyhow!("injected credit failure")));
        }

        let user = inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| LedgerError::Other(anyhow!("unknown user {user_id}")))?;
        if expected_balance.is_some_and(|expected| expected != user.profile.balance) {
            return Err(LedgerError::Concurrent);
        }
        let balance = lootcase_types::round2(user.profile.balance + delta);
        if balance < 0.0 {
            return Err(LedgerError::InsufficientFunds);
        }
        user.profile.balance = balance;
        if let Some(key) = idempotency_key {
            inner.applied_keys.insert(key.to_string(), balance);
        }
        Ok(balance)
    }

    async fn insert_inventory(&self, rows: &[InventoryRow]) -> Result<()> {
        let mut inner = self.lock();
        if inner.faults.inventory {
            return Err(anyhow!("injected inventory failure"));
        }
        for row in rows {
            if let Some(user) = inner.users.get_mut(&row.user_id) {
                user.profile.inventory_count += 1;
            }
        }
        inner.inventory.extend_from_slice(rows);
        Ok(())
    }

    async fn update_best_drop(&self, user_id: &str, value: f64) -> Result<()> {
        let mut inner = self.lock();
        if inner.faults.best_drop {
            return Err(anyhow!("injected best drop failure"));
        }
        if let Some(user) = inner.users.get_mut(user_id) {
            user.profile.best_drop = user.profile.best_drop.max(value);
        }
        Ok(())
    }

    async fn append_drop_history(&self, records: &[DropRecord]) -> Result<()> {
        let mut inner = self.lock();
        if inner.faults.drop_history_batch {
            return Err(anyhow!("injected drop history batch failure"));
        }
        inner.drop_history.extend_from_slice(records);
        Ok(())
    }

    async fn append_drop_history_row(&self, record: &DropRecord) -> Result<()> {
        let mut inner = self.lock();
        if inner.faults.drop_history_row {
            return Err(anyhow!("injected drop history row failure"));
        }
        inner.drop_history.push(record.clone());
        Ok(())
    }

    async fn insert_chat_message(&self, message: &ChatMessage) -> Result<()> {
        let mut inner = self.lock();
        if inner.faults.chat {
            return Err(anyhow!("injected chat failure"));
        }
        inner.chat.push(message.clone());
        Ok(())
    }

    async fn grant_pass(&self, user_id: &str, pass_id: &str) -> Result<()> {
        let mut inner = self.lock();
        if inner.faults.grant_pass {
            return Err(anyhow!("injected grant pass failure"));
        }
        let user = inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| anyhow!("unknown user {user_id}"))?;
        if !user.profile.unlocked_passes.iter().any(|owned| owned == pass_id) {
            user.profile.unlocked_passes.push(pass_id.to_string());
        }
        Ok(())
    }

    async fn set_discount_level(&self, user_id: &str, level: u32) -> Result<()> {
        let mut inner = self.lock();
        if inner.faults.discount {
            return Err(anyhow!("injected discount failure"));
        }
        let user = inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| anyhow!("unknown user {user_id}"))?;
        user.profile.discount_level = level;
        Ok(())
    }
}
