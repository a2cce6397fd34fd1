//! SQLite-backed [`Backend`].
//!
//! One connection behind a mutex; every call runs on the blocking pool. Balance changes are
//! guarded by a per-user `version` column and recorded under their idempotency key in the same
//! transaction.

use anyhow::{anyhow, Context, Result};
use lootcase_execution::{Backend, ChatMessage, DropRecord, InventoryRow, LedgerError, UserProfile};
use lootcase_types::{round2, OpenedItem};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

/// Tokens issued for a new session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionTokens {
    pub auth_token: String,
    pub csrf_token: String,
}

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    default_inventory_max: u32,
}

impl SqliteStore {
    pub fn open(path: &Path, default_inventory_max: u32) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("open store db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            default_inventory_max,
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| anyhow!("store connection poisoned"))?;
            f(&mut conn)
        })
        .await
        .context("store task failed")?
    }

    /// Create a user with `balance`, or reset the balance of an existing one.
    pub async fn upsert_user(&self, user_id: &str, balance: f64) -> Result<()> {
        let user_id = user_id.to_string();
        let inventory_max = self.default_inventory_max;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO users (user_id, balance, inventory_max) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET balance = excluded.balance, version = version + 1",
                params![user_id, balance, inventory_max],
            )?;
            Ok(())
        })
        .await
    }

    /// Issue a session for `user_id` valid for `ttl`.
    pub async fn create_session(&self, user_id: &str, ttl: Duration) -> Result<SessionTokens> {
        let user_id = user_id.to_string();
        let tokens = SessionTokens {
            auth_token: Uuid::new_v4().to_string(),
            csrf_token: Uuid::new_v4().to_string(),
        };
        let expires_at_ms = now_ms().saturating_add(ttl.as_millis() as u64);
        let row = tokens.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sessions (auth_token, user_id, csrf_token, expires_at_ms)
                 VALUES (?1, ?2, ?3, ?4)",
                params![row.auth_token, user_id, row.csrf_token, expires_at_ms],
            )?;
            Ok(())
        })
        .await?;
        Ok(tokens)
    }

    pub async fn chat_count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM chat_messages", [], |row| row.get(0))?)
        })
        .await
    }

    pub async fn drop_history_count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM drop_history", [], |row| row.get(0))?)
        })
        .await
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         CREATE TABLE IF NOT EXISTS users (
             user_id TEXT PRIMARY KEY,
             balance REAL NOT NULL,
             version INTEGER NOT NULL DEFAULT 0,
             discount_level INTEGER NOT NULL DEFAULT 0,
             best_drop REAL NOT NULL DEFAULT 0,
             inventory_max INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS sessions (
             auth_token TEXT PRIMARY KEY,
             user_id TEXT NOT NULL,
             csrf_token TEXT NOT NULL,
             expires_at_ms INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS inventory (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             user_id TEXT NOT NULL,
             case_id TEXT NOT NULL,
             seed TEXT NOT NULL,
             name TEXT NOT NULL,
             icon TEXT NOT NULL,
             rarity TEXT NOT NULL,
             value REAL NOT NULL
         );
         CREATE INDEX IF NOT EXISTS inventory_user ON inventory (user_id);
         CREATE TABLE IF NOT EXISTS drop_history (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             user_id TEXT NOT NULL,
             case_id TEXT NOT NULL,
             name TEXT NOT NULL,
             icon TEXT NOT NULL,
             rarity TEXT NOT NULL,
             value REAL NOT NULL,
             dropped_at_ms INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS chat_messages (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             user_id TEXT NOT NULL,
             message TEXT NOT NULL,
             name TEXT NOT NULL,
             rarity TEXT NOT NULL,
             value REAL NOT NULL,
             created_at_ms INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS passes (
             user_id TEXT NOT NULL,
             pass_id TEXT NOT NULL,
             PRIMARY KEY (user_id, pass_id)
         );
         CREATE TABLE IF NOT EXISTS ledger_keys (
             key TEXT PRIMARY KEY,
             user_id TEXT NOT NULL,
             delta REAL NOT NULL,
             balance REAL NOT NULL
         );",
    )
    .context("init store schema")?;
    Ok(())
}

fn insert_drop(tx: &Transaction<'_>, record: &DropRecord) -> rusqlite::Result<usize> {
    let OpenedItem {
        name,
        icon,
        rarity,
        value,
    } = &record.item;
    tx.execute(
        "INSERT INTO drop_history (user_id, case_id, name, icon, rarity, value, dropped_at_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.user_id,
            record.case_id,
            name,
            icon,
            rarity.label(),
            value,
            record.dropped_at_ms
        ],
    )
}

/// Apply one balance change inside `tx`. The outer error is infrastructure, the inner is typed.
fn apply_adjustment(
    tx: &Transaction<'_>,
    user_id: &str,
    delta: f64,
    expected_balance: Option<f64>,
    key: Option<&str>,
) -> Result<Result<f64, LedgerError>> {
    if let Some(key) = key {
        let recorded = tx
            .query_row(
                "SELECT balance FROM ledger_keys WHERE key = ?1",
                params![key],
                |row| row.get::<_, f64>(0),
            )
            .optional()?;
        if let Some(balance) = recorded {
            return Ok(Ok(balance));
        }
    }

    let (balance, version) = tx
        .query_row(
            "SELECT balance, version FROM users WHERE user_id = ?1",
            params![user_id],
            |row| Ok((row.get::<_, f64>(0)?, row.get::<_, i64>(1)?)),
        )
        .optional()?
        .ok_or_else(|| anyhow!("unknown user {user_id}"))?;
    if expected_balance.is_some_and(|expected| expected != balance) {
        return Ok(Err(LedgerError::Concurrent));
    }
    let next = round2(balance + delta);
    if next < 0.0 {
        return Ok(Err(LedgerError::InsufficientFunds));
    }

    let updated = tx.execute(
        "UPDATE users SET balance = ?1, version = version + 1 WHERE user_id = ?2 AND version = ?3",
        params![next, user_id, version],
    )?;
    if updated == 0 {
        return Ok(Err(LedgerError::Concurrent));
    }
    if let Some(key) = key {
        tx.execute(
            "INSERT INTO ledger_keys (key, user_id, delta, balance) VALUES (?1, ?2, ?3, ?4)",
            params![key, user_id, delta, next],
        )?;
    }
    Ok(Ok(next))
}

impl Backend for SqliteStore {
    async fn verify_session(&self, user_id: &str, auth_token: &str) -> Result<bool> {
        let user_id = user_id.to_string();
        let auth_token = auth_token.to_string();
        let now = now_ms();
        self.with_conn(move |conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM sessions WHERE auth_token = ?1 AND user_id = ?2 AND expires_at_ms > ?3",
                    params![auth_token, user_id, now],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn verify_csrf(&self, user_id: &str, csrf_token: &str) -> Result<bool> {
        let user_id = user_id.to_string();
        let csrf_token = csrf_token.to_string();
        let now = now_ms();
        self.with_conn(move |conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM sessions WHERE csrf_token = ?1 AND user_id = ?2 AND expires_at_ms > ?3",
                    params![csrf_token, user_id, now],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT balance, discount_level, best_drop, inventory_max FROM users WHERE user_id = ?1",
                    params![user_id],
                    |row| {
                        Ok((
                            row.get::<_, f64>(0)?,
                            row.get::<_, u32>(1)?,
                            row.get::<_, f64>(2)?,
                            row.get::<_, u32>(3)?,
                        ))
                    },
                )
                .optional()?;
            let Some((balance, discount_level, best_drop, inventory_max)) = row else {
                return Ok(None);
            };
            let inventory_count = conn.query_row(
                "SELECT COUNT(*) FROM inventory WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, u32>(0),
            )?;
            let mut stmt =
                conn.prepare("SELECT pass_id FROM passes WHERE user_id = ?1 ORDER BY pass_id")?;
            let unlocked_passes = stmt
                .query_map(params![user_id], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(Some(UserProfile {
                user_id,
                balance,
                discount_level,
                best_drop,
                inventory_count,
                inventory_max,
                unlocked_passes,
            }))
        })
        .await
    }

    async fn adjust_balance(
        &self,
        user_id: &str,
        delta: f64,
        expected_balance: Option<f64>,
        idempotency_key: Option<&str>,
    ) -> Result<f64, LedgerError> {
        let user_id = user_id.to_string();
        let key = idempotency_key.map(str::to_string);
        let outcome = self
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                let outcome =
                    apply_adjustment(&tx, &user_id, delta, expected_balance, key.as_deref())?;
                if outcome.is_ok() {
                    tx.commit()?;
                }
                Ok(outcome)
            })
            .await;
        match outcome {
            Ok(outcome) => outcome,
            Err(err) => Err(LedgerError::Other(err)),
        }
    }

    async fn insert_inventory(&self, rows: &[InventoryRow]) -> Result<()> {
        let rows = rows.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            for row in &rows {
                tx.execute(
                    "INSERT INTO inventory (user_id, case_id, seed, name, icon, rarity, value)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        row.user_id,
                        row.case_id,
                        row.seed,
                        row.item.name,
                        row.item.icon,
                        row.item.rarity.label(),
                        row.item.value
                    ],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn update_best_drop(&self, user_id: &str, value: f64) -> Result<()> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE users SET best_drop = MAX(best_drop, ?1) WHERE user_id = ?2",
                params![value, user_id],
            )?;
            Ok(())
        })
        .await
    }

    async fn append_drop_history(&self, records: &[DropRecord]) -> Result<()> {
        let records = records.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            for record in &records {
                insert_drop(&tx, record)?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn append_drop_history_row(&self, record: &DropRecord) -> Result<()> {
        let record = record.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            insert_drop(&tx, &record)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn insert_chat_message(&self, message: &ChatMessage) -> Result<()> {
        let message = message.clone();
        let created_at_ms = now_ms();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO chat_messages (user_id, message, name, rarity, value, created_at_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    message.user_id,
                    message.message,
                    message.item.name,
                    message.item.rarity.label(),
                    message.item.value,
                    created_at_ms
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn grant_pass(&self, user_id: &str, pass_id: &str) -> Result<()> {
        let user_id = user_id.to_string();
        let pass_id = pass_id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO passes (user_id, pass_id) VALUES (?1, ?2)",
                params![user_id, pass_id],
            )?;
            Ok(())
        })
        .await
    }

    async fn set_discount_level(&self, user_id: &str, level: u32) -> Result<()> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE users SET discount_level = ?1 WHERE user_id = ?2",
                params![level, user_id],
            )?;
            if updated == 0 {
                anyhow::bail!("unknown user {user_id}");
            }
            Ok(())
        })
        .await
    }
}
