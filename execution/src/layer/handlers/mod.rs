use super::*;

use crate::backend::{LedgerError, UserProfile};
use lootcase_types::api::Credentials;
use tracing::{error, info, warn};

/// Ledger key of the debit for an operation reference.
fn debit_key(reference: &str) -> String {
    format!("debit:{reference}")
}

/// Ledger key of the single compensating credit for an operation reference.
fn refund_key(reference: &str) -> String {
    format!("refund:{reference}")
}

impl<B: Backend> Layer<B> {
    /// Check the session and return the caller's user id.
    pub(in crate::layer) async fn authenticate<'r>(
        &self,
        credentials: &'r Credentials,
    ) -> Result<&'r str, ActionError> {
        if !credentials.is_complete() {
            return Err(ActionError::MissingAuth);
        }
        let user_id = credentials.user_id.as_str();
        let valid = self
            .backend
            .verify_session(user_id, &credentials.auth_token)
            .await
            .map_err(ActionError::Internal)?;
        if !valid {
            return Err(ActionError::InvalidSession);
        }
        Ok(user_id)
    }

    pub(in crate::layer) async fn check_csrf(
        &self,
        credentials: &Credentials,
    ) -> Result<(), ActionError> {
        if credentials.csrf_token.is_empty() {
            return Err(ActionError::InvalidCsrf);
        }
        let valid = self
            .backend
            .verify_csrf(&credentials.user_id, &credentials.csrf_token)
            .await
            .map_err(ActionError::Internal)?;
        if valid {
            Ok(())
        } else {
            Err(ActionError::InvalidCsrf)
        }
    }

    pub(in crate::layer) async fn profile(&self, user_id: &str) -> Result<UserProfile, ActionError> {
        self.backend
            .load_profile(user_id)
            .await
            .map_err(ActionError::Internal)?
            // A live session without stats is treated like a stale session.
            .ok_or(ActionError::InvalidSession)
    }

    /// Debit `amount`, requiring the balance the caller's checks were made against.
    pub(in crate::layer) async fn charge(
        &self,
        profile: &UserProfile,
        amount: f64,
        reference: &str,
    ) -> Result<f64, ActionError> {
        let key = debit_key(reference);
        self.backend
            .adjust_balance(&profile.user_id, -amount, Some(profile.balance), Some(&key))
            .await
            .map_err(|err| match err {
                LedgerError::InsufficientFunds => ActionError::InsufficientFunds,
                LedgerError::Concurrent => ActionError::BalanceChanged,
                LedgerError::Other(err) => {
                    error!(user_id = %profile.user_id, ?err, "debit failed");
                    ActionError::Internal(err)
                }
            })
    }

    /// Credit back exactly `amount` once. Returns whether the credit was applied.
    pub(in crate::layer) async fn refund(&self, user_id: &str, amount: f64, reference: &str) -> bool {
        let key = refund_key(reference);
        let refunded = match self
            .backend
            .adjust_balance(user_id, amount, None, Some(&key))
            .await
        {
            Ok(balance) => {
                info!(user_id, amount, balance, reference, "refund applied");
                true
            }
            Err(err) => {
                // Operators reconcile these by the refund key.
                error!(user_id, amount, reference, ?err, "refund failed");
                false
            }
        };
        self.counters.record_refund(refunded);
        refunded
    }

    /// Log and count a best-effort failure without surfacing it.
    pub(in crate::layer) fn side_effect_failed(&self, effect: &'static str, err: anyhow::Error) {
        warn!(effect, ?err, "side effect failed");
        self.counters.record_side_effect_failure();
    }
}

mod discount;
mod open_cases;
mod passes;
mod preview;
