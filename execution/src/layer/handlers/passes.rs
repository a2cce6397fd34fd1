use super::super::*;

use crate::seed::MasterSeed;
use lootcase_types::api::{PurchasePassRequest, PurchasePassResponse};
use lootcase_types::cases::pass_by_id;
use tracing::{error, info};

impl<B: Backend> Layer<B> {
    pub(in crate::layer) async fn handle_purchase_pass(
        &self,
        request: &PurchasePassRequest,
    ) -> Result<PurchasePassResponse, ActionError> {
        let user_id = self.authenticate(&request.credentials).await?;
        self.check_csrf(&request.credentials).await?;
        let pass = pass_by_id(&request.pass_id).ok_or(ActionError::InvalidPass)?;
        let profile = self.profile(user_id).await?;
        if profile.unlocked_passes.iter().any(|owned| owned == pass.id) {
            return Err(ActionError::PassOwned);
        }
        if pass.price > profile.balance {
            return Err(ActionError::InsufficientFunds);
        }

        let reference = MasterSeed::generate(user_id, pass.id);
        let new_balance = self.charge(&profile, pass.price, reference.as_str()).await?;
        if let Err(err) = self.backend.grant_pass(user_id, pass.id).await {
            error!(user_id, pass_id = pass.id, %reference, ?err, "grant failed after debit");
            let refunded = self.refund(user_id, pass.price, reference.as_str()).await;
            return Err(ActionError::EntitlementWrite { refunded });
        }

        info!(user_id, pass_id = pass.id, cost = pass.price, "pass purchased");
        Ok(PurchasePassResponse {
            success: true,
            pass_id: pass.id.to_string(),
            cost: pass.price,
            new_balance,
        })
    }
}
