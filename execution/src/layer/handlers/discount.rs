use super::super::*;

use crate::pricing::discount_upgrade_cost;
use crate::seed::MasterSeed;
use lootcase_types::api::{UpgradeDiscountRequest, UpgradeDiscountResponse};
use tracing::{error, info};

impl<B: Backend> Layer<B> {
    /// Buy the next 1% of case discount.
    pub(in crate::layer) async fn handle_upgrade_discount(
        &self,
        request: &UpgradeDiscountRequest,
    ) -> Result<UpgradeDiscountResponse, ActionError> {
        let user_id = self.authenticate(&request.credentials).await?;
        self.check_csrf(&request.credentials).await?;
        let profile = self.profile(user_id).await?;
        let cost = discount_upgrade_cost(profile.discount_level).ok_or(ActionError::MaxDiscount)?;
        if cost > profile.balance {
            return Err(ActionError::InsufficientFunds);
        }

        let level = profile.discount_level + 1;
        let reference = MasterSeed::generate(user_id, &format!("discount:{level}"));
        let new_balance = self.charge(&profile, cost, reference.as_str()).await?;
        if let Err(err) = self.backend.set_discount_level(user_id, level).await {
            error!(user_id, level, %reference, ?err, "discount write failed after debit");
            let refunded = self.refund(user_id, cost, reference.as_str()).await;
            return Err(ActionError::EntitlementWrite { refunded });
        }

        info!(user_id, level, cost, "discount upgraded");
        Ok(UpgradeDiscountResponse {
            success: true,
            discount_level: level,
            cost,
            new_balance,
        })
    }
}
