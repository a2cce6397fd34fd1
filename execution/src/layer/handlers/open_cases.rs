use super::super::*;

use crate::backend::{ChatMessage, DropRecord, InventoryRow, UserProfile};
use crate::pricing::{missing_pass, total_cost};
use crate::reel::generate_slots;
use crate::seed::MasterSeed;
use anyhow::anyhow;
use lootcase_types::api::{OpenCasesRequest, OpenCasesResponse};
use lootcase_types::{round2, CaseDefinition, OpenedItem, Slot, MAX_QUANTITY, MIN_QUANTITY};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

impl<B: Backend> Layer<B> {
    pub(in crate::layer) async fn handle_open_cases(
        &self,
        request: &OpenCasesRequest,
    ) -> Result<OpenCasesResponse, ActionError> {
        // === Validate ===
        let user_id = self.authenticate(&request.credentials).await?;
        let quantity = request
            .quantity()
            .filter(|quantity| {
                (u64::from(MIN_QUANTITY)..=u64::from(MAX_QUANTITY)).contains(quantity)
            })
            .ok_or(ActionError::InvalidQuantity)? as u32;
        self.check_csrf(&request.credentials).await?;
        let case = self
            .catalog
            .get(&request.case_id)
            .ok_or(ActionError::CaseNotFound)?;
        let profile = self.profile(user_id).await?;

        if let Some(pass) = missing_pass(quantity, &profile.unlocked_passes) {
            return Err(ActionError::PassRequired {
                pass_id: pass.id,
                pass_name: pass.name,
            });
        }

        let available = profile.inventory_max.saturating_sub(profile.inventory_count);
        if quantity > available {
            return Err(ActionError::InventoryFull {
                current: profile.inventory_count,
                max: profile.inventory_max,
                available,
            });
        }

        let cost = total_cost(case.price, quantity, profile.discount_level);
        if cost > profile.balance {
            return Err(ActionError::InsufficientFunds);
        }

        // === Debit ===
        let seed = MasterSeed::generate(user_id, &case.id);
        let new_balance = self.charge(&profile, cost, seed.as_str()).await?;

        // === Generate + persist ===
        // Past the debit the request runs to delivery or refund.
        let slots = match self.deliver(user_id, case, &seed, quantity).await {
            Ok(slots) => slots,
            Err(err) => {
                error!(user_id, case_id = %case.id, %seed, ?err, "delivery failed after debit");
                let refunded = self.refund(user_id, cost, seed.as_str()).await;
                return Err(ActionError::InventoryWrite { refunded });
            }
        };
        self.counters.record_opening(slots.len());

        let winners: Vec<OpenedItem> = slots.iter().map(|slot| slot.winner.clone()).collect();
        let total_value = round2(winners.iter().map(|item| item.value).sum());
        let net_profit = round2(total_value - cost);
        info!(
            user_id,
            case_id = %case.id,
            quantity,
            %seed,
            total_value,
            total_cost = cost,
            "cases opened"
        );

        // === Best-effort side effects ===
        futures::join!(
            self.record_best_drop(&profile, &winners),
            self.record_drop_history(user_id, &case.id, &winners),
            self.announce_rare_drops(user_id, &winners),
        );

        Ok(OpenCasesResponse {
            success: true,
            seed: seed.into_string(),
            slots,
            winners,
            total_value,
            total_cost: cost,
            net_profit,
            new_balance,
            inventory_updated: true,
        })
    }

    /// Generate every slot and write one inventory row per winner, all or nothing.
    async fn deliver(
        &self,
        user_id: &str,
        case: &CaseDefinition,
        seed: &MasterSeed,
        quantity: u32,
    ) -> anyhow::Result<Vec<Slot>> {
        let slots = generate_slots(case, seed.as_str(), quantity, &self.config.reel)
            .ok_or_else(|| anyhow!("case {} has no items", case.id))?;
        let rows: Vec<InventoryRow> = slots
            .iter()
            .map(|slot| InventoryRow {
                user_id: user_id.to_string(),
                case_id: case.id.clone(),
                seed: seed.to_string(),
                item: slot.winner.clone(),
            })
            .collect();
        self.backend.insert_inventory(&rows).await?;
        Ok(slots)
    }

    async fn record_best_drop(&self, profile: &UserProfile, winners: &[OpenedItem]) {
        let Some(best) = winners.iter().map(|item| item.value).reduce(f64::max) else {
            return;
        };
        if best <= profile.best_drop {
            return;
        }
        if let Err(err) = self.backend.update_best_drop(&profile.user_id, best).await {
            self.side_effect_failed("best_drop", err);
        }
    }

    async fn record_drop_history(&self, user_id: &str, case_id: &str, winners: &[OpenedItem]) {
        let dropped_at_ms = now_ms();
        let records: Vec<DropRecord> = winners
            .iter()
            .map(|item| DropRecord {
                user_id: user_id.to_string(),
                case_id: case_id.to_string(),
                item: item.clone(),
                dropped_at_ms,
            })
            .collect();
        let Err(err) = self.backend.append_drop_history(&records).await else {
            return;
        };
        warn!(user_id, ?err, "drop history batch failed, falling back to single rows");
        for record in &records {
            if let Err(err) = self.backend.append_drop_history_row(record).await {
                self.side_effect_failed("drop_history", err);
            }
        }
    }

    async fn announce_rare_drops(&self, user_id: &str, winners: &[OpenedItem]) {
        for item in winners.iter().filter(|item| item.rarity.is_broadcast()) {
            let message = ChatMessage {
                user_id: user_id.to_string(),
                message: format!(
                    "unboxed {} {} worth ${:.2}",
                    item.rarity, item.name, item.value
                ),
                item: item.clone(),
            };
            if let Err(err) = self.backend.insert_chat_message(&message).await {
                self.side_effect_failed("chat", err);
            }
        }
    }
}
