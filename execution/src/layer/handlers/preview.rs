use super::super::*;

use crate::pool::drop_rates;
use crate::reel::generate_slot;
use crate::seed::MasterSeed;
use anyhow::anyhow;
use lootcase_types::api::{PreviewRequest, PreviewResponse};

/// Identity mixed into preview seeds in place of a user.
const PREVIEW_SUBJECT: &str = "preview";

impl<B: Backend> Layer<B> {
    /// Demonstration spin: one slot and the drop table, nothing charged or stored.
    pub(in crate::layer) fn handle_generate_preview(
        &self,
        request: &PreviewRequest,
    ) -> Result<PreviewResponse, ActionError> {
        let case = self
            .catalog
            .get(&request.case_id)
            .ok_or(ActionError::CaseNotFound)?;
        let seed = MasterSeed::generate(PREVIEW_SUBJECT, &case.id);
        let slot = generate_slot(case, seed.as_str(), 0, &self.config.reel)
            .ok_or_else(|| ActionError::Internal(anyhow!("case {} has no items", case.id)))?;

        Ok(PreviewResponse {
            success: true,
            case_id: case.id.clone(),
            seed: seed.into_string(),
            slot,
            drop_rates: drop_rates(case),
        })
    }
}
