//! JSON wire types for the single action endpoint.
//!
//! The client posts one body whose `action` field selects the operation; every response is
//! either an action-specific success body or an [`ErrorBody`] with a stable `error` code.

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::cases::{OpenedItem, Rarity, Slot};

/// Caller identity and anti-forgery token, shared by all authenticated actions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub csrf_token: String,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.user_id.trim().is_empty() && !self.auth_token.trim().is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenCasesRequest {
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(default)]
    pub case_id: String,
    /// Kept as a raw number so non-integers are reported as an invalid quantity.
    #[serde(default)]
    pub quantity: Option<Number>,
}

impl OpenCasesRequest {
    /// Requested quantity, defaulting to one when omitted. `None` if not a non-negative integer.
    ///
    /// Integral floats such as `2.0` count as integers, matching what browsers send.
    pub fn quantity(&self) -> Option<u64> {
        match &self.quantity {
            None => Some(1),
            Some(number) => number.as_u64().or_else(|| {
                number
                    .as_f64()
                    .filter(|value| *value >= 0.0 && value.fract() == 0.0)
                    .map(|value| value as u64)
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    #[serde(default)]
    pub case_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePassRequest {
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(default)]
    pub pass_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeDiscountRequest {
    #[serde(flatten)]
    pub credentials: Credentials,
}

/// Body of `POST /api/cases`, dispatched on `action`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ActionRequest {
    OpenCases(OpenCasesRequest),
    GeneratePreview(PreviewRequest),
    PurchasePass(PurchasePassRequest),
    UpgradeCaseDiscount(UpgradeDiscountRequest),
}

impl ActionRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ActionRequest::OpenCases(_) => "openCases",
            ActionRequest::GeneratePreview(_) => "generatePreview",
            ActionRequest::PurchasePass(_) => "purchasePass",
            ActionRequest::UpgradeCaseDiscount(_) => "upgradeCaseDiscount",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenCasesResponse {
    pub success: bool,
    pub seed: String,
    pub slots: Vec<Slot>,
    pub winners: Vec<OpenedItem>,
    pub total_value: f64,
    pub total_cost: f64,
    pub net_profit: f64,
    pub new_balance: f64,
    pub inventory_updated: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropRate {
    pub name: String,
    pub icon: String,
    pub rarity: Rarity,
    /// Display colour of the rarity tier.
    pub color: String,
    pub min_value: f64,
    pub max_value: f64,
    /// Percentage chance of this item, over all items in the case.
    pub chance: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub success: bool,
    pub case_id: String,
    pub seed: String,
    pub slot: Slot,
    pub drop_rates: Vec<DropRate>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePassResponse {
    pub success: bool,
    pub pass_id: String,
    pub cost: f64,
    pub new_balance: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeDiscountResponse {
    pub success: bool,
    pub discount_level: u32,
    pub cost: f64,
    pub new_balance: f64,
}

/// Catalog entry served by `GET /cases`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseSummary {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub drop_rates: Vec<DropRate>,
}

/// Success body of any action.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionResponse {
    OpenCases(OpenCasesResponse),
    Preview(PreviewResponse),
    PurchasePass(PurchasePassResponse),
    UpgradeDiscount(UpgradeDiscountResponse),
}

/// Failure body. `error` is a stable code the client branches on; the remaining fields are
/// present only for the errors that carry them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_pass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded: Option<bool>,
}

impl ErrorBody {
    pub fn new(error: &str) -> Self {
        Self {
            error: error.to_string(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dispatches_on_action_tag() {
        let body = json!({
            "action": "openCases",
            "userId": "u1",
            "authToken": "t",
            "csrfToken": "c",
            "caseId": "starter_box",
            "quantity": 2
        });
        let request: ActionRequest = serde_json::from_value(body).unwrap();
        let ActionRequest::OpenCases(open) = request else {
            panic!("expected openCases");
        };
        assert_eq!(open.credentials.user_id, "u1");
        assert_eq!(open.quantity(), Some(2));
        assert!(open.credentials.is_complete());
    }

    #[test]
    fn test_non_integer_quantity_is_rejected_late() {
        let body = json!({ "action": "openCases", "caseId": "x", "quantity": 2.5 });
        let ActionRequest::OpenCases(open) = serde_json::from_value(body).unwrap() else {
            panic!("expected openCases");
        };
        assert_eq!(open.quantity(), None);
        assert!(!open.credentials.is_complete());

        let body = json!({ "action": "openCases", "caseId": "x", "quantity": 3.0 });
        let ActionRequest::OpenCases(open) = serde_json::from_value(body).unwrap() else {
            panic!("expected openCases");
        };
        assert_eq!(open.quantity(), Some(3));

        let body = json!({ "action": "openCases", "caseId": "x" });
        let ActionRequest::OpenCases(open) = serde_json::from_value(body).unwrap() else {
            panic!("expected openCases");
        };
        assert_eq!(open.quantity(), Some(1));
    }

    #[test]
    fn test_unknown_action_fails() {
        let body = json!({ "action": "deleteEverything" });
        assert!(serde_json::from_value::<ActionRequest>(body).is_err());
    }

    #[test]
    fn test_error_body_omits_absent_context() {
        let body = ErrorBody::new("Case not found");
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "error": "Case not found" })
        );
        let body = ErrorBody {
            refunded: Some(false),
            ..ErrorBody::new("Failed to add items to inventory")
        };
        assert_eq!(serde_json::to_value(&body).unwrap()["refunded"], false);
    }
}
