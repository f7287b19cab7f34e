use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Query parameters on the hosted-auth callback redirect
#[derive(Debug, Clone, Deserialize)]
pub struct AuthCallbackQuery {
    pub code: String,
    #[serde(rename = "redirectTo", alias = "redirect_to")]
    pub redirect_to: Option<String>,
    /// Referral code attribution carried through signup
    #[serde(rename = "ref")]
    pub referral: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 80))]
    #[serde(rename = "displayName", alias = "display_name")]
    pub display_name: String,
}

/// Questionnaire answers, keyed by question id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionnaireRequest {
    pub answers: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSampleRequest {
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    #[validate(length(min = 1))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1))]
    #[serde(rename = "tierId", alias = "tier_id")]
    pub tier_id: String,
    /// Discount, referral or affiliate code; stored referral attribution
    /// applies when absent
    pub code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateCodeQuery {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LeadRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 60))]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TestVoiceRequest {
    #[validate(length(min = 1, max = 2000))]
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AffiliateApplyRequest {
    #[validate(url)]
    pub website: Option<String>,
    #[validate(length(max = 1000))]
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTicketRequest {
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    #[validate(length(max = 60))]
    pub category: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TicketMessageRequest {
    #[validate(length(min = 1, max = 5000))]
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_request_accepts_both_casings() {
        let camel: CheckoutRequest = serde_json::from_str(r#"{"tierId": "studio"}"#).unwrap();
        assert_eq!(camel.tier_id, "studio");

        let snake: CheckoutRequest = serde_json::from_str(r#"{"tier_id": "studio"}"#).unwrap();
        assert_eq!(snake.tier_id, "studio");
    }

    #[test]
    fn test_lead_request_validates_email() {
        let bad = LeadRequest {
            email: "not-an-email".to_string(),
            source: None,
        };
        assert!(bad.validate().is_err());

        let good = LeadRequest {
            email: "reader@example.com".to_string(),
            source: Some("blog-footer".to_string()),
        };
        assert!(good.validate().is_ok());
    }

    #[test]
    fn test_ticket_request_bounds() {
        let empty = CreateTicketRequest {
            subject: String::new(),
            category: None,
            message: "help".to_string(),
        };
        assert!(empty.validate().is_err());
    }
}
