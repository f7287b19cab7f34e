use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{CodeKind, FunnelStage};
use crate::models::domain::{ReferralCredit, SupportMessage, SupportTicket};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Uniform error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Funnel position plus the completion flags the studio UI renders
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStatusResponse {
    pub stage: FunnelStage,
    pub questionnaire_complete: bool,
    pub total_sample_words: i64,
    pub min_words_required: i64,
    pub generations_remaining: i32,
    pub profiles_ready: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeValidationResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<CodeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_off: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub purchase_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadResponse {
    pub email: String,
    /// false when the email was already on the list
    pub created: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralSummaryResponse {
    pub code: String,
    pub percent_off: i32,
    pub referrer_credit_pct: i32,
    pub uses: i32,
    pub max_uses: Option<i32>,
    pub credits: Vec<ReferralCredit>,
    pub total_credit_cents: i64,
    pub pending_credit_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateSummaryResponse {
    pub code: String,
    pub status: String,
    pub commission_pct: i32,
    pub referred_purchases: i64,
    pub total_commission_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestVoiceResponse {
    pub reply: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResponse {
    pub download_url: String,
    pub expires_at: DateTime<Utc>,
    pub max_downloads: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDetailResponse {
    pub ticket: SupportTicket,
    pub messages: Vec<SupportMessage>,
}
