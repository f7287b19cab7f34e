use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{FunnelStage, TicketStatus, VoiceProfileStatus};

/// Account profile mirroring the hosted-auth user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub funnel_stage: FunnelStage,
    /// Referral code captured at signup, if the user arrived via one
    pub referred_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Voice questionnaire answers, one row per user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireResponse {
    pub user_id: Uuid,
    pub answers: serde_json::Value,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sample_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    Written,
    Spoken,
}

/// A writing sample, typed in or transcribed from audio
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: SampleKind,
    pub title: String,
    pub content: String,
    pub word_count: i64,
    /// Storage path of the original audio for spoken samples
    pub source_file_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A generated voice profile
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VoiceProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: VoiceProfileStatus,
    pub version: i32,
    pub style_summary: Option<String>,
    /// Full artifact used as the system prompt; present once status is ready
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub model: Option<String>,
    pub error: Option<String>,
    pub purchase_id: Option<Uuid>,
    /// Storage path of the uploaded artifact file
    #[serde(skip_serializing)]
    pub artifact_path: Option<String>,
    pub deployed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "purchase_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Expired,
    Refunded,
}

/// One checkout, pending until the payment webhook lands
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tier_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub discount_code: Option<String>,
    pub referral_code: Option<String>,
    /// Payment-provider session id; unique, the webhook idempotency key
    pub checkout_session_id: String,
    pub status: PurchaseStatus,
    pub generations_allowed: i32,
    pub generations_used: i32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Mirror of the provider-side subscription, upserted from webhooks
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: String,
    pub provider_subscription_id: String,
    pub status: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Provider statuses that grant entitlements
    pub fn is_active(&self) -> bool {
        matches!(self.status.as_str(), "active" | "trialing")
    }
}

/// One referral code per user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReferralCode {
    pub code: String,
    pub owner_user_id: Uuid,
    pub percent_off: i32,
    /// Share of the net purchase credited back to the referrer
    pub referrer_credit_pct: i32,
    pub max_uses: Option<i32>,
    pub uses: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "credit_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CreditStatus {
    Pending,
    Approved,
    Paid,
}

/// Credit owed to a referrer (or affiliate) for a completed purchase
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReferralCredit {
    pub id: Uuid,
    pub referrer_user_id: Uuid,
    pub referred_user_id: Uuid,
    pub purchase_id: Uuid,
    pub amount_cents: i64,
    pub status: CreditStatus,
    pub created_at: DateTime<Utc>,
}

/// Marketing discount code
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCode {
    pub code: String,
    pub percent_off: i32,
    pub max_uses: Option<i32>,
    pub uses: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "affiliate_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AffiliateStatus {
    Pending,
    Approved,
    Suspended,
}

/// Affiliate partner; their code only works once approved
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Affiliate {
    pub user_id: Uuid,
    pub code: String,
    pub commission_pct: i32,
    pub status: AffiliateStatus,
    pub created_at: DateTime<Utc>,
}

/// Support ticket header
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SupportTicket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub category: Option<String>,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_sender", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    User,
    Support,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SupportMessage {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub sender: MessageSender,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Captured marketing lead
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub email: String,
    pub source: Option<String>,
    #[serde(skip_serializing)]
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Token-gated access to a deployed voice profile artifact
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DownloadToken {
    pub token: Uuid,
    pub user_id: Uuid,
    pub voice_profile_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub max_downloads: i32,
    pub download_count: i32,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_active_statuses() {
        let mut sub = Subscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan_id: "creator-monthly".to_string(),
            provider_subscription_id: "sub_123".to_string(),
            status: "active".to_string(),
            current_period_end: None,
            cancel_at_period_end: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(sub.is_active());

        sub.status = "trialing".to_string();
        assert!(sub.is_active());

        sub.status = "canceled".to_string();
        assert!(!sub.is_active());

        sub.status = "past_due".to_string();
        assert!(!sub.is_active());
    }

    #[test]
    fn test_voice_profile_serializes_camel_case() {
        let profile = VoiceProfile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            status: VoiceProfileStatus::Ready,
            version: 1,
            style_summary: Some("Warm and direct".to_string()),
            system_prompt: Some("prompt".to_string()),
            model: Some("gpt-4o".to_string()),
            error: None,
            purchase_id: None,
            artifact_path: Some("artifacts/x.md".to_string()),
            deployed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["styleSummary"], "Warm and direct");
        assert_eq!(json["status"], "ready");
        // storage path never leaves the API
        assert!(json.get("artifactPath").is_none());
    }
}
