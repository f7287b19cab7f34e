use serde::{Deserialize, Serialize};

/// Stage of the product funnel a user has reached
///
/// Stages only move forward. The variant order is the funnel order; both the
/// Rust `Ord` and the Postgres enum comparison rely on it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "funnel_stage", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FunnelStage {
    Registered,
    Questionnaire,
    Samples,
    Purchased,
    Generated,
    Deployed,
}

impl FunnelStage {
    /// Monotonic advance: moving backwards keeps the current stage
    pub fn advance_to(self, target: FunnelStage) -> FunnelStage {
        self.max(target)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FunnelStage::Registered => "registered",
            FunnelStage::Questionnaire => "questionnaire",
            FunnelStage::Samples => "samples",
            FunnelStage::Purchased => "purchased",
            FunnelStage::Generated => "generated",
            FunnelStage::Deployed => "deployed",
        }
    }
}

/// Lifecycle of a voice profile generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "voice_profile_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VoiceProfileStatus {
    Pending,
    Processing,
    Ready,
    Failed,
}

impl VoiceProfileStatus {
    /// Legal transitions: pending → processing → ready|failed; a failed
    /// generation may be retried; ready is terminal.
    pub fn can_transition(self, to: VoiceProfileStatus) -> bool {
        use VoiceProfileStatus::*;
        matches!(
            (self, to),
            (Pending, Processing) | (Processing, Ready) | (Processing, Failed) | (Failed, Processing)
        )
    }
}

/// Support ticket lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    Answered,
    Closed,
}

impl TicketStatus {
    /// A user message reopens an answered ticket; closed tickets stay closed
    pub fn after_user_message(self) -> Option<TicketStatus> {
        match self {
            TicketStatus::Open | TicketStatus::Answered => Some(TicketStatus::Open),
            TicketStatus::Closed => None,
        }
    }

    /// A support reply marks the ticket answered
    pub fn after_support_message(self) -> Option<TicketStatus> {
        match self {
            TicketStatus::Open | TicketStatus::Answered => Some(TicketStatus::Answered),
            TicketStatus::Closed => None,
        }
    }

    pub fn can_close(self) -> bool {
        self != TicketStatus::Closed
    }
}
