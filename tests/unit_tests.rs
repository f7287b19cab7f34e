// Unit tests for the VoiceDNA API core rules

use std::collections::HashMap;

use chrono::{Duration, Utc};
use uuid::Uuid;

use voicedna_api::core::{
    discounts::{
        apply_percent, check_discount_code, check_referral_code, meets_minimum_charge,
        percent_discount_cents, CodeRejection, MIN_CHARGE_CENTS,
    },
    funnel::{FunnelStage, TicketStatus, VoiceProfileStatus},
    pricing::{lookup_tier, playground_access, BillingKind},
    referrals::{generate_referral_code, referral_credit_cents},
    tokens::{remaining_downloads, token_expired, window_allows},
    voice::{build_generation_prompt, validate_answers, word_count, REQUIRED_ANSWER_KEYS},
};
use voicedna_api::models::{DiscountCode, ReferralCode};

fn discount_code(percent_off: i32) -> DiscountCode {
    DiscountCode {
        code: "LAUNCH20".to_string(),
        percent_off,
        max_uses: Some(100),
        uses: 0,
        expires_at: None,
        active: true,
        created_at: Utc::now(),
    }
}

fn referral_code(owner: Uuid) -> ReferralCode {
    ReferralCode {
        code: "JANE-X4F7".to_string(),
        owner_user_id: owner,
        percent_off: 10,
        referrer_credit_pct: 10,
        max_uses: None,
        uses: 0,
        active: true,
        created_at: Utc::now(),
    }
}

fn complete_answers() -> HashMap<String, String> {
    REQUIRED_ANSWER_KEYS
        .iter()
        .map(|k| (k.to_string(), format!("my {}", k)))
        .collect()
}

#[test]
fn test_discount_math_floors_cents() {
    // 15% of 4999 cents is 749.85; cents math rounds down
    assert_eq!(percent_discount_cents(4_999, 15), 749);
    assert_eq!(apply_percent(4_999, 15), 4_250);
    assert_eq!(apply_percent(4_900, 0), 4_900);
}

#[test]
fn test_discount_cannot_go_negative() {
    assert_eq!(apply_percent(1_000, 100), 0);
    assert_eq!(apply_percent(1_000, 150), 0);
    assert_eq!(percent_discount_cents(-100, 50), 0);
}

#[test]
fn test_minimum_charge_rejects_near_free_checkouts() {
    assert!(meets_minimum_charge(MIN_CHARGE_CENTS));
    assert!(!meets_minimum_charge(MIN_CHARGE_CENTS - 1));

    // A 100%-off code fails the minimum instead of charging zero
    let total = apply_percent(4_900, 100);
    assert!(!meets_minimum_charge(total));
}

#[test]
fn test_discount_code_expiry() {
    let mut code = discount_code(20);
    assert_eq!(check_discount_code(&code, Utc::now()), Ok(20));

    code.expires_at = Some(Utc::now() - Duration::minutes(5));
    assert_eq!(
        check_discount_code(&code, Utc::now()),
        Err(CodeRejection::Expired)
    );
}

#[test]
fn test_discount_code_usage_cap() {
    let mut code = discount_code(20);
    code.uses = 100;
    assert_eq!(
        check_discount_code(&code, Utc::now()),
        Err(CodeRejection::UsageLimitReached)
    );
}

#[test]
fn test_referral_code_blocks_self_referral() {
    let owner = Uuid::new_v4();
    let code = referral_code(owner);

    assert_eq!(check_referral_code(&code, owner), Err(CodeRejection::SelfReferral));
    assert_eq!(check_referral_code(&code, Uuid::new_v4()), Ok(10));
}

#[test]
fn test_referral_credit_computed_over_net_amount() {
    // 10%-off referral on a 4900-cent tier nets 4410; 10% credit floors to 441
    let net = apply_percent(4_900, 10);
    assert_eq!(net, 4_410);
    assert_eq!(referral_credit_cents(net, 10), 441);
}

#[test]
fn test_generated_codes_are_shareable() {
    let code = generate_referral_code("Jane Doe");
    assert!(code.starts_with("JANEDOE-"));
    assert!(code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));

    // Names with no usable characters still produce a code
    let fallback = generate_referral_code("指南");
    assert!(fallback.starts_with("VOICE-"));
}

#[test]
fn test_tier_catalog() {
    let essential = lookup_tier("essential").unwrap();
    assert_eq!(essential.amount_cents, 4_900);
    assert_eq!(essential.generations, 1);
    assert_eq!(essential.billing, BillingKind::OneTime);
    assert!(!essential.playground);

    let monthly = lookup_tier("creator-monthly").unwrap();
    assert_eq!(monthly.billing, BillingKind::Monthly);

    assert!(lookup_tier("enterprise").is_none());
}

#[test]
fn test_playground_gating() {
    assert!(playground_access(&["studio".to_string()], false));
    assert!(!playground_access(&["essential".to_string()], false));
    // An active subscription unlocks the playground with no purchase at all
    assert!(playground_access(&[], true));
}

#[test]
fn test_funnel_stage_is_monotonic() {
    assert_eq!(
        FunnelStage::Registered.advance_to(FunnelStage::Samples),
        FunnelStage::Samples
    );
    assert_eq!(
        FunnelStage::Generated.advance_to(FunnelStage::Questionnaire),
        FunnelStage::Generated
    );
    assert!(FunnelStage::Purchased < FunnelStage::Deployed);
}

#[test]
fn test_voice_profile_transitions() {
    use VoiceProfileStatus::*;

    assert!(Pending.can_transition(Processing));
    assert!(Processing.can_transition(Ready));
    assert!(Processing.can_transition(Failed));
    assert!(Failed.can_transition(Processing));

    // ready is terminal
    assert!(!Ready.can_transition(Processing));
    assert!(!Ready.can_transition(Failed));
}

#[test]
fn test_ticket_status_rules() {
    assert_eq!(TicketStatus::Answered.after_user_message(), Some(TicketStatus::Open));
    assert_eq!(TicketStatus::Open.after_support_message(), Some(TicketStatus::Answered));
    assert_eq!(TicketStatus::Closed.after_user_message(), None);
    assert!(!TicketStatus::Closed.can_close());
}

#[test]
fn test_download_token_rules() {
    let now = Utc::now();
    assert!(token_expired(now, now));
    assert!(!token_expired(now + Duration::hours(1), now));

    assert_eq!(remaining_downloads(5, 3), 2);
    assert_eq!(remaining_downloads(5, 5), 0);

    assert!(window_allows(19, 20));
    assert!(!window_allows(20, 20));
}

#[test]
fn test_word_count_and_answers() {
    assert_eq!(word_count("It was a dark and stormy night."), 7);

    let mut answers = complete_answers();
    assert!(validate_answers(&answers).is_ok());

    answers.remove("formality");
    assert!(validate_answers(&answers).is_err());
}

#[test]
fn test_generation_prompt_ordering() {
    let answers = complete_answers();
    let prompt = build_generation_prompt(
        &answers,
        &[("First post", "Alpha content"), ("Second post", "Beta content")],
    );

    let answers_at = prompt.find("tone: my tone").unwrap();
    let first_at = prompt.find("Sample 1 (First post)").unwrap();
    let second_at = prompt.find("Sample 2 (Second post)").unwrap();

    assert!(answers_at < first_at);
    assert!(first_at < second_at);
}
