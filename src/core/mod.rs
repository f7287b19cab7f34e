// Core business rule exports
pub mod discounts;
pub mod funnel;
pub mod pricing;
pub mod referrals;
pub mod tokens;
pub mod voice;

pub use discounts::{
    apply_percent, check_affiliate_code, check_discount_code, check_referral_code,
    meets_minimum_charge, percent_discount_cents, CodeKind, CodeRejection, MIN_CHARGE_CENTS,
};
pub use funnel::{FunnelStage, TicketStatus, VoiceProfileStatus};
pub use pricing::{lookup_tier, playground_access, BillingKind, PricingTier, TIERS};
pub use referrals::{generate_referral_code, referral_credit_cents};
pub use tokens::{remaining_downloads, token_expired, window_allows};
pub use voice::{build_generation_prompt, extract_style_summary, validate_answers, word_count};
