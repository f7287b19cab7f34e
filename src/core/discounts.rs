use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Affiliate, AffiliateStatus, DiscountCode, ReferralCode};

/// Smallest total the payment provider will accept, in cents.
///
/// A discount that would push a checkout below this is rejected outright
/// rather than clamped, so 100%-off codes are unusable at checkout.
pub const MIN_CHARGE_CENTS: i64 = 50;

/// Buyer-side discount granted by an approved affiliate code
pub const AFFILIATE_PERCENT_OFF: i32 = 10;

/// Which table a validated code came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeKind {
    Discount,
    Referral,
    Affiliate,
}

/// Why a code was refused at validation time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRejection {
    NotFound,
    Inactive,
    Expired,
    UsageLimitReached,
    SelfReferral,
    InvalidPercent,
}

impl CodeRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            CodeRejection::NotFound => "code_not_found",
            CodeRejection::Inactive => "code_inactive",
            CodeRejection::Expired => "code_expired",
            CodeRejection::UsageLimitReached => "usage_limit_reached",
            CodeRejection::SelfReferral => "self_referral",
            CodeRejection::InvalidPercent => "invalid_percent",
        }
    }
}

impl std::fmt::Display for CodeRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}

/// Discount amount for a percentage off, in integer cents (rounds down)
pub fn percent_discount_cents(amount_cents: i64, percent: i32) -> i64 {
    if amount_cents <= 0 || percent <= 0 {
        return 0;
    }
    let percent = i64::from(percent.min(100));
    amount_cents * percent / 100
}

/// Total after applying a percentage discount, in integer cents
pub fn apply_percent(amount_cents: i64, percent: i32) -> i64 {
    amount_cents - percent_discount_cents(amount_cents, percent)
}

/// Whether a discounted total is still chargeable
pub fn meets_minimum_charge(total_cents: i64) -> bool {
    total_cents >= MIN_CHARGE_CENTS
}

fn valid_percent(percent: i32) -> bool {
    (1..=100).contains(&percent)
}

/// Validate a discount code row; returns the percent off on success
pub fn check_discount_code(
    code: &DiscountCode,
    now: DateTime<Utc>,
) -> Result<i32, CodeRejection> {
    if !code.active {
        return Err(CodeRejection::Inactive);
    }
    if let Some(expires_at) = code.expires_at {
        if expires_at <= now {
            return Err(CodeRejection::Expired);
        }
    }
    if let Some(max_uses) = code.max_uses {
        if code.uses >= max_uses {
            return Err(CodeRejection::UsageLimitReached);
        }
    }
    if !valid_percent(code.percent_off) {
        return Err(CodeRejection::InvalidPercent);
    }
    Ok(code.percent_off)
}

/// Validate a referral code row for a given buyer; returns the percent off
///
/// A user can never redeem their own code.
pub fn check_referral_code(code: &ReferralCode, buyer_id: Uuid) -> Result<i32, CodeRejection> {
    if code.owner_user_id == buyer_id {
        return Err(CodeRejection::SelfReferral);
    }
    if !code.active {
        return Err(CodeRejection::Inactive);
    }
    if let Some(max_uses) = code.max_uses {
        if code.uses >= max_uses {
            return Err(CodeRejection::UsageLimitReached);
        }
    }
    if !valid_percent(code.percent_off) {
        return Err(CodeRejection::InvalidPercent);
    }
    Ok(code.percent_off)
}

/// Validate an affiliate code row; only approved affiliates discount a checkout
pub fn check_affiliate_code(affiliate: &Affiliate, buyer_id: Uuid) -> Result<i32, CodeRejection> {
    if affiliate.user_id == buyer_id {
        return Err(CodeRejection::SelfReferral);
    }
    if affiliate.status != AffiliateStatus::Approved {
        return Err(CodeRejection::Inactive);
    }
    Ok(AFFILIATE_PERCENT_OFF)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::models::AffiliateStatus;

    fn discount(percent: i32, uses: i32, max_uses: Option<i32>, active: bool) -> DiscountCode {
        DiscountCode {
            code: "LAUNCH20".to_string(),
            percent_off: percent,
            max_uses,
            uses,
            expires_at: None,
            active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_percent_discount_rounds_down() {
        // 15% of 4999 is 749.85; cents math floors
        assert_eq!(percent_discount_cents(4_999, 15), 749);
        assert_eq!(apply_percent(4_999, 15), 4_250);
    }

    #[test]
    fn test_percent_discount_edges() {
        assert_eq!(percent_discount_cents(4_900, 0), 0);
        assert_eq!(percent_discount_cents(4_900, 100), 4_900);
        assert_eq!(apply_percent(4_900, 100), 0);
        assert_eq!(percent_discount_cents(0, 50), 0);
        assert_eq!(percent_discount_cents(-100, 50), 0);
    }

    #[test]
    fn test_percent_clamped_above_hundred() {
        assert_eq!(percent_discount_cents(1_000, 150), 1_000);
    }

    #[test]
    fn test_minimum_charge_boundary() {
        assert!(meets_minimum_charge(MIN_CHARGE_CENTS));
        assert!(!meets_minimum_charge(MIN_CHARGE_CENTS - 1));
        assert!(!meets_minimum_charge(0));
    }

    #[test]
    fn test_discount_code_valid() {
        let code = discount(20, 3, Some(100), true);
        assert_eq!(check_discount_code(&code, Utc::now()), Ok(20));
    }

    #[test]
    fn test_discount_code_inactive() {
        let code = discount(20, 0, None, false);
        assert_eq!(
            check_discount_code(&code, Utc::now()),
            Err(CodeRejection::Inactive)
        );
    }

    #[test]
    fn test_discount_code_expired() {
        let mut code = discount(20, 0, None, true);
        code.expires_at = Some(Utc::now() - Duration::hours(1));
        assert_eq!(
            check_discount_code(&code, Utc::now()),
            Err(CodeRejection::Expired)
        );
    }

    #[test]
    fn test_discount_code_at_usage_cap() {
        let code = discount(20, 100, Some(100), true);
        assert_eq!(
            check_discount_code(&code, Utc::now()),
            Err(CodeRejection::UsageLimitReached)
        );
    }

    #[test]
    fn test_discount_code_invalid_percent() {
        let code = discount(0, 0, None, true);
        assert_eq!(
            check_discount_code(&code, Utc::now()),
            Err(CodeRejection::InvalidPercent)
        );
        let code = discount(101, 0, None, true);
        assert_eq!(
            check_discount_code(&code, Utc::now()),
            Err(CodeRejection::InvalidPercent)
        );
    }

    #[test]
    fn test_referral_code_rejects_self_referral() {
        let owner = Uuid::new_v4();
        let code = ReferralCode {
            code: "JANE-X4F7".to_string(),
            owner_user_id: owner,
            percent_off: 10,
            referrer_credit_pct: 10,
            max_uses: None,
            uses: 0,
            active: true,
            created_at: Utc::now(),
        };

        assert_eq!(check_referral_code(&code, owner), Err(CodeRejection::SelfReferral));
        assert_eq!(check_referral_code(&code, Uuid::new_v4()), Ok(10));
    }

    #[test]
    fn test_affiliate_code_requires_approval() {
        let affiliate = Affiliate {
            user_id: Uuid::new_v4(),
            code: "CREATOR-AB12".to_string(),
            commission_pct: 20,
            status: AffiliateStatus::Pending,
            created_at: Utc::now(),
        };

        assert_eq!(
            check_affiliate_code(&affiliate, Uuid::new_v4()),
            Err(CodeRejection::Inactive)
        );

        let approved = Affiliate {
            status: AffiliateStatus::Approved,
            ..affiliate
        };
        assert_eq!(check_affiliate_code(&approved, Uuid::new_v4()), Ok(AFFILIATE_PERCENT_OFF));
    }
}
