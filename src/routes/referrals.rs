use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::auth::AuthUser;
use crate::core::{generate_referral_code, referrals};
use crate::error::ApiError;
use crate::models::{
    AffiliateApplyRequest, AffiliateSummaryResponse, CreditStatus, ReferralSummaryResponse,
};
use crate::routes::AppState;

/// Defaults for user-created referral codes
const REFERRAL_PERCENT_OFF: i32 = 10;
const REFERRER_CREDIT_PCT: i32 = 10;

/// Default commission for newly applied affiliates
const AFFILIATE_COMMISSION_PCT: i32 = 20;

/// Suffix collisions are ~1 in 1.6M; a handful of retries is plenty
const CODE_INSERT_ATTEMPTS: usize = 5;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/referrals", web::post().to(create_referral_code))
        .route("/referrals/me", web::get().to(referral_summary))
        .route("/affiliates/apply", web::post().to(apply_affiliate))
        .route("/affiliates/me", web::get().to(affiliate_summary));
}

/// Create-or-return the caller's referral code
///
/// POST /api/v1/referrals
async fn create_referral_code(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    if let Some(existing) = state.postgres.get_referral_code_by_owner(user.user_id).await? {
        return Ok(HttpResponse::Ok().json(existing));
    }

    let display_name = state
        .postgres
        .get_profile(user.user_id)
        .await?
        .and_then(|p| p.display_name)
        .or_else(|| user.email.as_deref().and_then(|e| e.split('@').next().map(String::from)))
        .unwrap_or_default();

    for _ in 0..CODE_INSERT_ATTEMPTS {
        let code = generate_referral_code(&display_name);
        if let Some(created) = state
            .postgres
            .try_insert_referral_code(&code, user.user_id, REFERRAL_PERCENT_OFF, REFERRER_CREDIT_PCT)
            .await?
        {
            return Ok(HttpResponse::Created().json(created));
        }
        tracing::debug!("Referral code collision on {}, retrying", code);
    }

    tracing::error!("Referral code generation kept colliding for {}", user.user_id);
    Err(ApiError::Internal)
}

async fn referral_summary(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let code = state
        .postgres
        .get_referral_code_by_owner(user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No referral code yet".to_string()))?;

    let credits = state.postgres.list_referral_credits(user.user_id).await?;
    let total_credit_cents = state.postgres.sum_referral_credits(user.user_id, None).await?;
    let pending_credit_cents = state
        .postgres
        .sum_referral_credits(user.user_id, Some(CreditStatus::Pending))
        .await?;

    Ok(HttpResponse::Ok().json(ReferralSummaryResponse {
        code: code.code,
        percent_off: code.percent_off,
        referrer_credit_pct: code.referrer_credit_pct,
        uses: code.uses,
        max_uses: code.max_uses,
        credits,
        total_credit_cents,
        pending_credit_cents,
    }))
}

/// Apply to the affiliate program; codes start `pending` until approved
///
/// POST /api/v1/affiliates/apply
async fn apply_affiliate(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<AffiliateApplyRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    if let Some(existing) = state.postgres.get_affiliate(user.user_id).await? {
        return Ok(HttpResponse::Ok().json(existing));
    }

    let display_name = state
        .postgres
        .get_profile(user.user_id)
        .await?
        .and_then(|p| p.display_name)
        .unwrap_or_default();

    for _ in 0..CODE_INSERT_ATTEMPTS {
        let code = referrals::generate_referral_code(&display_name);
        if let Some(created) = state
            .postgres
            .try_insert_affiliate(user.user_id, &code, AFFILIATE_COMMISSION_PCT)
            .await?
        {
            tracing::info!("Affiliate application from {} ({})", user.user_id, created.code);
            return Ok(HttpResponse::Created().json(created));
        }
    }

    tracing::error!("Affiliate code generation kept colliding for {}", user.user_id);
    Err(ApiError::Internal)
}

async fn affiliate_summary(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let affiliate = state
        .postgres
        .get_affiliate(user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not an affiliate".to_string()))?;

    let referred_purchases = state
        .postgres
        .count_purchases_with_code(&affiliate.code)
        .await?;
    let total_commission_cents = state
        .postgres
        .sum_referral_credits(user.user_id, None)
        .await?;

    let status = serde_json::to_value(affiliate.status)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default();

    Ok(HttpResponse::Ok().json(AffiliateSummaryResponse {
        code: affiliate.code,
        status,
        commission_pct: affiliate.commission_pct,
        referred_purchases,
        total_commission_cents,
    }))
}
