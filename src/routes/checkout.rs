use actix_web::{web, HttpResponse};
use chrono::Utc;
use validator::Validate;

use crate::auth::AuthUser;
use crate::core::{
    apply_percent, check_affiliate_code, check_discount_code, check_referral_code, lookup_tier,
    meets_minimum_charge, BillingKind, CodeKind, PricingTier,
};
use crate::error::ApiError;
use crate::models::{CheckoutRequest, CheckoutResponse};
use crate::routes::AppState;
use crate::services::stripe::{CheckoutMode, CheckoutSessionParams};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/checkout", web::post().to(create_checkout))
        .route("/purchases", web::get().to(list_purchases));
}

struct ResolvedCode {
    code: String,
    kind: CodeKind,
    percent_off: i32,
}

/// Resolve a code across the three code tables, enforcing per-kind rules
async fn resolve_code(
    state: &AppState,
    code: &str,
    buyer_id: uuid::Uuid,
) -> Result<Option<ResolvedCode>, ApiError> {
    if let Some(discount) = state.postgres.get_discount_code(code).await? {
        let percent_off = check_discount_code(&discount, Utc::now())
            .map_err(|r| ApiError::UnprocessableEntity(format!("Code rejected: {}", r)))?;
        return Ok(Some(ResolvedCode {
            code: discount.code,
            kind: CodeKind::Discount,
            percent_off,
        }));
    }

    if let Some(referral) = state.postgres.get_referral_code(code).await? {
        let percent_off = check_referral_code(&referral, buyer_id)
            .map_err(|r| ApiError::UnprocessableEntity(format!("Code rejected: {}", r)))?;
        return Ok(Some(ResolvedCode {
            code: referral.code,
            kind: CodeKind::Referral,
            percent_off,
        }));
    }

    if let Some(affiliate) = state.postgres.get_affiliate_by_code(code).await? {
        let percent_off = check_affiliate_code(&affiliate, buyer_id)
            .map_err(|r| ApiError::UnprocessableEntity(format!("Code rejected: {}", r)))?;
        return Ok(Some(ResolvedCode {
            code: affiliate.code,
            kind: CodeKind::Affiliate,
            percent_off,
        }));
    }

    Ok(None)
}

/// For stored attribution only: a code that no longer validates is dropped,
/// while infrastructure failures still fail the checkout.
fn discard_code_rejection<T>(
    result: Result<Option<T>, ApiError>,
) -> Result<Option<T>, ApiError> {
    match result {
        Err(ApiError::UnprocessableEntity(reason)) => {
            tracing::info!("Stored referral attribution no longer applies: {}", reason);
            Ok(None)
        }
        other => other,
    }
}

/// Start a checkout
///
/// POST /api/v1/checkout
///
/// An explicit code wins; otherwise the referral attribution captured at
/// signup is applied if it still validates. Discount math is integer cents,
/// and a total under the provider minimum is refused rather than clamped.
async fn create_checkout(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let tier: &PricingTier = lookup_tier(&req.tier_id)
        .ok_or_else(|| ApiError::UnprocessableEntity(format!("Unknown tier: {}", req.tier_id)))?;

    let resolved = match req.code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => {
            // Explicit codes fail loudly
            let resolved = resolve_code(&state, code, user.user_id).await?;
            if resolved.is_none() {
                return Err(ApiError::UnprocessableEntity(format!("Unknown code: {}", code)));
            }
            resolved
        }
        None => {
            // Stored attribution applies silently, and only while still valid
            let profile = state.postgres.get_profile(user.user_id).await?;
            match profile.and_then(|p| p.referred_by) {
                Some(code) => {
                    discard_code_rejection(resolve_code(&state, &code, user.user_id).await)?
                }
                None => None,
            }
        }
    };

    let total_cents = match &resolved {
        Some(r) => apply_percent(tier.amount_cents, r.percent_off),
        None => tier.amount_cents,
    };

    if !meets_minimum_charge(total_cents) {
        return Err(ApiError::UnprocessableEntity(
            "Discounted total is below the minimum chargeable amount".to_string(),
        ));
    }

    let public_url = state.settings.app.public_url.trim_end_matches('/');
    let mode = match tier.billing {
        BillingKind::OneTime => CheckoutMode::Payment,
        BillingKind::Monthly => CheckoutMode::Subscription,
    };

    let session = state
        .stripe
        .create_checkout_session(&CheckoutSessionParams {
            mode,
            product_name: format!("VoiceDNA {}", tier.name),
            amount_cents: total_cents,
            currency: tier.currency.to_string(),
            customer_email: user.email.clone(),
            success_url: format!("{}/studio?checkout=success", public_url),
            cancel_url: format!("{}/pricing?checkout=canceled", public_url),
            metadata: vec![
                ("user_id".to_string(), user.user_id.to_string()),
                ("tier_id".to_string(), tier.id.to_string()),
            ],
        })
        .await?;

    let checkout_url = session
        .url
        .ok_or_else(|| ApiError::UpstreamFailure("Checkout session has no URL".to_string()))?;

    let (discount_code, referral_code) = match &resolved {
        Some(r) if r.kind == CodeKind::Discount => (Some(r.code.as_str()), None),
        // Referral and affiliate codes share a column; the webhook resolves
        // which table owns the code when crediting.
        Some(r) => (None, Some(r.code.as_str())),
        None => (None, None),
    };

    let purchase = state
        .postgres
        .insert_purchase(
            user.user_id,
            tier.id,
            total_cents,
            tier.currency,
            discount_code,
            referral_code,
            &session.id,
            tier.generations,
        )
        .await?;

    tracing::info!(
        "Checkout {} created for user {} (tier {}, {} cents)",
        session.id,
        user.user_id,
        tier.id,
        total_cents
    );

    Ok(HttpResponse::Ok().json(CheckoutResponse {
        checkout_url,
        purchase_id: purchase.id,
    }))
}

async fn list_purchases(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let purchases = state.postgres.list_purchases(user.user_id).await?;
    Ok(HttpResponse::Ok().json(purchases))
}
