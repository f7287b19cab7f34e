use actix_web::{web, HttpResponse};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::routes::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/subscriptions/me", web::get().to(get_subscription))
        .route("/subscriptions/cancel", web::post().to(cancel_subscription));
}

async fn get_subscription(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let subscription = state
        .postgres
        .get_subscription(user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No subscription".to_string()))?;

    Ok(HttpResponse::Ok().json(subscription))
}

/// Cancel at period end, then mirror the provider's answer locally
///
/// POST /api/v1/subscriptions/cancel
async fn cancel_subscription(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let subscription = state
        .postgres
        .get_subscription(user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No subscription".to_string()))?;

    if !subscription.is_active() {
        return Err(ApiError::Conflict("Subscription is not active".to_string()));
    }

    let updated = state
        .stripe
        .cancel_at_period_end(&subscription.provider_subscription_id)
        .await?;

    let period_end = updated
        .current_period_end
        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0));

    state
        .postgres
        .update_subscription_state(
            &updated.id,
            &updated.status,
            period_end,
            updated.cancel_at_period_end,
        )
        .await?;

    let mirrored = state
        .postgres
        .get_subscription(user.user_id)
        .await?
        .ok_or(ApiError::Internal)?;

    tracing::info!(
        "Subscription {} flagged to cancel at period end",
        mirrored.provider_subscription_id
    );

    Ok(HttpResponse::Ok().json(mirrored))
}
