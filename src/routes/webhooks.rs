use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};

use crate::core::{referral_credit_cents, FunnelStage};
use crate::error::ApiError;
use crate::models::PurchaseStatus;
use crate::routes::AppState;
use crate::services::stripe::{verify_webhook_signature, WebhookEvent};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/webhooks/payments", web::post().to(payment_webhook));
}

fn ack() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "received": true }))
}

/// What to do with a verified delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// Event id already recorded; acknowledge without side effects
    Duplicate,
    Process,
    /// Event type this receiver does not act on
    Ignore,
}

fn disposition(first_delivery: bool, event_type: &str) -> Disposition {
    if !first_delivery {
        return Disposition::Duplicate;
    }
    match event_type {
        "checkout.session.completed"
        | "checkout.session.expired"
        | "customer.subscription.updated"
        | "customer.subscription.deleted" => Disposition::Process,
        _ => Disposition::Ignore,
    }
}

/// Payment provider webhook receiver
///
/// POST /api/v1/webhooks/payments
///
/// The body must stay raw for signature verification. Event ids are recorded
/// with an insert-or-ignore before any processing; a duplicate delivery is
/// acknowledged without side effects.
async fn payment_webhook(
    state: web::Data<AppState>,
    body: web::Bytes,
    http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let signature = http_req
        .headers()
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Validation("Missing Stripe-Signature header".to_string()))?;

    verify_webhook_signature(
        &body,
        signature,
        &state.settings.stripe.webhook_secret,
        Utc::now().timestamp(),
    )
    .map_err(|e| {
        tracing::warn!("Webhook signature rejected: {}", e);
        ApiError::Validation("Invalid webhook signature".to_string())
    })?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Validation(format!("Invalid webhook payload: {}", e)))?;

    let payload: serde_json::Value = serde_json::from_slice(&body).unwrap_or_default();
    let session_id = event
        .data
        .object
        .get("id")
        .and_then(|v| v.as_str())
        .map(String::from);

    let fresh = state
        .postgres
        .record_webhook_event(&event.id, &event.event_type, session_id.as_deref(), &payload)
        .await?;

    match disposition(fresh, &event.event_type) {
        Disposition::Duplicate => {
            tracing::info!("Duplicate webhook event {}, acknowledging", event.id);
            return Ok(ack());
        }
        Disposition::Ignore => {
            tracing::info!("Ignoring webhook event type {}", event.event_type);
            return Ok(ack());
        }
        Disposition::Process => {}
    }

    match event.event_type.as_str() {
        "checkout.session.completed" => handle_checkout_completed(&state, &event).await?,
        "checkout.session.expired" => handle_checkout_expired(&state, &event).await?,
        "customer.subscription.updated" => handle_subscription_update(&state, &event, None).await?,
        "customer.subscription.deleted" => {
            handle_subscription_update(&state, &event, Some("canceled")).await?
        }
        _ => {}
    }

    Ok(ack())
}

async fn handle_checkout_completed(
    state: &web::Data<AppState>,
    event: &WebhookEvent,
) -> Result<(), ApiError> {
    let session = event.checkout_session().map_err(ApiError::from)?;

    // None covers both an unknown session and a purchase already completed
    let Some(purchase) = state
        .postgres
        .complete_purchase_by_session(&session.id)
        .await?
    else {
        tracing::info!("No pending purchase for session {}, nothing to do", session.id);
        return Ok(());
    };

    tracing::info!(
        "Purchase {} completed for user {} ({} cents)",
        purchase.id,
        purchase.user_id,
        purchase.amount_cents
    );

    if let Some(code) = &purchase.discount_code {
        state.postgres.increment_discount_use(code).await?;
    }

    // The referral_code column carries both referral and affiliate codes;
    // whichever table owns the code receives the credit.
    if let Some(code) = &purchase.referral_code {
        if let Some(referral) = state.postgres.get_referral_code(code).await? {
            state.postgres.increment_referral_use(code).await?;
            let credit = referral_credit_cents(purchase.amount_cents, referral.referrer_credit_pct);
            if credit > 0 {
                state
                    .postgres
                    .insert_referral_credit(
                        referral.owner_user_id,
                        purchase.user_id,
                        purchase.id,
                        credit,
                    )
                    .await?;
            }
        } else if let Some(affiliate) = state.postgres.get_affiliate_by_code(code).await? {
            let commission = referral_credit_cents(purchase.amount_cents, affiliate.commission_pct);
            if commission > 0 {
                state
                    .postgres
                    .insert_referral_credit(
                        affiliate.user_id,
                        purchase.user_id,
                        purchase.id,
                        commission,
                    )
                    .await?;
            }
        } else {
            tracing::warn!("Purchase {} carried unknown code {}", purchase.id, code);
        }
    }

    if session.mode.as_deref() == Some("subscription") {
        if let Some(provider_subscription_id) = &session.subscription {
            state
                .postgres
                .upsert_subscription(
                    purchase.user_id,
                    &purchase.tier_id,
                    provider_subscription_id,
                    "active",
                    None,
                    false,
                )
                .await?;
        }
    }

    state
        .postgres
        .advance_funnel(purchase.user_id, FunnelStage::Purchased)
        .await?;

    // Receipt email is best-effort
    if let Ok(Some(profile)) = state.postgres.get_profile(purchase.user_id).await {
        let tier_name = crate::core::lookup_tier(&purchase.tier_id)
            .map(|tier| tier.name)
            .unwrap_or(purchase.tier_id.as_str());
        if let Err(e) = state
            .email
            .send_receipt(&profile.email, tier_name, purchase.amount_cents)
            .await
        {
            tracing::warn!("Receipt email failed for {}: {}", profile.email, e);
        }
    }

    Ok(())
}

async fn handle_checkout_expired(
    state: &web::Data<AppState>,
    event: &WebhookEvent,
) -> Result<(), ApiError> {
    let session = event.checkout_session().map_err(ApiError::from)?;

    let expired = state
        .postgres
        .set_purchase_status_by_session(&session.id, PurchaseStatus::Pending, PurchaseStatus::Expired)
        .await?;

    if expired {
        tracing::info!("Purchase for session {} marked expired", session.id);
    }

    Ok(())
}

async fn handle_subscription_update(
    state: &web::Data<AppState>,
    event: &WebhookEvent,
    status_override: Option<&str>,
) -> Result<(), ApiError> {
    let subscription = event.subscription().map_err(ApiError::from)?;

    let status = status_override.unwrap_or(subscription.status.as_str());
    let period_end = subscription
        .current_period_end
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0));

    let known = state
        .postgres
        .update_subscription_state(
            &subscription.id,
            status,
            period_end,
            subscription.cancel_at_period_end,
        )
        .await?;

    if !known {
        tracing::warn!(
            "Subscription event {} for unknown subscription {}",
            event.event_type,
            subscription.id
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replayed_event_is_never_reprocessed() {
        // The duplicate check wins even for event types we act on
        assert_eq!(
            disposition(false, "checkout.session.completed"),
            Disposition::Duplicate
        );
        assert_eq!(
            disposition(false, "customer.subscription.deleted"),
            Disposition::Duplicate
        );
        assert_eq!(disposition(false, "invoice.paid"), Disposition::Duplicate);
    }

    #[test]
    fn test_first_delivery_dispatches_handled_types() {
        for event_type in [
            "checkout.session.completed",
            "checkout.session.expired",
            "customer.subscription.updated",
            "customer.subscription.deleted",
        ] {
            assert_eq!(disposition(true, event_type), Disposition::Process);
        }
    }

    #[test]
    fn test_first_delivery_of_unhandled_type_is_acked_untouched() {
        assert_eq!(disposition(true, "invoice.paid"), Disposition::Ignore);
        assert_eq!(disposition(true, "charge.refunded"), Disposition::Ignore);
    }
}
