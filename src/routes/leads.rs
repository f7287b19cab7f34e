use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use validator::Validate;

use crate::core::window_allows;
use crate::error::ApiError;
use crate::models::{LeadRequest, LeadResponse};
use crate::routes::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/leads", web::post().to(capture_lead));
}

/// Lead capture from the marketing site
///
/// POST /api/v1/leads
///
/// Rate limited per source IP with a row-count window. Re-submitting a known
/// email is a 200, not an error, so the form stays idempotent.
async fn capture_lead(
    state: web::Data<AppState>,
    req: web::Json<LeadRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let email = req.email.trim().to_lowercase();
    let ip = http_req
        .connection_info()
        .realip_remote_addr()
        .map(|addr| addr.to_string());

    if let Some(ip) = &ip {
        let since = Utc::now() - Duration::hours(1);
        let recent = state.postgres.count_leads_from_ip(ip, since).await?;
        if !window_allows(recent, state.settings.limits.leads_per_ip_per_hour) {
            tracing::info!("Lead capture rate limited for {}", ip);
            return Err(ApiError::TooManyRequests(
                "Too many signups from this address, try again later".to_string(),
            ));
        }
    }

    let (lead, created) = state
        .postgres
        .upsert_lead(&email, req.source.as_deref(), ip.as_deref())
        .await?;

    if created {
        // Best-effort; a failed welcome email never fails the signup
        if let Err(e) = state.email.send_welcome(&lead.email).await {
            tracing::warn!("Welcome email failed for {}: {}", lead.email, e);
        }
    }

    let body = LeadResponse {
        email: lead.email,
        created,
    };

    if created {
        Ok(HttpResponse::Created().json(body))
    } else {
        Ok(HttpResponse::Ok().json(body))
    }
}
