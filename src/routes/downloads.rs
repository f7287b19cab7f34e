use actix_web::{web, HttpResponse};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::core::{remaining_downloads, token_expired, window_allows};
use crate::error::ApiError;
use crate::routes::AppState;

/// Lifetime of the signed storage URL handed to the browser
const SIGNED_URL_TTL_SECS: u64 = 300;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/downloads/{token}", web::get().to(download_artifact));
}

/// Token-gated artifact download
///
/// GET /api/v1/downloads/{token}
///
/// Unknown token → 404; expired or cap-exhausted → 410; the owner's hourly
/// window full → 429. Success consumes the token once and 302-redirects to a
/// short-lived signed storage URL.
async fn download_artifact(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let token_id = Uuid::parse_str(&path.into_inner())
        .map_err(|_| ApiError::NotFound("Unknown download token".to_string()))?;

    let token = state
        .postgres
        .get_download_token(token_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Unknown download token".to_string()))?;

    let now = Utc::now();
    if token_expired(token.expires_at, now) {
        return Err(ApiError::Gone("Download link has expired".to_string()));
    }

    if remaining_downloads(token.max_downloads, token.download_count) == 0 {
        return Err(ApiError::Gone("Download limit reached".to_string()));
    }

    let since = now - Duration::hours(1);
    let recent = state.postgres.count_downloads_since(token.user_id, since).await?;
    if !window_allows(recent, state.settings.limits.downloads_per_hour) {
        return Err(ApiError::TooManyRequests(
            "Hourly download limit reached".to_string(),
        ));
    }

    let profile = state
        .postgres
        .get_voice_profile(token.user_id, token.voice_profile_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Voice profile not found".to_string()))?;

    let artifact_path = profile.artifact_path.ok_or_else(|| {
        tracing::error!("Deployed profile {} has no artifact path", profile.id);
        ApiError::Internal
    })?;

    // The counter guard double-checks the cap under concurrency
    if !state.postgres.consume_download(token_id).await? {
        return Err(ApiError::Gone("Download limit reached".to_string()));
    }
    state.postgres.record_download_event(token.user_id).await?;

    let signed_url = state
        .supabase
        .create_signed_url(&artifact_path, SIGNED_URL_TTL_SECS)
        .await?;

    tracing::info!(
        "Download {}/{} of profile {} via token {}",
        token.download_count + 1,
        token.max_downloads,
        profile.id,
        token_id
    );

    Ok(HttpResponse::Found()
        .insert_header(("Location", signed_url))
        .finish())
}
