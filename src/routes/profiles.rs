use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::auth::AuthUser;
use crate::core::{voice, FunnelStage, VoiceProfileStatus};
use crate::error::ApiError;
use crate::models::{FunnelStatusResponse, Profile, UpdateProfileRequest};
use crate::routes::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/profiles/me", web::get().to(get_me))
        .route("/profiles/me", web::put().to(update_me))
        .route("/profiles/me/funnel", web::get().to(funnel_status));
}

/// Fetch the caller's profile, creating it lazily from token claims for
/// users whose first request beat the auth callback.
async fn ensure_profile(state: &AppState, user: &AuthUser) -> Result<Profile, ApiError> {
    if let Some(profile) = state.postgres.get_profile(user.user_id).await? {
        return Ok(profile);
    }

    let email = user.email.clone().unwrap_or_default();
    let profile = state
        .postgres
        .upsert_profile(user.user_id, &email, None)
        .await?;

    Ok(profile)
}

async fn get_me(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse, ApiError> {
    let profile = ensure_profile(&state, &user).await?;
    Ok(HttpResponse::Ok().json(profile))
}

async fn update_me(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    ensure_profile(&state, &user).await?;
    let profile = state
        .postgres
        .update_display_name(user.user_id, req.display_name.trim())
        .await?;

    Ok(HttpResponse::Ok().json(profile))
}

/// Funnel position plus the completion flags the studio dashboard shows
async fn funnel_status(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let profile = ensure_profile(&state, &user).await?;

    let questionnaire_complete = state
        .postgres
        .get_questionnaire(user.user_id)
        .await?
        .is_some();
    let total_sample_words = state.postgres.total_sample_words(user.user_id).await?;
    let generations_remaining = state.postgres.generations_remaining(user.user_id).await?;
    let profiles_ready = state
        .postgres
        .count_voice_profiles_with_status(user.user_id, VoiceProfileStatus::Ready)
        .await?;

    let min_words_required = state.settings.limits.min_total_words;
    // The stored stage can lag behind reality (e.g. a webhook raced a page
    // load); recompute the floor from the flags.
    let mut stage = profile.funnel_stage;
    if questionnaire_complete {
        stage = stage.advance_to(FunnelStage::Questionnaire);
    }
    if voice::generation_ready(questionnaire_complete, total_sample_words, min_words_required) {
        stage = stage.advance_to(FunnelStage::Samples);
    }

    Ok(HttpResponse::Ok().json(FunnelStatusResponse {
        stage,
        questionnaire_complete,
        total_sample_words,
        min_words_required,
        generations_remaining,
        profiles_ready,
    }))
}
