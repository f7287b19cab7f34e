use actix_web::{web, HttpResponse};
use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::core::{
    build_generation_prompt, extract_style_summary, playground_access, voice, window_allows,
    FunnelStage, VoiceProfileStatus,
};
use crate::error::ApiError;
use crate::models::{DeployResponse, TestVoiceRequest, TestVoiceResponse};
use crate::routes::AppState;

/// System prompt for the profile generation run
const GENERATION_SYSTEM_PROMPT: &str = "You are an expert writing-style analyst. \
From the questionnaire answers and writing samples provided, produce a reusable \
system prompt that makes a language model write in this person's voice. Open \
with a single-paragraph summary of the voice, then give concrete style \
directives: tone, rhythm, vocabulary, formality, things to avoid.";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/voice-profiles", web::post().to(generate_profile))
        .route("/voice-profiles", web::get().to(list_profiles))
        .route("/voice-profiles/{id}", web::get().to(get_profile))
        .route("/voice-profiles/{id}/test", web::post().to(test_profile))
        .route("/voice-profiles/{id}/deploy", web::post().to(deploy_profile));
}

/// Run a paid voice profile generation
///
/// POST /api/v1/voice-profiles
///
/// Gated on a completed purchase with remaining generations (402), a
/// completed questionnaire and enough sample material (422). The LLM call is
/// synchronous; on upstream failure the row flips to `failed` and no
/// generation credit is consumed.
async fn generate_profile(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let purchase = state
        .postgres
        .find_purchase_with_credit(user.user_id)
        .await?
        .ok_or_else(|| {
            ApiError::PaymentRequired("No generation credits; purchase a tier first".to_string())
        })?;

    let questionnaire = state
        .postgres
        .get_questionnaire(user.user_id)
        .await?
        .ok_or_else(|| {
            ApiError::UnprocessableEntity("Complete the questionnaire first".to_string())
        })?;

    let answers: std::collections::HashMap<String, String> =
        serde_json::from_value(questionnaire.answers.clone()).map_err(|e| {
            tracing::error!("Stored answers failed to parse for {}: {}", user.user_id, e);
            ApiError::Internal
        })?;

    let samples = state.postgres.list_samples(user.user_id).await?;
    let total_words: i64 = samples.iter().map(|s| s.word_count).sum();
    let min_words = state.settings.limits.min_total_words;
    if !voice::generation_ready(true, total_words, min_words) {
        return Err(ApiError::UnprocessableEntity(format!(
            "Need at least {} total sample words (got {})",
            min_words, total_words
        )));
    }

    let profile = state
        .postgres
        .insert_voice_profile(user.user_id, purchase.id, state.openai.chat_model())
        .await?;

    let sample_refs: Vec<(&str, &str)> = samples
        .iter()
        .map(|s| (s.title.as_str(), s.content.as_str()))
        .collect();
    let prompt = build_generation_prompt(&answers, &sample_refs);

    let artifact = match state
        .openai
        .chat_completion(GENERATION_SYSTEM_PROMPT, &prompt)
        .await
    {
        Ok(artifact) => artifact,
        Err(e) => {
            tracing::error!("Generation failed for profile {}: {}", profile.id, e);
            state
                .postgres
                .mark_voice_profile_failed(profile.id, "language model request failed")
                .await?;
            return Err(ApiError::from(e));
        }
    };

    let (style_summary, system_prompt) = extract_style_summary(&artifact);

    let artifact_path = format!("artifacts/{}/{}.md", user.user_id, profile.id);
    if let Err(e) = state
        .supabase
        .upload_object(&artifact_path, system_prompt.clone().into_bytes(), "text/markdown")
        .await
    {
        tracing::error!("Artifact upload failed for profile {}: {}", profile.id, e);
        state
            .postgres
            .mark_voice_profile_failed(profile.id, "artifact upload failed")
            .await?;
        return Err(ApiError::from(e));
    }

    if !state.postgres.consume_generation(purchase.id).await? {
        // A concurrent generation spent the last credit between the gate and
        // here; the work is done, so log it rather than fail the request.
        tracing::warn!("Purchase {} over-consumed by a concurrent generation", purchase.id);
    }

    let ready = state
        .postgres
        .mark_voice_profile_ready(profile.id, &style_summary, &system_prompt, &artifact_path)
        .await?;

    state
        .postgres
        .advance_funnel(user.user_id, FunnelStage::Generated)
        .await?;

    tracing::info!("Voice profile {} (v{}) ready for {}", ready.id, ready.version, user.user_id);

    Ok(HttpResponse::Created().json(ready))
}

async fn list_profiles(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let profiles = state.postgres.list_voice_profiles(user.user_id).await?;
    Ok(HttpResponse::Ok().json(profiles))
}

async fn get_profile(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let profile = state
        .postgres
        .get_voice_profile(user.user_id, path.into_inner())
        .await?
        .ok_or_else(|| ApiError::NotFound("Voice profile not found".to_string()))?;

    Ok(HttpResponse::Ok().json(profile))
}

/// Chat against a generated profile in the playground
///
/// POST /api/v1/voice-profiles/{id}/test
async fn test_profile(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<TestVoiceRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let tier_ids = state.postgres.completed_tier_ids(user.user_id).await?;
    let subscription_active = state
        .postgres
        .get_subscription(user.user_id)
        .await?
        .map(|s| s.is_active())
        .unwrap_or(false);

    if !playground_access(&tier_ids, subscription_active) {
        return Err(ApiError::Forbidden(
            "Playground access requires a playground tier or an active subscription".to_string(),
        ));
    }

    let profile = state
        .postgres
        .get_voice_profile(user.user_id, path.into_inner())
        .await?
        .ok_or_else(|| ApiError::NotFound("Voice profile not found".to_string()))?;

    if profile.status != VoiceProfileStatus::Ready {
        return Err(ApiError::Conflict("Voice profile is not ready".to_string()));
    }

    let system_prompt = profile
        .system_prompt
        .ok_or_else(|| {
            tracing::error!("Ready profile {} has no system prompt", profile.id);
            ApiError::Internal
        })?;

    let since = Utc::now() - Duration::hours(24);
    let recent = state.postgres.count_tests_since(user.user_id, since).await?;
    if !window_allows(recent, state.settings.limits.tests_per_day) {
        return Err(ApiError::TooManyRequests(
            "Daily playground limit reached".to_string(),
        ));
    }

    let reply = state
        .openai
        .chat_completion(&system_prompt, &req.prompt)
        .await?;

    state.postgres.record_test_event(user.user_id).await?;

    Ok(HttpResponse::Ok().json(TestVoiceResponse { reply }))
}

/// Deploy a ready profile: mint a download token over its artifact
///
/// POST /api/v1/voice-profiles/{id}/deploy
async fn deploy_profile(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let profile = state
        .postgres
        .get_voice_profile(user.user_id, path.into_inner())
        .await?
        .ok_or_else(|| ApiError::NotFound("Voice profile not found".to_string()))?;

    if profile.status != VoiceProfileStatus::Ready {
        return Err(ApiError::Conflict(
            "Only ready profiles can be deployed".to_string(),
        ));
    }

    let limits = &state.settings.limits;
    let expires_at = Utc::now() + Duration::hours(limits.download_token_ttl_hours);

    let token = state
        .postgres
        .insert_download_token(
            user.user_id,
            profile.id,
            expires_at,
            limits.download_token_max_uses,
        )
        .await?;

    state.postgres.mark_voice_profile_deployed(profile.id).await?;
    state
        .postgres
        .advance_funnel(user.user_id, FunnelStage::Deployed)
        .await?;

    let download_url = format!(
        "{}/api/v1/downloads/{}",
        state.settings.app.public_url.trim_end_matches('/'),
        token.token
    );

    tracing::info!("Voice profile {} deployed for {}", profile.id, user.user_id);

    Ok(HttpResponse::Ok().json(DeployResponse {
        download_url,
        expires_at: token.expires_at,
        max_downloads: token.max_downloads,
    }))
}
