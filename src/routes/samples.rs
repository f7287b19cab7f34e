use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures::StreamExt;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::core::{voice, word_count, FunnelStage};
use crate::error::ApiError;
use crate::models::{CreateSampleRequest, SampleKind};
use crate::routes::AppState;

/// Upload guardrail for audio samples
const MAX_AUDIO_BYTES: usize = 15 * 1024 * 1024;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav", "ogg", "webm"];

/// The cap spans every multipart field in the request, not just the audio
/// part, so oversized title or stray fields cannot grow memory unbounded.
fn within_upload_limit(total_bytes: usize) -> bool {
    total_bytes <= MAX_AUDIO_BYTES
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/samples", web::post().to(create_sample))
        .route("/samples/audio", web::post().to(create_audio_sample))
        .route("/samples", web::get().to(list_samples))
        .route("/samples/{id}", web::delete().to(delete_sample));
}

async fn check_sample_cap(state: &AppState, user_id: Uuid) -> Result<(), ApiError> {
    let count = state.postgres.count_samples(user_id).await?;
    if count >= state.settings.limits.max_samples {
        return Err(ApiError::UnprocessableEntity(format!(
            "Sample limit reached ({} max)",
            state.settings.limits.max_samples
        )));
    }
    Ok(())
}

/// Submit a typed writing sample
///
/// POST /api/v1/samples
async fn create_sample(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<CreateSampleRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    check_sample_cap(&state, user.user_id).await?;

    let words = word_count(&req.content);
    if !voice::sample_words_in_bounds(words) {
        return Err(ApiError::UnprocessableEntity(format!(
            "Samples must be between {} and {} words (got {})",
            voice::MIN_SAMPLE_WORDS,
            voice::MAX_SAMPLE_WORDS,
            words
        )));
    }

    let sample = state
        .postgres
        .insert_sample(
            user.user_id,
            SampleKind::Written,
            req.title.trim(),
            &req.content,
            words,
            None,
        )
        .await?;

    state
        .postgres
        .advance_funnel(user.user_id, FunnelStage::Samples)
        .await?;

    Ok(HttpResponse::Created().json(sample))
}

/// Upload a spoken sample: store the original audio, transcribe it, and
/// save the transcript as a sample.
///
/// POST /api/v1/samples/audio (multipart: file, optional title)
async fn create_audio_sample(
    state: web::Data<AppState>,
    user: AuthUser,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    check_sample_cap(&state, user.user_id).await?;

    let mut filename = String::new();
    let mut title = String::new();
    let mut audio: Vec<u8> = Vec::new();
    let mut total_bytes: usize = 0;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| ApiError::Validation(format!("Invalid multipart body: {}", e)))?;

        let Some(cd) = field.content_disposition() else {
            continue;
        };
        let field_name = cd.get_name().unwrap_or_default().to_string();
        if let Some(name) = cd.get_filename() {
            filename = name.to_string();
        }

        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| ApiError::Validation(format!("Upload read failed: {}", e)))?;
            total_bytes += chunk.len();
            if !within_upload_limit(total_bytes) {
                return Err(ApiError::Validation(format!(
                    "Upload exceeds {}MB limit",
                    MAX_AUDIO_BYTES / (1024 * 1024)
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        match field_name.as_str() {
            "file" => audio = bytes,
            "title" => title = String::from_utf8_lossy(&bytes).trim().to_string(),
            _ => {}
        }
    }

    if audio.is_empty() {
        return Err(ApiError::Validation("Audio file is required".to_string()));
    }

    let extension = filename
        .rsplit('.')
        .next()
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();
    if !AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::Validation(format!(
            "Unsupported audio format '{}'; use one of {}",
            extension,
            AUDIO_EXTENSIONS.join(", ")
        )));
    }

    let storage_path = format!("audio/{}/{}.{}", user.user_id, Uuid::new_v4(), extension);
    state
        .supabase
        .upload_object(&storage_path, audio.clone(), "application/octet-stream")
        .await?;

    let transcript = state.openai.transcribe(&filename, audio).await?;

    let words = word_count(&transcript);
    if words < voice::MIN_SAMPLE_WORDS {
        // The original stays in storage for nothing; clean it up best-effort
        if let Err(e) = state.supabase.delete_object(&storage_path).await {
            tracing::warn!("Cleanup of {} failed: {}", storage_path, e);
        }
        return Err(ApiError::UnprocessableEntity(format!(
            "Transcript too short: {} words (minimum {})",
            words,
            voice::MIN_SAMPLE_WORDS
        )));
    }

    let title = if title.is_empty() { filename.clone() } else { title };

    let sample = state
        .postgres
        .insert_sample(
            user.user_id,
            SampleKind::Spoken,
            &title,
            &transcript,
            words,
            Some(&storage_path),
        )
        .await?;

    state
        .postgres
        .advance_funnel(user.user_id, FunnelStage::Samples)
        .await?;

    Ok(HttpResponse::Created().json(sample))
}

async fn list_samples(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let samples = state.postgres.list_samples(user.user_id).await?;
    Ok(HttpResponse::Ok().json(samples))
}

async fn delete_sample(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let source_file_id = state
        .postgres
        .delete_sample(user.user_id, path.into_inner())
        .await?;

    if let Some(storage_path) = source_file_id {
        if let Err(e) = state.supabase.delete_object(&storage_path).await {
            tracing::warn!("Audio cleanup of {} failed: {}", storage_path, e);
        }
    }

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_limit_boundary() {
        assert!(within_upload_limit(MAX_AUDIO_BYTES));
        assert!(!within_upload_limit(MAX_AUDIO_BYTES + 1));
    }

    #[test]
    fn test_upload_limit_counts_every_field() {
        // A request that smuggles most of its bytes outside the audio part
        // still trips the cap once the running total crosses it
        let mut total = 0;
        for field_bytes in [MAX_AUDIO_BYTES - 10, 6, 5] {
            total += field_bytes;
        }
        assert!(!within_upload_limit(total));
    }
}
