use actix_web::{web, HttpResponse};

use crate::auth::AuthUser;
use crate::core::{validate_answers, FunnelStage};
use crate::error::ApiError;
use crate::models::QuestionnaireRequest;
use crate::routes::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/questionnaire", web::get().to(get_questionnaire))
        .route("/questionnaire", web::put().to(put_questionnaire));
}

async fn get_questionnaire(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let response = state
        .postgres
        .get_questionnaire(user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Questionnaire not completed yet".to_string()))?;

    Ok(HttpResponse::Ok().json(response))
}

/// Submit (or re-submit) the voice questionnaire
///
/// PUT /api/v1/questionnaire
async fn put_questionnaire(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<QuestionnaireRequest>,
) -> Result<HttpResponse, ApiError> {
    validate_answers(&req.answers).map_err(ApiError::UnprocessableEntity)?;

    let answers = serde_json::to_value(&req.answers).map_err(|e| {
        tracing::error!("Failed to serialize answers: {}", e);
        ApiError::Internal
    })?;

    let response = state
        .postgres
        .upsert_questionnaire(user.user_id, &answers)
        .await?;

    state
        .postgres
        .advance_funnel(user.user_id, FunnelStage::Questionnaire)
        .await?;

    Ok(HttpResponse::Ok().json(response))
}
