use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::core::{
    check_affiliate_code, check_discount_code, check_referral_code, CodeKind, CodeRejection,
};
use crate::error::ApiError;
use crate::models::{CodeValidationResponse, ValidateCodeQuery};
use crate::routes::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/codes/validate", web::get().to(validate_code));
}

fn valid(kind: CodeKind, percent_off: i32) -> CodeValidationResponse {
    CodeValidationResponse {
        valid: true,
        kind: Some(kind),
        percent_off: Some(percent_off),
        reason: None,
    }
}

fn invalid(rejection: CodeRejection) -> CodeValidationResponse {
    CodeValidationResponse {
        valid: false,
        kind: None,
        percent_off: None,
        reason: Some(rejection.reason().to_string()),
    }
}

/// Pre-checkout code validation
///
/// GET /api/v1/codes/validate?code=LAUNCH20
///
/// Checks the discount, referral and affiliate tables in that order. The
/// endpoint is public, so the self-referral rule is re-checked at checkout.
async fn validate_code(
    state: web::Data<AppState>,
    query: web::Query<ValidateCodeQuery>,
) -> Result<HttpResponse, ApiError> {
    let code = query.code.trim();
    if code.is_empty() {
        return Ok(HttpResponse::Ok().json(invalid(CodeRejection::NotFound)));
    }

    if let Some(discount) = state.postgres.get_discount_code(code).await? {
        let body = match check_discount_code(&discount, chrono::Utc::now()) {
            Ok(percent) => valid(CodeKind::Discount, percent),
            Err(rejection) => invalid(rejection),
        };
        return Ok(HttpResponse::Ok().json(body));
    }

    if let Some(referral) = state.postgres.get_referral_code(code).await? {
        // No caller identity here; Uuid::nil() never matches a real owner
        let body = match check_referral_code(&referral, Uuid::nil()) {
            Ok(percent) => valid(CodeKind::Referral, percent),
            Err(rejection) => invalid(rejection),
        };
        return Ok(HttpResponse::Ok().json(body));
    }

    if let Some(affiliate) = state.postgres.get_affiliate_by_code(code).await? {
        let body = match check_affiliate_code(&affiliate, Uuid::nil()) {
            Ok(percent) => valid(CodeKind::Affiliate, percent),
            Err(rejection) => invalid(rejection),
        };
        return Ok(HttpResponse::Ok().json(body));
    }

    Ok(HttpResponse::Ok().json(invalid(CodeRejection::NotFound)))
}
