use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Errors surfaced by route handlers, mapped onto conventional status codes.
///
/// Every variant renders the same JSON body shape so API clients can handle
/// failures uniformly. Internal detail is logged, never returned.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Gone(String),

    #[error("{0}")]
    PaymentRequired(String),

    #[error("{0}")]
    UnprocessableEntity(String),

    #[error("{0}")]
    TooManyRequests(String),

    #[error("{0}")]
    UpstreamFailure(String),

    #[error("internal error")]
    Internal,
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_failed",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Gone(_) => "gone",
            ApiError::PaymentRequired(_) => "payment_required",
            ApiError::UnprocessableEntity(_) => "unprocessable",
            ApiError::TooManyRequests(_) => "rate_limited",
            ApiError::UpstreamFailure(_) => "upstream_failure",
            ApiError::Internal => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Gone(_) => StatusCode::GONE,
            ApiError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

impl From<crate::services::PostgresError> for ApiError {
    fn from(err: crate::services::PostgresError) -> Self {
        match err {
            crate::services::PostgresError::NotFound(msg) => ApiError::NotFound(msg),
            other => {
                tracing::error!("Database error: {}", other);
                ApiError::Internal
            }
        }
    }
}

impl From<crate::services::SupabaseError> for ApiError {
    fn from(err: crate::services::SupabaseError) -> Self {
        tracing::error!("Supabase error: {}", err);
        ApiError::UpstreamFailure("platform request failed".to_string())
    }
}

impl From<crate::services::StripeError> for ApiError {
    fn from(err: crate::services::StripeError) -> Self {
        tracing::error!("Stripe error: {}", err);
        ApiError::UpstreamFailure("payment provider request failed".to_string())
    }
}

impl From<crate::services::OpenAiError> for ApiError {
    fn from(err: crate::services::OpenAiError) -> Self {
        tracing::error!("OpenAI error: {}", err);
        ApiError::UpstreamFailure("language model request failed".to_string())
    }
}
