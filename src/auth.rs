use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::AppState;

/// Audience the hosted auth service stamps on end-user access tokens
const USER_AUDIENCE: &str = "authenticated";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Invalid Authorization scheme, expected Bearer")]
    InvalidScheme,

    #[error("Invalid or expired token")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid user ID in token")]
    InvalidSubject,
}

/// Claims carried by a hosted-auth access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub aud: String,
    pub exp: i64,
    #[serde(default)]
    pub role: Option<String>,
}

/// Verifies HS256 access tokens against the platform JWT secret
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[USER_AUDIENCE]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify a bearer token and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

/// Authenticated caller, extracted from the Authorization header
///
/// Handlers take this as a parameter to require a valid session; extraction
/// failure short-circuits into a 401 JSON response.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

fn authenticate(req: &HttpRequest, verifier: &JwtVerifier) -> Result<AuthUser, AuthError> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MissingHeader)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidScheme)?;

    let claims = verifier.verify(token)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidSubject)?;

    Ok(AuthUser {
        user_id,
        email: claims.email,
    })
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            tracing::error!("AppState not registered for {}", req.path());
            return ready(Err(ApiError::Internal));
        };

        ready(authenticate(req, &state.auth).map_err(|e| {
            tracing::debug!("Authentication failed on {}: {}", req.path(), e);
            ApiError::Unauthorized(e.to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-jwt-secret";

    fn make_token(sub: &str, aud: &str, exp_offset_secs: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            email: Some("user@example.com".to_string()),
            aud: aud.to_string(),
            exp: (Utc::now() + Duration::seconds(exp_offset_secs)).timestamp(),
            role: Some("authenticated".to_string()),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_valid_token() {
        let verifier = JwtVerifier::new(SECRET);
        let user_id = Uuid::new_v4();
        let token = make_token(&user_id.to_string(), "authenticated", 3600);

        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email.as_deref(), Some("user@example.com"));
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        let verifier = JwtVerifier::new(SECRET);
        let token = make_token(&Uuid::new_v4().to_string(), "authenticated", -3600);

        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_verify_rejects_wrong_audience() {
        let verifier = JwtVerifier::new(SECRET);
        let token = make_token(&Uuid::new_v4().to_string(), "service_role", 3600);

        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let verifier = JwtVerifier::new("a-different-secret");
        let token = make_token(&Uuid::new_v4().to_string(), "authenticated", 3600);

        assert!(verifier.verify(&token).is_err());
    }
}
