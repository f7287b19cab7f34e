use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with the hosted platform
#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Auth code exchange rejected: {0}")]
    AuthRejected(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Session returned by the auth code exchange
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: AuthUserInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUserInfo {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
struct SignedUrlRequest {
    #[serde(rename = "expiresIn")]
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

/// Supabase platform client
///
/// Covers the two platform surfaces the service uses:
/// - auth code exchange on login callbacks
/// - object storage for audio originals and voice profile artifacts
pub struct SupabaseClient {
    base_url: String,
    service_role_key: String,
    bucket: String,
    client: Client,
}

impl SupabaseClient {
    pub fn new(base_url: String, service_role_key: String, bucket: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_role_key,
            bucket,
            client,
        }
    }

    fn auth_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
    }

    /// Exchange a login callback code for a session
    pub async fn exchange_auth_code(&self, code: &str) -> Result<AuthSession, SupabaseError> {
        let url = format!("{}/auth/v1/token?grant_type=authorization_code", self.base_url);

        let response = self
            .auth_headers(self.client.post(&url))
            .json(&serde_json::json!({ "auth_code": code }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Auth code exchange failed: {} - {}", status, body);
            return Err(SupabaseError::AuthRejected(status.to_string()));
        }

        let session: AuthSession = response
            .json()
            .await
            .map_err(|e| SupabaseError::InvalidResponse(e.to_string()))?;

        Ok(session)
    }

    /// Upload an object into the artifact bucket; returns the storage path
    pub async fn upload_object(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, SupabaseError> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, path
        );

        let response = self
            .auth_headers(self.client.post(&url))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SupabaseError::ApiError(format!(
                "Upload failed for {}: {}",
                path,
                response.status()
            )));
        }

        tracing::debug!("Uploaded object {} to bucket {}", path, self.bucket);

        Ok(path.to_string())
    }

    /// Create a short-lived signed URL for an object
    pub async fn create_signed_url(
        &self,
        path: &str,
        expires_in_secs: u64,
    ) -> Result<String, SupabaseError> {
        let url = format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.base_url, self.bucket, path
        );

        let response = self
            .auth_headers(self.client.post(&url))
            .json(&SignedUrlRequest {
                expires_in: expires_in_secs,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SupabaseError::ApiError(format!(
                "Signing failed for {}: {}",
                path,
                response.status()
            )));
        }

        let body: SignedUrlResponse = response
            .json()
            .await
            .map_err(|e| SupabaseError::InvalidResponse(e.to_string()))?;

        // The sign endpoint returns a path relative to /storage/v1
        Ok(format!("{}/storage/v1{}", self.base_url, body.signed_url))
    }

    /// Best-effort object deletion
    pub async fn delete_object(&self, path: &str) -> Result<(), SupabaseError> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, path
        );

        let response = self.auth_headers(self.client.delete(&url)).send().await?;

        if !response.status().is_success() {
            return Err(SupabaseError::ApiError(format!(
                "Delete failed for {}: {}",
                path,
                response.status()
            )));
        }

        Ok(())
    }
}
