use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when sending transactional email
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    text: &'a str,
}

/// Transactional email client
///
/// With an empty API key the client runs in no-op mode and only logs, so
/// development and tests need no email infrastructure. All sends are
/// best-effort from the caller's perspective.
pub struct EmailClient {
    api_base: String,
    api_key: String,
    from_address: String,
    support_inbox: String,
    client: Client,
}

impl EmailClient {
    pub fn new(
        api_base: String,
        api_key: String,
        from_address: String,
        support_inbox: String,
    ) -> Self {
        if api_key.trim().is_empty() {
            tracing::warn!("Email API key not configured; email client in no-op mode");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            from_address,
            support_inbox,
            client,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), EmailError> {
        if !self.is_enabled() {
            tracing::info!("Email (no-op) to {}: {}", to, subject);
            return Ok(());
        }

        let url = format!("{}/emails", self.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&SendRequest {
                from: &self.from_address,
                to: vec![to],
                subject,
                text,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EmailError::ApiError(format!(
                "Send failed: {}",
                response.status()
            )));
        }

        tracing::debug!("Sent email to {}: {}", to, subject);

        Ok(())
    }

    pub async fn send_welcome(&self, to: &str) -> Result<(), EmailError> {
        self.send(
            to,
            "Welcome to My Voice Twin",
            "Thanks for joining the list. We'll let you know when your voice twin is ready to build.",
        )
        .await
    }

    pub async fn send_receipt(
        &self,
        to: &str,
        tier_name: &str,
        amount_cents: i64,
    ) -> Result<(), EmailError> {
        let body = format!(
            "Your {} purchase is confirmed.\n\nAmount: ${}.{:02}\n\nHead back to the studio to generate your voice profile.",
            tier_name,
            amount_cents / 100,
            amount_cents % 100
        );
        self.send(to, "Your VoiceDNA purchase", &body).await
    }

    /// Notify the support inbox about a new ticket
    pub async fn notify_support(
        &self,
        ticket_id: &str,
        subject: &str,
    ) -> Result<(), EmailError> {
        let inbox = self.support_inbox.clone();
        let body = format!("New support ticket {}:\n\n{}", ticket_id, subject);
        self.send(&inbox, "New support ticket", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_mode_without_key() {
        let client = EmailClient::new(
            "https://api.resend.test".to_string(),
            String::new(),
            "VoiceDNA <hello@voicedna.app>".to_string(),
            "support@voicedna.app".to_string(),
        );

        assert!(!client.is_enabled());
        // No server behind the base URL; a no-op send must still succeed
        client.send_welcome("reader@example.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_receipt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/emails")
            .match_header("authorization", "Bearer re_test")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"to": ["buyer@example.com"], "subject": "Your VoiceDNA purchase"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"id": "email_1"}"#)
            .create_async()
            .await;

        let client = EmailClient::new(
            server.url(),
            "re_test".to_string(),
            "VoiceDNA <hello@voicedna.app>".to_string(),
            "support@voicedna.app".to_string(),
        );

        client
            .send_receipt("buyer@example.com", "Essential", 4_165)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_surfaces_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/emails")
            .with_status(422)
            .with_body(r#"{"message": "invalid from"}"#)
            .create_async()
            .await;

        let client = EmailClient::new(
            server.url(),
            "re_test".to_string(),
            "bad-from".to_string(),
            "support@voicedna.app".to_string(),
        );

        assert!(client.send_welcome("x@example.com").await.is_err());
    }
}
