use reqwest::multipart;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with the language-model API
#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Language-model API client for profile generation, the testing playground
/// and audio transcription
pub struct OpenAiClient {
    api_base: String,
    api_key: String,
    chat_model: String,
    transcription_model: String,
    client: Client,
}

impl OpenAiClient {
    pub fn new(
        api_base: String,
        api_key: String,
        chat_model: String,
        transcription_model: String,
        request_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(request_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            chat_model,
            transcription_model,
            client,
        }
    }

    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    /// One-shot chat completion; returns the first choice's content
    pub async fn chat_completion(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, OpenAiError> {
        let url = format!("{}/v1/chat/completions", self.api_base);

        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Chat completion failed: {} - {}", status, body);
            return Err(OpenAiError::ApiError(format!(
                "Completion failed: {}",
                status
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| OpenAiError::InvalidResponse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| OpenAiError::InvalidResponse("Empty choices".to_string()))
    }

    /// Transcribe an uploaded audio file to text
    pub async fn transcribe(
        &self,
        filename: &str,
        audio: Vec<u8>,
    ) -> Result<String, OpenAiError> {
        let url = format!("{}/v1/audio/transcriptions", self.api_base);

        let file_part = multipart::Part::bytes(audio)
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| OpenAiError::InvalidResponse(e.to_string()))?;

        let form = multipart::Form::new()
            .text("model", self.transcription_model.clone())
            .part("file", file_part);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OpenAiError::ApiError(format!(
                "Transcription failed: {}",
                response.status()
            )));
        }

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| OpenAiError::InvalidResponse(e.to_string()))?;

        Ok(body.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::Server) -> OpenAiClient {
        OpenAiClient::new(
            server.url(),
            "sk-test".to_string(),
            "gpt-4o".to_string(),
            "whisper-1".to_string(),
            30,
        )
    }

    #[tokio::test]
    async fn test_chat_completion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "A warm voice."}}]}"#)
            .create_async()
            .await;

        let reply = client_for(&server)
            .chat_completion("You are a style analyst.", "Describe this voice.")
            .await
            .unwrap();
        assert_eq!(reply, "A warm voice.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_chat_completion_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body(r#"{"error": {"message": "rate limited"}}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .chat_completion("sys", "user")
            .await
            .unwrap_err();
        assert!(matches!(err, OpenAiError::ApiError(_)));
    }

    #[tokio::test]
    async fn test_chat_completion_empty_choices() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .chat_completion("sys", "user")
            .await
            .unwrap_err();
        assert!(matches!(err, OpenAiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_transcription_multipart() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/audio/transcriptions")
            .match_header(
                "content-type",
                mockito::Matcher::Regex("multipart/form-data.*".to_string()),
            )
            .with_status(200)
            .with_body(r#"{"text": "hello from my voice memo"}"#)
            .create_async()
            .await;

        let text = client_for(&server)
            .transcribe("memo.mp3", vec![0u8; 16])
            .await
            .unwrap();
        assert_eq!(text, "hello from my voice memo");
        mock.assert_async().await;
    }
}
