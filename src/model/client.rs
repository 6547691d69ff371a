use std::future::Future;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Settings;
use crate::input::Credential;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },

    #[error("response missing field: {field}")]
    MissingField { field: &'static str },

    #[error("response format error: {0}")]
    ResponseFormat(String),
}

/// One single-turn completion: a user prompt plus sampling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
}

/// Anything that turns a prompt into text. The orchestrator only sees this.
pub trait TextProvider {
    fn generate_text(
        &self,
        credential: &Credential,
        request: &TextRequest,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: settings.openai_base_url.clone(),
        }
    }

    async fn post_json<T: Serialize>(
        &self,
        url: &str,
        bearer_token: &str,
        body: &T,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .http_client
            .post(url)
            .bearer_auth(bearer_token)
            .json(body)
            .send()
            .await?;
        ensure_success(response).await
    }
}

impl TextProvider for OpenAiProvider {
    async fn generate_text(
        &self,
        credential: &Credential,
        request: &TextRequest,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let provider_request = OpenAiChatRequest::from_text_request(request);

        debug!(
            url = %url,
            model = %request.model,
            prompt_chars = request.prompt.chars().count(),
            "sending chat request to openai"
        );

        let response = self
            .post_json(&url, credential.expose(), &provider_request)
            .await?;
        let payload: OpenAiChatResponse = response.json().await?;
        let choice = payload
            .choices
            .first()
            .ok_or(ProviderError::MissingField {
                field: "choices[0]",
            })?;

        let content = choice
            .message
            .content
            .as_ref()
            .and_then(extract_openai_content_text)
            .ok_or_else(|| {
                ProviderError::ResponseFormat(
                    "unable to extract assistant content from OpenAI response".to_owned(),
                )
            })?;

        Ok(content.trim().to_owned())
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error response body>".to_owned());
    Err(ProviderError::HttpStatus { status, body })
}

fn extract_openai_content_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(text) => Some(text.to_owned()),
        serde_json::Value::Array(parts) => {
            let mut output = String::new();
            for part in parts {
                if let Some(text) = part.get("text").and_then(|text| text.as_str()) {
                    if !output.is_empty() {
                        output.push('\n');
                    }
                    output.push_str(text);
                }
            }

            if output.trim().is_empty() {
                None
            } else {
                Some(output)
            }
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct ProviderMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<ProviderMessage>,
    temperature: f32,
}

impl OpenAiChatRequest {
    fn from_text_request(request: &TextRequest) -> Self {
        Self {
            model: request.model.clone(),
            messages: vec![ProviderMessage {
                role: "user",
                content: request.prompt.clone(),
            }],
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<serde_json::Value>,
}
