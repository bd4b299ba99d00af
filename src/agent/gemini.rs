//! Google Gemini `generateContent` provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::agent::llm_error::LlmError;
use crate::agent::providers::{ImageAttachment, ModelReply, VisionModel};

pub struct GeminiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    /// `api_key` may be absent: the provider is then unconfigured and every
    /// call fails with a configuration error.
    pub fn new(
        api_key: Option<&str>,
        base_url: &str,
        model: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, LlmError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            api_key: api_key.filter(|k| !k.is_empty()).map(str::to_string),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl VisionModel for GeminiProvider {
    async fn generate(
        &self,
        image: &ImageAttachment,
        prompt: &str,
    ) -> Result<ModelReply, LlmError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            LlmError::ConfigError(
                "Gemini API key is not configured (set GOOGLE_GEMINI_AI_KEY)".to_string(),
            )
        })?;

        let request = build_request(image, prompt);
        debug!("POST {} ({} image bytes b64)", self.endpoint(), image.data.len());

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(error_from_status(status.as_u16(), &body));
        }

        Ok(parse_reply(&body))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Image part first, then the prompt, as a single user turn.
fn build_request(image: &ImageAttachment, prompt: &str) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![
                GeminiPart::InlineData {
                    inline_data: GeminiBlob {
                        mime_type: image.media_type.clone(),
                        data: image.data.clone(),
                    },
                },
                GeminiPart::Text {
                    text: prompt.to_string(),
                },
            ],
        }],
    }
}

/// A body that does not parse, has no candidates, or carries no text yields
/// an empty reply rather than an error.
fn parse_reply(body: &str) -> ModelReply {
    let response: GeminiResponse = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => {
            warn!("Unparsable Gemini response: {}", e);
            return ModelReply::empty();
        }
    };

    let Some(candidate) = response.candidates.into_iter().next() else {
        if let Some(feedback) = response.prompt_feedback {
            warn!("Gemini returned no candidates: {}", feedback);
        }
        return ModelReply::empty();
    };

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        ModelReply::empty()
    } else {
        ModelReply::text(text)
    }
}

fn error_from_status(status: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<GeminiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        429 => LlmError::RateLimit(message),
        _ => LlmError::ProviderError { status, message },
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    InlineData { inline_data: GeminiBlob },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct GeminiBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}
