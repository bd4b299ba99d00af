use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::agent::gemini::GeminiProvider;
use crate::agent::llm_error::LlmError;
use crate::agent::providers::{ImageAttachment, MockVisionModel, VisionModel};
use crate::config::Config;

/// Assistant text used when the model answers without any text.
pub const INVALID_RESPONSE: &str = "Error: Invalid response from Gemini Vision API.";

/// Build the model named by `gemini.model`. `mock/*` names select the
/// offline mock, everything else goes to Gemini.
pub fn create_model(config: &Config) -> Result<Arc<dyn VisionModel>, LlmError> {
    let model = config.gemini.model.as_str();
    if model.starts_with("mock/") {
        return Ok(Arc::new(MockVisionModel::new(model)));
    }

    let api_key = config.gemini_api_key();
    if api_key.is_some() {
        info!("Gemini API key configured.");
    } else {
        warn!("No Gemini API key found; requests to {} will fail", model);
    }

    let provider = GeminiProvider::new(
        api_key.as_deref(),
        &config.gemini.base_url,
        model,
        config.gemini.timeout_secs.map(Duration::from_secs),
    )?;
    Ok(Arc::new(provider))
}

/// What the adapter made of a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterReply {
    Text(String),
    Invalid,
}

impl AdapterReply {
    /// Flatten into chat content; `Invalid` becomes [`INVALID_RESPONSE`].
    pub fn into_content(self) -> String {
        match self {
            AdapterReply::Text(text) => text,
            AdapterReply::Invalid => INVALID_RESPONSE.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct VisionAdapter {
    model: Arc<dyn VisionModel>,
}

impl VisionAdapter {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self { model }
    }

    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        Ok(Self::new(create_model(config)?))
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// Ask the model about `image`. A reply without text is mapped to
    /// [`INVALID_RESPONSE`]; only transport and provider failures are `Err`.
    pub async fn respond(&self, image: &ImageAttachment, prompt: &str) -> Result<String, LlmError> {
        Ok(self.respond_tagged(image, prompt).await?.into_content())
    }

    pub async fn respond_tagged(
        &self,
        image: &ImageAttachment,
        prompt: &str,
    ) -> Result<AdapterReply, LlmError> {
        let start = Instant::now();
        let reply = self.model.generate(image, prompt).await.map_err(|e| {
            error!("Gemini Vision API call failed: {}", e);
            e
        })?;

        match reply.text {
            Some(text) if !text.trim().is_empty() => {
                info!(
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Gemini Vision API called successfully."
                );
                Ok(AdapterReply::Text(text))
            }
            _ => {
                error!("Invalid response from Gemini Vision API.");
                Ok(AdapterReply::Invalid)
            }
        }
    }
}
