use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::llm_error::LlmError;

/// Base64-encoded image ready to be sent inline to a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub data: String,
    pub media_type: String,
}

/// Raw reply from a vision model. `text` is absent when the response carried
/// no usable textual content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub text: Option<String>,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn empty() -> Self {
        Self { text: None }
    }
}

/// A remote multimodal capability: one image plus one prompt in, a reply out.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn generate(&self, image: &ImageAttachment, prompt: &str)
        -> Result<ModelReply, LlmError>;

    fn model_id(&self) -> &str;
}

/// Offline stand-in selected with `mock/*` model names.
///
/// `mock/invalid` answers without text, anything else echoes the prompt.
pub struct MockVisionModel {
    model: String,
}

impl MockVisionModel {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl VisionModel for MockVisionModel {
    async fn generate(
        &self,
        image: &ImageAttachment,
        prompt: &str,
    ) -> Result<ModelReply, LlmError> {
        if self.model == "mock/invalid" {
            return Ok(ModelReply::empty());
        }
        Ok(ModelReply::text(format!(
            "Mock response: {} ({})",
            prompt, image.media_type
        )))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment() -> ImageAttachment {
        ImageAttachment {
            data: "iVBORw0KGgo=".to_string(),
            media_type: "image/png".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mock_echoes_prompt() {
        let model = MockVisionModel::new("mock/test");
        let reply = model.generate(&attachment(), "What is this?").await.unwrap();
        assert_eq!(
            reply.text.as_deref(),
            Some("Mock response: What is this? (image/png)")
        );
        assert_eq!(model.model_id(), "mock/test");
    }

    #[tokio::test]
    async fn test_mock_invalid_has_no_text() {
        let model = MockVisionModel::new("mock/invalid");
        let reply = model.generate(&attachment(), "hello").await.unwrap();
        assert_eq!(reply, ModelReply::empty());
    }
}
