pub mod client;
pub mod gemini;
pub mod llm_error;
pub mod providers;

pub use client::{create_model, AdapterReply, VisionAdapter, INVALID_RESPONSE};
pub use gemini::GeminiProvider;
pub use llm_error::LlmError;
pub use providers::{ImageAttachment, MockVisionModel, ModelReply, VisionModel};
