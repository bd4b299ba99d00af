//! Handlers for the three user actions. Each action runs to completion
//! against an explicit [`Session`] before the next one is dispatched.

use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::agent::{LlmError, VisionAdapter};
use crate::config::Config;
use crate::image::{ImageError, UploadedImage};
use crate::session::{Message, Session};

pub const IMAGE_REQUIRED_WARNING: &str = "Please upload an image before submitting a prompt.";

#[derive(Debug)]
pub enum Action {
    /// Current value of the upload control; `None` means no file selected.
    Upload(Option<UploadedImage>),
    Submit(String),
    Clear,
}

/// User-visible feedback produced while handling an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Notice {
    Warning { text: String },
    Toast { text: String, icon: String },
    Spinner { text: String },
}

impl Notice {
    fn warning(text: &str) -> Self {
        Notice::Warning {
            text: text.to_string(),
        }
    }

    fn toast(text: &str, icon: &str) -> Self {
        Notice::Toast {
            text: text.to_string(),
            icon: icon.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Notice::Warning { text } | Notice::Toast { text, .. } | Notice::Spinner { text } => {
                text
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    /// Empty prompt; nothing happened.
    Ignored,
    /// Submit without an image.
    Rejected,
    Answered { reply: String },
    ImageSet { name: String },
    ImageCleared,
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub outcome: Outcome,
    pub notices: Vec<Notice>,
}

impl ActionResult {
    fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            notices: Vec::new(),
        }
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Notice> {
        self.notices
            .iter()
            .filter(|n| matches!(n, Notice::Warning { .. }))
    }
}

#[derive(Clone)]
pub struct Controller {
    adapter: VisionAdapter,
    wait_delay: Duration,
}

impl Controller {
    pub fn new(adapter: VisionAdapter, wait_delay: Duration) -> Self {
        Self {
            adapter,
            wait_delay,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        Ok(Self::new(
            VisionAdapter::from_config(config)?,
            Duration::from_millis(config.ui.wait_delay_ms),
        ))
    }

    pub fn model_id(&self) -> &str {
        self.adapter.model_id()
    }

    pub async fn dispatch(
        &self,
        session: &mut Session,
        action: Action,
    ) -> Result<ActionResult, LlmError> {
        match action {
            Action::Upload(image) => Ok(self.upload(session, image)),
            Action::Submit(prompt) => self.submit(session, &prompt).await,
            Action::Clear => Ok(self.clear(session)),
        }
    }

    pub fn upload(&self, session: &mut Session, image: Option<UploadedImage>) -> ActionResult {
        match image {
            Some(image) => {
                info!(
                    name = %image.name,
                    width = image.width,
                    height = image.height,
                    "Image uploaded successfully."
                );
                let name = image.name.clone();
                session.set_image(Some(image));
                ActionResult::new(Outcome::ImageSet { name })
            }
            None => {
                info!("No image uploaded.");
                session.set_image(None);
                ActionResult::new(Outcome::ImageCleared)
            }
        }
    }

    /// Load `path` and make it the current image. A file that fails to
    /// load or decode leaves the session untouched.
    pub async fn upload_file(
        &self,
        session: &mut Session,
        path: &str,
    ) -> Result<ActionResult, ImageError> {
        let image = UploadedImage::load(path).await.map_err(|e| {
            warn!("Rejected upload {}: {}", path, e);
            e
        })?;
        Ok(self.upload(session, Some(image)))
    }

    /// Send `prompt` about the current image. On success exactly one user
    /// and one assistant message are appended; on a transport failure the
    /// session is left as it was before the call.
    pub async fn submit(
        &self,
        session: &mut Session,
        prompt: &str,
    ) -> Result<ActionResult, LlmError> {
        // Whitespace is a prompt; only an empty field is skipped
        if prompt.is_empty() {
            return Ok(ActionResult::new(Outcome::Ignored));
        }

        let Some(attachment) = session.current_image().map(UploadedImage::to_attachment) else {
            let mut result = ActionResult::new(Outcome::Rejected);
            result.notices.push(Notice::warning(IMAGE_REQUIRED_WARNING));
            result.notices.push(Notice::toast("Upload Image", "🖼"));
            return Ok(result);
        };

        let mut notices = vec![Notice::Spinner {
            text: "Wait for it...".to_string(),
        }];
        if !self.wait_delay.is_zero() {
            tokio::time::sleep(self.wait_delay).await;
        }
        notices.push(Notice::toast("Be Patience!", "⏳"));

        let before = session.len();
        session.append_message(Message::user(prompt));
        info!("User prompt submitted");

        let reply = match self.adapter.respond(&attachment, prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                session.truncate(before);
                return Err(e);
            }
        };

        session.append_message(Message::assistant(reply.clone()));
        info!("AI response received");

        Ok(ActionResult {
            outcome: Outcome::Answered { reply },
            notices,
        })
    }

    pub fn clear(&self, session: &mut Session) -> ActionResult {
        session.reset();
        info!("Session fully cleared.");
        let mut result = ActionResult::new(Outcome::Cleared);
        result
            .notices
            .push(Notice::toast("Chat history cleared!", "🧹"));
        result
    }
}
