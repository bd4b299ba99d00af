//! Per-user interaction state: the current image and the conversation log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::image::UploadedImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Where a session stands; derived from its contents, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Empty,
    ImageLoaded,
    /// The log is non-empty. The image may have been removed since.
    Conversing,
}

#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    started_at: DateTime<Utc>,
    current_image: Option<UploadedImage>,
    conversation: Vec<Message>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            current_image: None,
            conversation: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn current_image(&self) -> Option<&UploadedImage> {
        self.current_image.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.current_image.is_some()
    }

    pub fn conversation(&self) -> &[Message] {
        &self.conversation
    }

    pub fn len(&self) -> usize {
        self.conversation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversation.is_empty()
    }

    pub fn state(&self) -> SessionState {
        if !self.conversation.is_empty() {
            SessionState::Conversing
        } else if self.current_image.is_some() {
            SessionState::ImageLoaded
        } else {
            SessionState::Empty
        }
    }

    /// Replace the current image; `None` clears it. The log is untouched.
    pub fn set_image(&mut self, image: Option<UploadedImage>) {
        self.current_image = image;
    }

    pub fn append_message(&mut self, message: Message) {
        self.conversation.push(message);
    }

    /// Drop messages past `len`. Used to undo a submit that failed midway.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.conversation.truncate(len);
    }

    pub fn reset(&mut self) {
        self.current_image = None;
        self.conversation.clear();
    }
}
