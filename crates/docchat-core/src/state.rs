//! UI-agnostic conversation state.
//!
//! A [`Session`] lives as long as one UI session. Its history only grows:
//! messages are appended and never edited or removed.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::LoadedDocument;
use crate::error::{ServiceError, ValidationError};
use crate::generator::render_reply;

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Default)]
pub struct Session {
    history: Vec<ChatMessage>,
    loading: bool,
    document: Option<LoadedDocument>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn document(&self) -> Option<&LoadedDocument> {
        self.document.as_ref()
    }

    /// Replaces any previously uploaded document.
    pub fn attach_document(&mut self, document: LoadedDocument) {
        self.document = Some(document);
    }

    pub fn clear_document(&mut self) {
        self.document = None;
    }

    /// Record the user's message and return the query to send.
    ///
    /// Rejected submissions leave the session untouched. Only the empty
    /// string counts as empty; whitespace is sent as typed.
    pub fn begin_submission(&mut self, input: &str) -> Result<String, ValidationError> {
        if input.is_empty() {
            return Err(ValidationError::EmptyInput);
        }
        if self.loading {
            return Err(ValidationError::RequestPending);
        }

        self.history.push(ChatMessage::user(input));
        self.loading = true;

        let query = match &self.document {
            Some(doc) => format!("{}\nDocument context: {}", input, doc.text),
            None => input.to_string(),
        };
        debug!(history = self.history.len(), with_document = self.document.is_some(), "submission started");
        Ok(query)
    }

    /// Record the assistant's reply, or the rendered error, and leave the
    /// loading state.
    pub fn finish_submission(&mut self, result: Result<String, ServiceError>) {
        self.history.push(ChatMessage::assistant(render_reply(result)));
        self.loading = false;
    }
}
