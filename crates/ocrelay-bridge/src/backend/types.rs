//! Backend request and response types.
//!
//! Serde structs matching the backend's JSON bodies. Only the fields the
//! relay needs are modelled; anything else in a response is ignored.

use serde::{Deserialize, Serialize};

/// Part kind carrying user-visible text.
pub const TEXT_PART: &str = "text";

/// `GET /health` response.
#[derive(Debug, Clone, Deserialize)]
pub struct Health {
    pub healthy: bool,
    #[serde(default)]
    pub version: Option<String>,
}

/// A backend-managed conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Session {
    /// Title for display, or `(untitled)`.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => "(untitled)",
        }
    }
}

/// One unit of a message, sent or received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePart {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl MessagePart {
    /// A text-kind part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: TEXT_PART.to_string(),
            text: Some(text.into()),
        }
    }
}

/// `POST /session` body. The title is omitted when absent so the backend
/// applies its own default.
#[derive(Debug, Default, Serialize)]
pub(crate) struct CreateSessionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
}

/// `POST /session/{id}/message` body.
#[derive(Debug, Serialize)]
pub(crate) struct SendMessageRequest {
    pub parts: Vec<MessagePart>,
}

/// `POST /session/{id}/message` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl MessageResponse {
    /// The user-facing result of this response.
    pub fn final_text(&self) -> String {
        extract_final_text(&self.parts)
    }
}

/// Pick the final answer out of a reply.
///
/// Only text-kind parts that carry text count; the last of them wins and is
/// trimmed. Earlier text parts are intermediate output and are dropped. No
/// qualifying part yields an empty string.
pub fn extract_final_text(parts: &[MessagePart]) -> String {
    parts
        .iter()
        .filter(|p| p.kind == TEXT_PART)
        .filter_map(|p| p.text.as_deref())
        .next_back()
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}
