//! Message relay pipeline over the shared session cursor.
//!
//! Data flow:
//! ```text
//! user text → cursor (adopt/create session) → POST /session/{id}/message
//! reply parts → last text part, trimmed → display text
//! ```

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::cursor::SessionCursor;
use crate::backend::{BackendClient, BackendError, Session};

/// Shown instead of silence when the backend returned no text.
pub const NO_TEXT_RESULT: &str = "(no text result)";

/// Forwards user text to the backend through the current session.
#[derive(Debug, Clone)]
pub struct Relay {
    client: Arc<BackendClient>,
    cursor: Arc<SessionCursor>,
}

impl Relay {
    pub const fn new(client: Arc<BackendClient>, cursor: Arc<SessionCursor>) -> Self {
        Self { client, cursor }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// The current session id, if one has been chosen.
    pub async fn current_session(&self) -> Option<String> {
        self.cursor.current().await
    }

    /// Return the current session, adopting or creating one on first use.
    ///
    /// A populated cursor is returned as-is. Otherwise the first session the
    /// backend lists is adopted (the list has no ordering guarantee), or a new
    /// one is created when there are none. The cursor stays locked for the
    /// whole step, so concurrent first calls create at most one session.
    pub async fn get_or_create_session(&self) -> Result<String, BackendError> {
        let mut current = self.cursor.lock().await;
        if let Some(id) = current.as_ref() {
            return Ok(id.clone());
        }

        let sessions = self.client.list_sessions().await?;
        let id = if let Some(first) = sessions.into_iter().next() {
            debug!(session_id = %first.id, "Adopting first listed session");
            first.id
        } else {
            let created = self.client.create_session(None).await?;
            info!(session_id = %created.id, "Created session for first message");
            created.id
        };
        *current = Some(id.clone());
        Ok(id)
    }

    /// Make `session_id` current without checking that it exists.
    ///
    /// A bad id surfaces as `RequestFailed` on the next send.
    pub async fn switch_session(&self, session_id: impl Into<String>) {
        let session_id = session_id.into();
        debug!(session_id = %session_id, "Switching current session");
        self.cursor.set(session_id).await;
    }

    /// Create a session and make it current.
    pub async fn new_session(&self, title: Option<&str>) -> Result<Session, BackendError> {
        let mut current = self.cursor.lock().await;
        let session = self.client.create_session(title).await?;
        info!(session_id = %session.id, "Switched to new session");
        *current = Some(session.id.clone());
        Ok(session)
    }

    /// All sessions, in backend order.
    pub async fn list_sessions(&self) -> Result<Vec<Session>, BackendError> {
        self.client.list_sessions().await
    }

    /// Send `text` through the current session and return the final text,
    /// which may be empty.
    pub async fn send(&self, text: &str) -> Result<String, BackendError> {
        let session_id = self.get_or_create_session().await?;
        debug!(session_id = %session_id, chars = text.chars().count(), "Relaying message");
        self.client.send_message(&session_id, text).await
    }

    /// Relay `text` and return display text. Never fails: errors come back as
    /// a readable message and an empty result as [`NO_TEXT_RESULT`].
    pub async fn handle_message(&self, text: &str) -> String {
        match self.send(text).await {
            Ok(result) if result.is_empty() => NO_TEXT_RESULT.to_string(),
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Relaying message failed");
                format!("Backend call failed: {e}")
            }
        }
    }
}
