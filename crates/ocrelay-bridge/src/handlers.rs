//! Display-ready handlers for front-end commands.
//!
//! Every handler returns plain text for the front-end to deliver as-is
//! (split with [`ocrelay_core::chunk_text`] where the transport caps message
//! size). Failures come back as text too; nothing here returns an error.

use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;

use ocrelay_core::Config;

use crate::backend::{BackendClient, BackendError};
use crate::command::Command;
use crate::relay::{Relay, SessionCursor};
use crate::supervisor::{BackendHost, Readiness, Supervisor, SystemHost};

/// Sent by front-ends right after accepting a message, since a reply can
/// take minutes.
pub const ACK_TEXT: &str = "Received, working…";

/// Usage text for `/start` and `/help`.
pub const HELP_TEXT: &str = "Send any message and it is forwarded to the backend; only the final result is returned.\n\
/session lists sessions, /use <id> switches, /new [title] starts a new session, \
/status shows the backend, /launch starts it.";

/// Length of the id prefix shown in session lists.
const SHORT_ID_CHARS: usize = 8;

/// Command handlers over one relay and one supervisor.
#[derive(Debug)]
pub struct Handlers<H = SystemHost> {
    relay: Relay,
    supervisor: Supervisor<H>,
}

impl Handlers<SystemHost> {
    /// Wire a client, an empty cursor, a relay and a supervisor from config.
    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        let client = Arc::new(BackendClient::new(&config.backend)?);
        let relay = Relay::new(Arc::clone(&client), Arc::new(SessionCursor::new()));
        let supervisor = Supervisor::from_config(client, config);
        Ok(Self::new(relay, supervisor))
    }
}

impl<H: BackendHost> Handlers<H> {
    pub const fn new(relay: Relay, supervisor: Supervisor<H>) -> Self {
        Self { relay, supervisor }
    }

    pub const fn relay(&self) -> &Relay {
        &self.relay
    }

    pub const fn supervisor(&self) -> &Supervisor<H> {
        &self.supervisor
    }

    /// Run a parsed command and return its reply.
    pub async fn execute(&self, command: Command) -> String {
        match command {
            Command::Help => HELP_TEXT.to_string(),
            Command::SessionList => self.session_list().await,
            Command::NewSession { title } => self.new_session(title.as_deref()).await,
            Command::Status => self.status().await,
            Command::StartBackend => self.start_backend(None).await.1,
            Command::Switch { session_id } => self.switch_session(&session_id).await,
            Command::Message(text) => self.message(&text).await,
        }
    }

    /// Sessions as `• <id prefix>… <title>`, marking the current one.
    pub async fn session_list(&self) -> String {
        let sessions = match self.relay.list_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => return format!("Failed to list sessions: {e}"),
        };
        if sessions.is_empty() {
            return "No sessions yet; send any message to create one.".to_string();
        }

        let current = self.relay.current_session().await;
        let mut out = String::from("Sessions (use /use <id> to switch):");
        for session in &sessions {
            let short: String = session.id.chars().take(SHORT_ID_CHARS).collect();
            let mark = if current.as_deref() == Some(session.id.as_str()) {
                " [current]"
            } else {
                ""
            };
            let _ = write!(out, "\n• {short}… {}{mark}", session.display_title());
        }
        out
    }

    /// Create a session and make it current.
    pub async fn new_session(&self, title: Option<&str>) -> String {
        match self.relay.new_session(title).await {
            Ok(_) => "Switched to a new session.".to_string(),
            Err(e) => format!("Failed to create session: {e}"),
        }
    }

    /// Switch to `session_id`, naming it by title when the backend knows it.
    ///
    /// The switch happens even for ids the backend does not list; a bad id
    /// shows up as an error on the next message.
    pub async fn switch_session(&self, session_id: &str) -> String {
        let sessions = match self.relay.list_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => return format!("Switch failed: {e}"),
        };
        let title = sessions
            .iter()
            .find(|s| s.id == session_id)
            .map_or("(untitled)", |s| s.display_title())
            .to_string();
        self.relay.switch_session(session_id).await;
        format!("Switched to session: {title}")
    }

    /// Backend port and health.
    pub async fn status(&self) -> String {
        self.supervisor.status().await.to_string()
    }

    /// Start the backend if needed; returns readiness and a message.
    pub async fn start_backend(&self, log_path: Option<&Path>) -> (bool, String) {
        let outcome: Readiness = self.supervisor.ensure_running(None, log_path).await;
        (outcome.is_ready(), format!("Backend: {outcome}"))
    }

    /// Relay a user message; see [`Relay::handle_message`].
    pub async fn message(&self, text: &str) -> String {
        self.relay.handle_message(text).await
    }
}
