//! Chat command parsing shared by all front-ends.
//!
//! Only the handful of relay commands below are intercepted. Any other text,
//! including unknown slash commands, goes to the backend unchanged since the
//! backend has slash commands of its own.

/// A parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`, `/help`
    Help,
    /// `/session`, `/sessions`
    SessionList,
    /// `/new [title]`
    NewSession { title: Option<String> },
    /// `/opencode`, `/status`
    Status,
    /// `/launch`
    StartBackend,
    /// `/use <id>`
    Switch { session_id: String },
    /// Anything else.
    Message(String),
}

impl Command {
    /// Parse one line of user input. Whitespace-only input yields `None`.
    ///
    /// A `@botname` suffix on the command word is ignored, as group chats
    /// append it.
    pub fn parse(input: &str) -> Option<Self> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }
        let Some(body) = text.strip_prefix('/') else {
            return Some(Self::Message(text.to_string()));
        };

        let (word, rest) = body
            .split_once(char::is_whitespace)
            .map_or((body, ""), |(w, r)| (w, r.trim()));
        let name = word.split('@').next().unwrap_or(word).to_ascii_lowercase();
        let arg = (!rest.is_empty()).then(|| rest.to_string());

        let command = match name.as_str() {
            "start" | "help" => Self::Help,
            "session" | "sessions" => Self::SessionList,
            "new" => Self::NewSession { title: arg },
            "opencode" | "status" => Self::Status,
            "launch" => Self::StartBackend,
            "use" => match arg {
                Some(session_id) => Self::Switch { session_id },
                None => Self::SessionList,
            },
            _ => Self::Message(text.to_string()),
        };
        Some(command)
    }
}
