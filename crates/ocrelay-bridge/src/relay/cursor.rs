//! The current-session cursor.

use tokio::sync::{Mutex, MutexGuard};

/// One mutable slot holding zero or one session id.
///
/// The referenced session may have been deleted on the backend since it was
/// stored; nothing here re-validates it.
#[derive(Debug, Default)]
pub struct SessionCursor {
    current: Mutex<Option<String>>,
}

impl SessionCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current session id, if any.
    pub async fn current(&self) -> Option<String> {
        self.current.lock().await.clone()
    }

    /// Overwrite the current session id.
    pub async fn set(&self, session_id: String) {
        *self.current.lock().await = Some(session_id);
    }

    /// Hold the cursor for a read-then-maybe-write step. Other callers wait
    /// until the guard drops and then observe whatever was written.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, Option<String>> {
        self.current.lock().await
    }
}
