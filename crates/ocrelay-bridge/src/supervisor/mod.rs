//! Backend process supervision.
//!
//! Makes sure the backend answers its health check before any session
//! traffic. A down backend is an expected state, never an error: every
//! failure resolves to a [`Readiness`] the caller can display.

pub mod host;
pub mod launcher;
pub mod manager;
pub mod probe;

pub use host::{BackendHost, SystemHost};
pub use manager::{ProcessStatus, Readiness, Supervisor, SupervisorSettings};
pub use probe::PortStatus;

/// Errors from launching the backend process.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SupervisorError {
    #[error("backend executable not found: {program} (is it installed and on PATH?)")]
    SpawnFailed { program: String },

    #[error("failed to start backend: {reason}")]
    Spawn { reason: String },
}
