//! ocrelay Bridge Library
//!
//! Transport-agnostic control logic shared by every chat front-end:
//! - HTTP client for the backend's REST surface
//! - Process supervisor that keeps the backend running and healthy
//! - Session relay owning the single current-session cursor
//! - Command parsing and display-ready handlers for front-ends

pub mod backend;
pub mod command;
pub mod endpoint;
pub mod handlers;
pub mod relay;
pub mod supervisor;

pub use backend::{BackendClient, BackendError};
pub use command::Command;
pub use endpoint::Endpoint;
pub use handlers::Handlers;
pub use relay::{Relay, SessionCursor};
pub use supervisor::{BackendHost, Readiness, Supervisor, SystemHost};
