//! Backend HTTP integration.
//!
//! Provides a reqwest-based client for the backend's REST surface,
//! covering health, session listing/creation, and message sending.

mod client;
pub mod types;


pub use client::{BackendClient, BackendError};
pub use types::{Health, MessagePart, MessageResponse, Session, extract_final_text};
