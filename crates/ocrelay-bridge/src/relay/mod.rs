//! Session/message relay.
//!
//! Owns the single process-wide "current session" cursor shared by every
//! front-end, forwards user text to the backend and turns the structured
//! reply into display text.

pub mod cursor;
pub mod pipeline;

pub use cursor::SessionCursor;
pub use pipeline::{NO_TEXT_RESULT, Relay};
