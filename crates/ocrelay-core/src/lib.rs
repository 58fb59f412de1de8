//! `ocrelay` Core Library
//!
//! Shared functionality for `ocrelay` components:
//! - Configuration resolution and hierarchy
//! - Fixed-width chunking of replies for size-limited transports
//! - Tracing initialisation
//! - Common error types

pub mod chunk;
pub mod config;
pub mod error;
pub mod tracing_init;

pub use chunk::chunk_text;
pub use config::Config;
pub use error::{Error, Result};
