//! ocrelay CLI library: terminal front-end over the bridge handlers.

pub mod chat;
pub mod output;
