//! Shared tracing/logging initialization.
//!
//! Logs go to stderr: stdout belongs to the replies the CLI prints.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_filter` when it is set and valid. With
/// `log_json` each event is one JSON line. Returns `false` when a subscriber
/// was already installed; the existing one is left in place.
pub fn init_tracing(default_filter: &str, log_json: bool) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if log_json {
        registry.with(fmt_layer.json()).try_init()
    } else {
        registry.with(fmt_layer).try_init()
    };
    installed.is_ok()
}
