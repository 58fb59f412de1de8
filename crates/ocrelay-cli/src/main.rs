//! ocrelay CLI
//!
//! Drives a local coding-agent backend from the terminal: checks and starts
//! the backend process, manages sessions and relays messages.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::info;

use ocrelay_bridge::Handlers;
use ocrelay_cli::{chat, output::write_chunks};
use ocrelay_core::Config;
use ocrelay_core::config::load_config;

#[derive(Parser, Debug)]
#[command(name = "ocrelay")]
#[command(version, about = "Relay chat messages to a local coding-agent backend", long_about = None)]
struct Cli {
    /// Settings file to load instead of the global one
    #[arg(long, global = true, env = "OCRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL (e.g. "http://127.0.0.1:4096")
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Backend basic-auth username
    #[arg(long, global = true)]
    username: Option<String>,

    /// Backend basic-auth password; auth is off when unset or empty
    #[arg(long, global = true)]
    password: Option<String>,

    /// Log level filter (e.g. "info", "debug", "warn").
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, global = true, env = "OCRELAY_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show backend port and health
    Status,
    /// Start the backend unless a healthy one is already running
    Start {
        /// Append backend output to this file
        #[arg(long)]
        log_path: Option<PathBuf>,
    },
    /// List backend sessions
    Sessions,
    /// Create a session and make it current
    New {
        /// Session title
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Relay one message and print the final reply
    Send {
        /// Message text; multiple words are joined with spaces
        #[arg(required = true)]
        text: Vec<String>,
        /// Session to send to instead of the first listed one
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Interactive chat on stdin, one message or /command per line
    Chat {
        /// Do not start the backend before reading input
        #[arg(long)]
        no_ensure: bool,
    },
}

fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(url) = &cli.base_url {
        config.backend.base_url.clone_from(url);
    }
    if let Some(username) = &cli.username {
        config.backend.username.clone_from(username);
    }
    if let Some(password) = &cli.password {
        config.backend.password = (!password.is_empty()).then(|| password.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level.clone_from(level);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    apply_cli_overrides(&mut config, &cli);

    let log_filter = format!(
        "ocrelay={0},ocrelay_cli={0},ocrelay_bridge={0},ocrelay_core={0}",
        config.log_level
    );
    ocrelay_core::tracing_init::init_tracing(&log_filter, cli.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.backend.base_url,
        auth = config.backend.password.is_some(),
        "Starting ocrelay"
    );

    let handlers = Handlers::from_config(&config)?;
    let max_chars = config.relay.max_message_len;
    let mut stdout = io::stdout();

    match cli.command {
        Commands::Status => writeln!(stdout, "{}", handlers.status().await)?,
        Commands::Start { log_path } => {
            let (ready, text) = handlers.start_backend(log_path.as_deref()).await;
            writeln!(stdout, "{text}")?;
            if !ready {
                stdout.flush()?;
                std::process::exit(1);
            }
        }
        Commands::Sessions => writeln!(stdout, "{}", handlers.session_list().await)?,
        Commands::New { title } => {
            writeln!(stdout, "{}", handlers.new_session(title.as_deref()).await)?;
        }
        Commands::Send { text, session } => {
            if let Some(id) = session {
                handlers.relay().switch_session(id).await;
            }
            let reply = handlers.message(&text.join(" ")).await;
            write_chunks(&mut stdout, &reply, max_chars)?;
        }
        Commands::Chat { no_ensure } => {
            if !no_ensure {
                let (_, text) = handlers.start_backend(None).await;
                writeln!(stdout, "{text}")?;
            }
            chat::run(
                &handlers,
                BufReader::new(tokio::io::stdin()),
                &mut stdout,
                max_chars,
            )
            .await?;
        }
    }

    Ok(())
}
