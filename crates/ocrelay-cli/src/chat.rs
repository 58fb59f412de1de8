//! Interactive chat loop.
//!
//! Reads one command or message per line and prints the reply. All lines go
//! through the same handlers, so they share one current session.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use ocrelay_bridge::handlers::ACK_TEXT;
use ocrelay_bridge::{BackendHost, Command, Handlers};

use crate::output::write_chunks;

/// Run until `input` reaches end of file.
pub async fn run<H, R, W>(
    handlers: &Handlers<H>,
    input: R,
    out: &mut W,
    max_chars: usize,
) -> anyhow::Result<()>
where
    H: BackendHost,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = Command::parse(&line) else {
            continue;
        };
        debug!(?command, "Chat input");
        if matches!(command, Command::Message(_)) {
            writeln!(out, "{ACK_TEXT}")?;
            out.flush()?;
        }
        let reply = handlers.execute(command).await;
        write_chunks(out, &reply, max_chars)?;
        out.flush()?;
    }
    Ok(())
}
