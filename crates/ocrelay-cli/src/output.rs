//! Reply output.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use ocrelay_core::chunk_text;

/// Write `text` as chunks of at most `max_chars` characters, separated by a
/// blank line, the way a capped chat transport would deliver it.
pub fn write_chunks(out: &mut impl Write, text: &str, max_chars: usize) -> io::Result<()> {
    for (i, chunk) in chunk_text(text, max_chars).iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{chunk}")?;
    }
    Ok(())
}
