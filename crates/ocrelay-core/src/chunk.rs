//! Fixed-width splitting of long replies.
//!
//! Transports such as Telegram cap a single message at a few thousand
//! characters. Replies are cut into consecutive slices of at most
//! `max_chars` code points, with no regard for word or line boundaries.

/// Default chunk size, matching the Telegram message limit.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 4096;

/// Split `text` into ordered slices of at most `max_chars` code points.
///
/// Empty input yields no chunks. Concatenating the result reproduces the
/// input exactly; every chunk but the last holds exactly `max_chars` code
/// points. A `max_chars` of zero is treated as one.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let max_chars = max_chars.max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(text[start..idx].to_string());
            start = idx;
            count = 0;
        }
        count += 1;
    }
    chunks.push(text[start..].to_string());
    chunks
}
