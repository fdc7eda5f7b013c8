//! Fixed-window overlapping text chunker.
//!
//! Splits raw text into windows of `window_chars` characters, each window
//! starting `window_chars - overlap_chars` after the previous one. The
//! overlap keeps information that straddles a window boundary retrievable
//! from both sides. Window length is tuned at ingestion time and is
//! independent of query-time behavior.

/// Split `text` into overlapping character windows.
///
/// Whitespace-only input produces no windows. `overlap` must be smaller than
/// `window` (enforced at config load).
pub fn split_windows(text: &str, window: usize, overlap: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = trimmed.chars().collect();
    let step = window - overlap;
    let mut windows = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + window).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    windows
}
