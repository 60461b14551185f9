//! Text segmentation for long outbound messages.
//!
//! The platform caps a single text message at [`MAX_TEXT_LENGTH`] characters.
//! [`split_text`] cuts longer text into ordered chunks under that cap,
//! preferring paragraph boundaries so the cuts land where a reader expects
//! them. Chunks are pure cuts: concatenating them reproduces the input
//! exactly.

use crate::foundation::error::{MessageError, MessageResult};

/// Maximum length of a single text message, in characters.
pub const MAX_TEXT_LENGTH: usize = 4096;

/// Splits `text` into ordered chunks of at most `max_len` characters.
///
/// Cut preference within each window: the last paragraph break (`"\n\n"`),
/// then the last newline, then the last space, then a hard cut at `max_len`.
/// The separator stays at the end of the earlier chunk, so the chunks
/// concatenate back to `text` unchanged.
///
/// # Errors
///
/// [`MessageError::EmptyInput`] if `text` is empty.
pub fn split_text(text: &str, max_len: usize) -> MessageResult<Vec<String>> {
    if text.is_empty() {
        return Err(MessageError::EmptyInput);
    }
    debug_assert!(max_len > 0);

    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let (chunk, remainder) = split_once(rest, max_len);
        chunks.push(chunk.to_owned());
        rest = remainder;
    }
    Ok(chunks)
}

/// Cuts one chunk of at most `max_len` characters off the front of `text`.
pub(crate) fn split_once(text: &str, max_len: usize) -> (&str, &str) {
    if text.chars().count() <= max_len {
        return (text, "");
    }

    // Byte offset of the hard cut, on a char boundary.
    let hard_cut = text
        .char_indices()
        .nth(max_len)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let window = &text[..hard_cut];

    let cut = find_boundary(window, "\n\n")
        .or_else(|| find_boundary(window, "\n"))
        .or_else(|| find_boundary(window, " "))
        .unwrap_or(hard_cut);

    text.split_at(cut)
}

/// Byte offset just past the last occurrence of `sep` in `window`, ignoring a
/// match at the very start (which would produce an empty chunk).
fn find_boundary(window: &str, sep: &str) -> Option<usize> {
    match window.rfind(sep) {
        Some(0) => None,
        Some(i) => Some(i + sep.len()),
        None => None,
    }
}
