//! Display of keys and values that may be longer than their column:
//! truncated to one line, or broken across several when expanded.

use std::borrow::Cow;

const ELLIPSIS: char = '…';

/// Cut `text` to at most `max_chars` characters, ending in an ellipsis
/// when anything was dropped. Line breaks are flattened to spaces.
pub fn truncate(text: &str, max_chars: usize) -> Cow<'_, str> {
    let flat: Cow<'_, str> = if text.contains(['\n', '\r']) {
        Cow::Owned(text.replace(['\n', '\r'], " "))
    } else {
        Cow::Borrowed(text)
    };

    if flat.chars().count() <= max_chars {
        return flat;
    }
    if max_chars == 0 {
        return Cow::Borrowed("");
    }

    let mut out: String = flat.chars().take(max_chars - 1).collect();
    out.push(ELLIPSIS);
    Cow::Owned(out)
}

/// Break `text` into lines of at most `width` characters. Line breaks in
/// the input are flattened first; always yields at least one line.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let flat = text.replace(['\n', '\r'], " ");
    if width == 0 || flat.is_empty() {
        return vec![flat];
    }

    let chars: Vec<char> = flat.chars().collect();
    chars.chunks(width).map(|chunk| chunk.iter().collect()).collect()
}
