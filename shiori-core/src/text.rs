//! Character-level text helpers
//!
//! All offsets in this crate count Unicode scalar values of *clean* text:
//! entity-decoded, with every whitespace character removed. Byte offsets never
//! leave this module.

use std::borrow::Cow;

use quick_xml::escape::{resolve_html5_entity, unescape_with};

/// Decode HTML character references.
///
/// Unknown named references and bare ampersands are kept verbatim so that
/// cleaning never loses characters the reader can see.
pub fn decode_entities(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    if let Ok(decoded) = unescape_with(raw, resolve_html5_entity) {
        return decoded;
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        // References are short; anything longer is a literal ampersand.
        let semi = tail.char_indices().take(32).find(|&(_, c)| c == ';');
        let decoded = semi.and_then(|(end, _)| {
            let reference = &rest[amp..amp + end + 2];
            unescape_with(reference, resolve_html5_entity)
                .ok()
                .map(|c| (end, c))
        });
        match decoded {
            Some((end, c)) => {
                out.push_str(&c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Remove every whitespace character (ASCII, ideographic, no-break).
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Decode entities and strip whitespace in one go.
pub fn clean(raw: &str) -> String {
    strip_whitespace(&decode_entities(raw))
}

/// Length in characters
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// The first `n` characters of `text`
pub fn prefix_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

/// Characters `[start, end)` of `text`, clamped to its length
pub fn slice_chars(text: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    let mut indices = text.char_indices().map(|(i, _)| i).chain([text.len()]);
    let from = indices.nth(start).unwrap_or(text.len());
    let to = indices.nth(end - start - 1).unwrap_or(text.len());
    &text[from..to]
}

/// Character index of the first occurrence of `needle` in `haystack`
pub fn find_chars(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .find(needle)
        .map(|byte| haystack[..byte].chars().count())
}

/// A window of up to `radius` characters on each side of `center`.
pub fn snippet_around(text: &str, center: usize, radius: usize) -> &str {
    let len = char_len(text);
    let center = center.min(len);
    slice_chars(text, center.saturating_sub(radius), (center + radius).min(len))
}
