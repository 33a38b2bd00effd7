//! Cursor- and selection-aware edit operations.
//!
//! These are stateless functions over a [`TextBuffer`] so every editor
//! flavour (raw, table, form) shares the same behaviour.

use crate::error::EditorError;
use crate::validate::syntax_error;

use super::buffer::{LineColumn, TextBuffer};

/// Two spaces stand in for a tab so the document never gains tab characters.
pub const INDENT: &str = "  ";

/// How long an error highlight stays visible.
pub const ERROR_HIGHLIGHT_MS: u64 = 5_000;

/// Splice `text` over the current selection; the cursor lands after it.
pub fn insert_snippet(buffer: &mut TextBuffer, text: &str) -> usize {
    buffer.replace_selection(text)
}

/// Tab key handling.
pub fn indent(buffer: &mut TextBuffer) -> usize {
    buffer.replace_selection(INDENT)
}

/// Select the interior of the quoted string surrounding `offset`.
///
/// Returns `false` (leaving the selection alone) when `offset` is not inside
/// a non-empty quoted span, so the caller can fall back to word selection.
pub fn select_quoted_text_at(buffer: &mut TextBuffer, offset: usize) -> bool {
    let text = buffer.text();
    match quoted_span_at(&text, offset) {
        Some((start, end)) => {
            buffer.set_selection(start, end);
            true
        }
        None => false,
    }
}

/// Find the interior byte range of the quoted span around `offset`.
///
/// Quotes are paired from the start of the text, so an offset on either
/// quote of a string belongs to that string and an offset between two
/// strings belongs to neither.
pub fn quoted_span_at(text: &str, offset: usize) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let offset = offset.min(bytes.len());

    let mut open = None;
    for (idx, &byte) in bytes.iter().enumerate() {
        if byte != b'"' || is_escaped(bytes, idx) {
            continue;
        }
        match open.take() {
            None if idx > offset => return None,
            None => open = Some(idx),
            Some(first) if offset <= idx => {
                let start = first + 1;
                return (idx > start).then_some((start, idx));
            }
            Some(_) => {}
        }
    }
    None
}

/// Select the run of word characters around `offset`.
pub fn select_word_at(buffer: &mut TextBuffer, offset: usize) -> bool {
    let text = buffer.text();
    let offset = offset.min(text.len());
    let is_word = |c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '.';
    let start = text[..offset]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_word(*c))
        .last()
        .map_or(offset, |(i, _)| i);
    let end = text[offset..]
        .char_indices()
        .find(|(_, c)| !is_word(*c))
        .map_or(text.len(), |(i, _)| offset + i);
    if start == end {
        return false;
    }
    buffer.set_selection(start, end);
    true
}

/// A quote is escaped when preceded by an odd run of backslashes.
fn is_escaped(bytes: &[u8], idx: usize) -> bool {
    let run = bytes[..idx]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count();
    run % 2 == 1
}

/// Pretty-print the document with 2-space indentation.
///
/// Returns `Ok(true)` when the text changed, `Ok(false)` when it was already
/// formatted. A document that does not parse is left untouched.
pub fn format_document(buffer: &mut TextBuffer) -> Result<bool, EditorError> {
    let text = buffer.text();
    let value: serde_json::Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(err) => return Err(syntax_error(buffer, &err.to_string())),
    };
    let formatted = serde_json::to_string_pretty(&value)
        .map_err(|err| EditorError::Serialization(err.to_string()))?;
    if formatted == text {
        return Ok(false);
    }
    let cursor = buffer.cursor_line_column();
    buffer.splice(0, buffer.len(), &formatted);
    let offset = buffer.line_column_to_offset(cursor.line, cursor.column);
    buffer.set_cursor(offset);
    Ok(true)
}

/// A transient one-character highlight over an error position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorHighlight {
    pub position: LineColumn,
    pub offset: usize,
    expires_at_ms: u64,
}

impl ErrorHighlight {
    pub const fn is_active(&self, now_ms: u64) -> bool {
        now_ms < self.expires_at_ms
    }

    /// The 0-based line the view should scroll to.
    pub const fn scroll_line(&self) -> usize {
        self.position.line.saturating_sub(1)
    }
}

/// Select the character at `(line, column)` and return a highlight that
/// expires after [`ERROR_HIGHLIGHT_MS`].
pub fn highlight_error_location(
    buffer: &mut TextBuffer,
    line: usize,
    column: usize,
    now_ms: u64,
) -> ErrorHighlight {
    let offset = buffer.line_column_to_offset(line, column);
    let end = buffer
        .slice(offset, buffer.len())
        .chars()
        .next()
        .map_or(offset, |c| offset + c.len_utf8());
    buffer.set_selection(offset, end);
    ErrorHighlight {
        position: buffer.offset_to_line_column(offset),
        offset,
        expires_at_ms: now_ms + ERROR_HIGHLIGHT_MS,
    }
}
