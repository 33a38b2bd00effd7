//! Mapping parser messages and JSON pointers back to document offsets.

use std::sync::OnceLock;

use regex::Regex;

use crate::editor::TextBuffer;

use super::Position;

fn position_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"position (\d+)").expect("static position pattern"))
}

fn line_column_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"line (\d+),? column (\d+)").expect("static line/column pattern")
    })
}

/// Resolve a position from a parser error message.
///
/// `position N` (a byte offset) wins over `line L column C`; a message with
/// neither resolves to the first character. Parser columns count bytes, so
/// they are converted through an offset to get a character column.
pub fn parse_error_position(buffer: &TextBuffer, message: &str) -> Position {
    if let Some(caps) = position_pattern().captures(message)
        && let Ok(offset) = caps[1].parse::<usize>()
    {
        return position_at(buffer, offset);
    }
    if let Some(caps) = line_column_pattern().captures(message)
        && let (Ok(line), Ok(column)) = (caps[1].parse::<usize>(), caps[2].parse::<usize>())
    {
        let line_idx = line
            .saturating_sub(1)
            .min(buffer.line_count().saturating_sub(1));
        let line_start = buffer.line_start(line_idx);
        let line_end = line_start + buffer.line_at(line_idx).map_or(0, |l| l.len());
        let offset = (line_start + column.saturating_sub(1)).min(line_end);
        return position_at(buffer, offset);
    }
    Position {
        line: 1,
        column: 1,
        offset: 0,
    }
}

pub fn position_at(buffer: &TextBuffer, offset: usize) -> Position {
    let lc = buffer.offset_to_line_column(offset);
    Position {
        line: lc.line,
        column: lc.column,
        offset: buffer.line_column_to_offset(lc.line, lc.column),
    }
}

/// Split an RFC 6901 pointer into unescaped segments.
pub fn pointer_segments(pointer: &str) -> Vec<String> {
    pointer
        .strip_prefix('/')
        .map(|rest| {
            rest.split('/')
                .map(|seg| seg.replace("~1", "/").replace("~0", "~"))
                .collect()
        })
        .unwrap_or_default()
}

/// Dotted display path for a pointer: `/a/0/b` becomes `a.0.b`.
pub fn pointer_to_path(pointer: &str) -> String {
    pointer_segments(pointer).join(".")
}

/// Offset of the first textual `"key":` occurrence, just past the colon and
/// any whitespace (where the value starts).
pub fn first_key_occurrence(text: &str, key: &str) -> Option<usize> {
    let pattern = format!(r#""{}"\s*:\s*"#, regex::escape(key));
    Regex::new(&pattern).ok()?.find(text).map(|m| m.end())
}

/// Offset where the value addressed by `pointer` starts, found by walking
/// the document structure. Expects syntactically valid JSON.
pub fn locate_pointer(text: &str, pointer: &str) -> Option<usize> {
    let segments = pointer_segments(pointer);
    let mut scanner = Scanner {
        text,
        bytes: text.as_bytes(),
        pos: 0,
    };
    scanner.find(&segments)
}

struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, byte: u8) -> Option<()> {
        self.skip_ws();
        (self.peek() == Some(byte)).then(|| self.pos += 1)
    }

    /// Skip a string starting at the current quote; returns its raw text.
    fn string(&mut self) -> Option<&'a str> {
        let start = self.pos;
        if self.peek() != Some(b'"') {
            return None;
        }
        self.pos += 1;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'\\' => self.pos += 1,
                b'"' => return self.text.get(start..self.pos),
                _ => {}
            }
        }
        None
    }

    fn skip_value(&mut self) -> Option<()> {
        self.skip_ws();
        match self.peek()? {
            b'"' => self.string().map(|_| ()),
            b'{' | b'[' => {
                let mut depth = 0usize;
                loop {
                    match self.peek()? {
                        b'"' => {
                            self.string()?;
                            continue;
                        }
                        b'{' | b'[' => depth += 1,
                        b'}' | b']' => {
                            depth -= 1;
                            if depth == 0 {
                                self.pos += 1;
                                return Some(());
                            }
                        }
                        _ => {}
                    }
                    self.pos += 1;
                }
            }
            _ => {
                while !matches!(
                    self.peek(),
                    None | Some(b',' | b'}' | b']' | b' ' | b'\t' | b'\n' | b'\r')
                ) {
                    self.pos += 1;
                }
                Some(())
            }
        }
    }

    fn find(&mut self, segments: &[String]) -> Option<usize> {
        self.skip_ws();
        let Some((segment, rest)) = segments.split_first() else {
            return Some(self.pos);
        };
        match self.peek()? {
            b'{' => {
                self.pos += 1;
                // serde_json keeps the last of duplicate keys.
                let mut last_match = None;
                loop {
                    self.skip_ws();
                    if self.peek()? == b'}' {
                        break;
                    }
                    let raw = self.string()?;
                    let key: String = serde_json::from_str(raw).ok()?;
                    self.eat(b':')?;
                    self.skip_ws();
                    if key == *segment {
                        last_match = Some(self.pos);
                    }
                    self.skip_value()?;
                    self.skip_ws();
                    if self.peek()? == b',' {
                        self.pos += 1;
                    }
                }
                self.pos = last_match?;
                self.find(rest)
            }
            b'[' => {
                let index: usize = segment.parse().ok()?;
                self.pos += 1;
                let mut current = 0;
                loop {
                    self.skip_ws();
                    if self.peek()? == b']' {
                        return None;
                    }
                    if current == index {
                        return self.find(rest);
                    }
                    self.skip_value()?;
                    self.eat(b',')?;
                    current += 1;
                }
            }
            _ => None,
        }
    }
}
