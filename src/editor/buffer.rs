use ropey::Rope;

/// A selected byte range in the document. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    /// A collapsed selection (plain cursor) at `offset`.
    pub const fn caret(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub const fn len(&self) -> usize {
        self.end - self.start
    }
}

/// A 1-based line/column pair. Columns count characters, so a tab is one
/// column wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

impl LineColumn {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Direction for cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// The document text, backed by a rope.
///
/// The rope doubles as the line index used for offset <-> line/column
/// conversion. All offsets are byte offsets, clamped to the document length
/// and snapped down to the nearest character boundary.
pub struct TextBuffer {
    rope: Rope,
    selection: Selection,
    /// Remembered column for vertical movement (sticky column), 0-based chars.
    col_memory: Option<usize>,
    dirty: bool,
    revision: u64,
}

impl TextBuffer {
    /// Create a new buffer from a string.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            selection: Selection::default(),
            col_memory: None,
            dirty: false,
            revision: 0,
        }
    }

    /// Create an empty buffer.
    pub fn empty() -> Self {
        Self::from_text("")
    }

    /// The full text content of the buffer.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Length of the document in bytes.
    pub fn len(&self) -> usize {
        self.rope.len_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_bytes() == 0
    }

    /// True when the document is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.rope.chars().all(char::is_whitespace)
    }

    /// Whether the buffer has been edited since creation, reset or save.
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the buffer as clean (e.g., after saving).
    pub const fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Incremented on every mutation; used to detect stale derived state.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Total number of lines in the buffer.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Get the content of a line (0-based, without trailing newline).
    pub fn line_at(&self, line_idx: usize) -> Option<String> {
        if line_idx >= self.rope.len_lines() {
            return None;
        }
        let s = self.rope.line(line_idx).to_string();
        Some(s.trim_end_matches('\n').to_string())
    }

    /// Byte offset where a line (0-based) starts.
    pub fn line_start(&self, line_idx: usize) -> usize {
        let line_idx = line_idx.min(self.rope.len_lines().saturating_sub(1));
        self.rope.line_to_byte(line_idx)
    }

    /// Number of characters on a line (0-based), excluding the newline.
    pub fn line_len_chars(&self, line_idx: usize) -> usize {
        if line_idx >= self.rope.len_lines() {
            return 0;
        }
        let line = self.rope.line(line_idx);
        let len = line.len_chars();
        if len > 0 && line.char(len - 1) == '\n' {
            len - 1
        } else {
            len
        }
    }

    /// Text between two byte offsets.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let start = self.snap(start);
        let end = self.snap(end).max(start);
        self.rope
            .byte_slice(start..end)
            .to_string()
    }

    // --- Line index ---

    /// Convert a byte offset to a 1-based line/column.
    pub fn offset_to_line_column(&self, offset: usize) -> LineColumn {
        let offset = self.snap(offset);
        let line_idx = self.rope.byte_to_line(offset);
        let col = self.rope.byte_to_char(offset) - self.rope.line_to_char(line_idx);
        LineColumn::new(line_idx + 1, col + 1)
    }

    /// Convert a 1-based line/column to a byte offset.
    ///
    /// Out-of-range lines clamp to the last line; out-of-range columns clamp
    /// to the end of the line.
    pub fn line_column_to_offset(&self, line: usize, column: usize) -> usize {
        let line_idx = line
            .saturating_sub(1)
            .min(self.rope.len_lines().saturating_sub(1));
        let col = column.saturating_sub(1).min(self.line_len_chars(line_idx));
        let char_idx = self.rope.line_to_char(line_idx) + col;
        self.rope.char_to_byte(char_idx)
    }

    // --- Selection ---

    pub const fn selection(&self) -> Selection {
        self.selection
    }

    /// The cursor is the end of the selection.
    pub const fn cursor(&self) -> usize {
        self.selection.end
    }

    pub fn cursor_line_column(&self) -> LineColumn {
        self.offset_to_line_column(self.selection.end)
    }

    /// Select a byte range; bounds are clamped and ordered.
    pub fn set_selection(&mut self, start: usize, end: usize) {
        let a = self.snap(start);
        let b = self.snap(end);
        self.selection = Selection {
            start: a.min(b),
            end: a.max(b),
        };
        self.col_memory = None;
    }

    /// Collapse the selection to a cursor at `offset`.
    pub fn set_cursor(&mut self, offset: usize) {
        self.set_selection(offset, offset);
    }

    // --- Mutation ---

    /// Replace the whole document. The selection resets to the start and the
    /// buffer is considered clean.
    pub fn reset(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.selection = Selection::default();
        self.col_memory = None;
        self.dirty = false;
        self.revision += 1;
    }

    /// Replace the byte range `start..end` with `text` and place the cursor
    /// after the inserted text. Returns the new cursor offset.
    pub fn splice(&mut self, start: usize, end: usize, text: &str) -> usize {
        let a = self.snap(start);
        let b = self.snap(end);
        let (start, end) = (a.min(b), a.max(b));
        if start == end && text.is_empty() {
            return start;
        }
        let start_char = self.rope.byte_to_char(start);
        let end_char = self.rope.byte_to_char(end);
        if end_char > start_char {
            self.rope.remove(start_char..end_char);
        }
        self.rope.insert(start_char, text);
        let cursor = start + text.len();
        self.selection = Selection::caret(cursor);
        self.col_memory = None;
        self.dirty = true;
        self.revision += 1;
        cursor
    }

    /// Replace the current selection with `text`.
    pub fn replace_selection(&mut self, text: &str) -> usize {
        let Selection { start, end } = self.selection;
        self.splice(start, end, text)
    }

    /// Insert a character at the cursor, replacing any selection.
    pub fn insert_char(&mut self, ch: char) {
        let mut tmp = [0u8; 4];
        self.replace_selection(ch.encode_utf8(&mut tmp));
    }

    /// Delete the selection, or the character before the cursor (Backspace).
    ///
    /// Returns `true` if anything was deleted.
    pub fn delete_back(&mut self) -> bool {
        if !self.selection.is_empty() {
            self.replace_selection("");
            return true;
        }
        let cursor = self.selection.end;
        if cursor == 0 {
            return false;
        }
        let prev = self.prev_boundary(cursor);
        self.splice(prev, cursor, "");
        true
    }

    /// Delete the selection, or the character at the cursor (Delete).
    ///
    /// Returns `true` if anything was deleted.
    pub fn delete_forward(&mut self) -> bool {
        if !self.selection.is_empty() {
            self.replace_selection("");
            return true;
        }
        let cursor = self.selection.end;
        if cursor >= self.len() {
            return false;
        }
        let next = self.next_boundary(cursor);
        self.splice(cursor, next, "");
        true
    }

    // --- Cursor movement ---

    /// Move the cursor in the given direction, collapsing any selection.
    pub fn move_cursor(&mut self, direction: Direction) {
        match direction {
            Direction::Left => self.move_left(),
            Direction::Right => self.move_right(),
            Direction::Up => self.move_vertical(false),
            Direction::Down => self.move_vertical(true),
        }
    }

    /// Move cursor to the beginning of the line (Home).
    pub fn move_home(&mut self) {
        let line_idx = self.rope.byte_to_line(self.selection.end);
        self.set_cursor(self.rope.line_to_byte(line_idx));
    }

    /// Move cursor to the end of the line (End).
    pub fn move_end(&mut self) {
        let lc = self.cursor_line_column();
        let offset = self.line_column_to_offset(lc.line, usize::MAX);
        self.set_cursor(offset);
    }

    /// Move cursor to the start of the buffer (Ctrl+Home).
    pub fn move_to_start(&mut self) {
        self.set_cursor(0);
    }

    /// Move cursor to the end of the buffer (Ctrl+End).
    pub fn move_to_end(&mut self) {
        self.set_cursor(self.len());
    }

    // --- Private helpers ---

    fn snap(&self, offset: usize) -> usize {
        let offset = offset.min(self.rope.len_bytes());
        self.rope.char_to_byte(self.rope.byte_to_char(offset))
    }

    fn prev_boundary(&self, offset: usize) -> usize {
        let char_idx = self.rope.byte_to_char(offset);
        self.rope.char_to_byte(char_idx.saturating_sub(1))
    }

    fn next_boundary(&self, offset: usize) -> usize {
        let char_idx = self.rope.byte_to_char(offset);
        self.rope
            .char_to_byte((char_idx + 1).min(self.rope.len_chars()))
    }

    fn move_left(&mut self) {
        if self.selection.is_empty() {
            let prev = self.prev_boundary(self.selection.end);
            self.set_cursor(prev);
        } else {
            self.set_cursor(self.selection.start);
        }
    }

    fn move_right(&mut self) {
        if self.selection.is_empty() {
            let next = self.next_boundary(self.selection.end);
            self.set_cursor(next);
        } else {
            self.set_cursor(self.selection.end);
        }
    }

    fn move_vertical(&mut self, down: bool) {
        let lc = self.cursor_line_column();
        let memory = self.col_memory.unwrap_or(lc.column - 1);
        let target_line = if down {
            if lc.line >= self.line_count() {
                return;
            }
            lc.line + 1
        } else {
            if lc.line <= 1 {
                return;
            }
            lc.line - 1
        };
        let offset = self.line_column_to_offset(target_line, memory + 1);
        self.set_cursor(offset);
        self.col_memory = Some(memory);
    }
}

impl std::fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBuffer")
            .field(
                "rope",
                &format_args!("Rope({} lines)", self.rope.len_lines()),
            )
            .field("selection", &self.selection)
            .field("dirty", &self.dirty)
            .field("revision", &self.revision)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // --- Construction and basic queries ---

    #[test]
    fn test_empty_buffer_has_one_line() {
        let buf = TextBuffer::empty();
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.line_at(0), Some(String::new()));
        assert!(buf.is_blank());
    }

    #[test]
    fn test_from_text_preserves_content() {
        let buf = TextBuffer::from_text("{\n  \"a\": 1\n}");
        assert_eq!(buf.line_count(), 3);
        assert_eq!(buf.line_at(1), Some("  \"a\": 1".to_string()));
        assert_eq!(buf.text(), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_whitespace_only_is_blank() {
        assert!(TextBuffer::from_text(" \n\t ").is_blank());
        assert!(!TextBuffer::from_text(" x ").is_blank());
    }

    #[test]
    fn test_carriage_return_does_not_break_lines() {
        let buf = TextBuffer::from_text("a\rb\nc");
        assert_eq!(buf.line_count(), 2);
    }

    // --- Line index ---

    #[test]
    fn test_offset_to_line_column_first_char() {
        let buf = TextBuffer::from_text("ab\ncd");
        assert_eq!(buf.offset_to_line_column(0), LineColumn::new(1, 1));
    }

    #[test]
    fn test_offset_to_line_column_after_newline() {
        let buf = TextBuffer::from_text("ab\ncd");
        assert_eq!(buf.offset_to_line_column(3), LineColumn::new(2, 1));
        assert_eq!(buf.offset_to_line_column(5), LineColumn::new(2, 3));
    }

    #[test]
    fn test_tab_counts_as_one_column() {
        let buf = TextBuffer::from_text("\t\"x\"");
        assert_eq!(buf.offset_to_line_column(1), LineColumn::new(1, 2));
    }

    #[test]
    fn test_multibyte_columns_count_chars() {
        let buf = TextBuffer::from_text("\"é\": 1");
        // '"' (1 byte) + 'é' (2 bytes) puts the closing quote at byte 3.
        assert_eq!(buf.offset_to_line_column(3), LineColumn::new(1, 3));
        assert_eq!(buf.line_column_to_offset(1, 3), 3);
    }

    #[test]
    fn test_offset_inside_multibyte_char_snaps_down() {
        let buf = TextBuffer::from_text("é");
        assert_eq!(buf.offset_to_line_column(1), LineColumn::new(1, 1));
    }

    #[test]
    fn test_line_column_to_offset_clamps() {
        let buf = TextBuffer::from_text("ab\ncd");
        assert_eq!(buf.line_column_to_offset(1, 99), 2);
        assert_eq!(buf.line_column_to_offset(99, 1), 3);
        assert_eq!(buf.line_column_to_offset(0, 0), 0);
    }

    #[test]
    fn test_offset_past_end_clamps() {
        let buf = TextBuffer::from_text("ab");
        assert_eq!(buf.offset_to_line_column(100), LineColumn::new(1, 3));
    }

    proptest! {
        #[test]
        fn prop_line_column_round_trip(text in "[a-z\\t é\\n{}\":,]{0,80}", line_seed: usize, col_seed: usize) {
            let buf = TextBuffer::from_text(&text);
            let line = line_seed % buf.line_count() + 1;
            let max_col = buf.line_len_chars(line - 1) + 1;
            let column = col_seed % max_col + 1;
            let offset = buf.line_column_to_offset(line, column);
            prop_assert_eq!(buf.offset_to_line_column(offset), LineColumn::new(line, column));
        }
    }

    // --- Selection ---

    #[test]
    fn test_set_selection_orders_and_clamps() {
        let mut buf = TextBuffer::from_text("hello");
        buf.set_selection(100, 2);
        assert_eq!(buf.selection(), Selection { start: 2, end: 5 });
    }

    #[test]
    fn test_set_selection_snaps_to_char_boundary() {
        let mut buf = TextBuffer::from_text("aé");
        buf.set_cursor(2);
        assert_eq!(buf.cursor(), 1);
    }

    // --- Mutation ---

    #[test]
    fn test_new_buffer_is_clean() {
        let buf = TextBuffer::from_text("{}");
        assert!(!buf.is_dirty());
    }

    #[test]
    fn test_insert_marks_dirty_and_bumps_revision() {
        let mut buf = TextBuffer::from_text("{}");
        let rev = buf.revision();
        buf.set_cursor(1);
        buf.insert_char(' ');
        assert!(buf.is_dirty());
        assert!(buf.revision() > rev);
        assert_eq!(buf.text(), "{ }");
    }

    #[test]
    fn test_reset_is_clean_and_resets_selection() {
        let mut buf = TextBuffer::from_text("abc");
        buf.set_selection(1, 3);
        buf.insert_char('x');
        buf.reset("[]");
        assert!(!buf.is_dirty());
        assert_eq!(buf.selection(), Selection::caret(0));
        assert_eq!(buf.text(), "[]");
    }

    #[test]
    fn test_splice_replaces_range_and_moves_cursor() {
        let mut buf = TextBuffer::from_text("hello world");
        let cursor = buf.splice(6, 11, "there");
        assert_eq!(buf.text(), "hello there");
        assert_eq!(cursor, 11);
        assert_eq!(buf.selection(), Selection::caret(11));
    }

    #[test]
    fn test_insert_char_replaces_selection() {
        let mut buf = TextBuffer::from_text("abc");
        buf.set_selection(0, 2);
        buf.insert_char('z');
        assert_eq!(buf.text(), "zc");
        assert_eq!(buf.cursor(), 1);
    }

    #[test]
    fn test_delete_back_at_start_is_noop() {
        let mut buf = TextBuffer::from_text("hello");
        assert!(!buf.delete_back());
        assert_eq!(buf.text(), "hello");
    }

    #[test]
    fn test_delete_back_joins_lines() {
        let mut buf = TextBuffer::from_text("hello\nworld");
        buf.set_cursor(6);
        buf.delete_back();
        assert_eq!(buf.text(), "helloworld");
        assert_eq!(buf.cursor(), 5);
    }

    #[test]
    fn test_delete_back_multibyte() {
        let mut buf = TextBuffer::from_text("café");
        buf.move_to_end();
        buf.delete_back();
        assert_eq!(buf.text(), "caf");
    }

    #[test]
    fn test_delete_forward_at_end_is_noop() {
        let mut buf = TextBuffer::from_text("hello");
        buf.move_to_end();
        assert!(!buf.delete_forward());
    }

    #[test]
    fn test_delete_forward_removes_selection() {
        let mut buf = TextBuffer::from_text("hello");
        buf.set_selection(1, 4);
        assert!(buf.delete_forward());
        assert_eq!(buf.text(), "ho");
    }

    // --- Cursor movement ---

    #[test]
    fn test_move_left_wraps_to_prev_line() {
        let mut buf = TextBuffer::from_text("hello\nworld");
        buf.set_cursor(6);
        buf.move_cursor(Direction::Left);
        assert_eq!(buf.cursor_line_column(), LineColumn::new(1, 6));
    }

    #[test]
    fn test_move_right_collapses_selection_to_end() {
        let mut buf = TextBuffer::from_text("hello");
        buf.set_selection(1, 3);
        buf.move_cursor(Direction::Right);
        assert_eq!(buf.selection(), Selection::caret(3));
    }

    #[test]
    fn test_move_up_at_first_line_is_noop() {
        let mut buf = TextBuffer::from_text("hello\nworld");
        buf.set_cursor(2);
        buf.move_cursor(Direction::Up);
        assert_eq!(buf.cursor(), 2);
    }

    #[test]
    fn test_column_memory_across_short_line() {
        let mut buf = TextBuffer::from_text("hello\nhi\nworld");
        buf.set_cursor(4);
        buf.move_cursor(Direction::Down);
        assert_eq!(buf.cursor_line_column(), LineColumn::new(2, 3));
        buf.move_cursor(Direction::Down);
        assert_eq!(buf.cursor_line_column(), LineColumn::new(3, 5));
    }

    #[test]
    fn test_move_home_and_end() {
        let mut buf = TextBuffer::from_text("ab\ncdef");
        buf.set_cursor(5);
        buf.move_home();
        assert_eq!(buf.cursor(), 3);
        buf.move_end();
        assert_eq!(buf.cursor(), 7);
    }

    #[test]
    fn test_slice_returns_range() {
        let buf = TextBuffer::from_text("{\"a\":1}");
        assert_eq!(buf.slice(1, 4), "\"a\"");
    }
}
