//! The JSON editing core.
//!
//! [`JsonEditor`] owns one document and wires the rope-backed
//! [`TextBuffer`], the [`Validator`], the raw/table view state and the
//! highlighter together. Capabilities are exposed through traits so a host
//! can depend on only what it renders.

mod buffer;
mod debounce;
pub mod form;
pub mod ops;
mod options;
mod snippet;

pub use buffer::{Direction, LineColumn, Selection, TextBuffer};
pub use debounce::ChangeDebouncer;
pub use form::{FieldKind, FormField};
pub use ops::ErrorHighlight;
pub use options::{EditorInput, EditorOptions, Operation};
pub use snippet::Snippet;

use serde::Serialize;
use serde_json::Value;

use crate::error::EditorError;
use crate::highlight::{Highlighter, Projection, default_highlighter};
use crate::validate::{ValidationReport, Validator};
use crate::view::{ViewMode, ViewModeController};

/// Quiet period between the last edit and the automatic validation.
pub const VALIDATION_DEBOUNCE_MS: u64 = 300;

/// Bounds for [`JsonEditor::resize`], in rows.
const MIN_HEIGHT: i32 = 3;
const MAX_HEIGHT: i32 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorEvent {
    Change,
    Save,
    Validated,
}

/// Payload delivered to handlers registered with [`JsonEditor::on`].
#[derive(Debug, Clone, Copy)]
pub enum Notification<'a> {
    Change(&'a str),
    Save(&'a str),
    Validated(&'a ValidationReport),
}

impl Notification<'_> {
    const fn event(&self) -> EditorEvent {
        match self {
            Self::Change(_) => EditorEvent::Change,
            Self::Save(_) => EditorEvent::Save,
            Self::Validated(_) => EditorEvent::Validated,
        }
    }
}

type Handler = Box<dyn FnMut(&Notification<'_>)>;

/// A text mutation. Every variant raises a change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    InsertChar(char),
    InsertText(String),
    Backspace,
    Delete,
    /// Tab key: two spaces.
    Indent,
}

/// Cursor motion without touching the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Step(Direction),
    LineStart,
    LineEnd,
    DocumentStart,
    DocumentEnd,
    To(usize),
}

/// Plain text editing.
pub trait TextEditable {
    fn buffer(&self) -> &TextBuffer;

    /// Apply an edit; returns whether the text changed.
    fn edit(&mut self, op: EditOp, now_ms: u64) -> bool;

    fn navigate(&mut self, motion: Motion);
}

/// Rendering the document as rows and columns.
pub trait TableRenderable {
    fn view_mode(&self) -> ViewMode;

    /// # Errors
    /// Returns the construction error when the document is not an array;
    /// the editor is then in raw mode.
    fn enter_table(&mut self) -> Result<(), EditorError>;

    fn enter_raw(&mut self);

    fn toggle_grouping(&mut self) -> bool;

    /// Widen or narrow one column; widths survive rebuilds of the same
    /// document.
    fn resize_column(&mut self, column: usize, delta: isize);

    fn column_count(&self) -> usize;

    /// Name and current width of one column.
    fn column_info(&self, column: usize) -> Option<(&str, usize)>;

    /// Table lines, rebuilding after edits. Falls back to raw mode (and
    /// returns nothing) when the document no longer parses as an array.
    fn table_lines(&mut self) -> Vec<String>;
}

/// Editing a single entity through named fields.
pub trait FormRenderable {
    /// # Errors
    /// Fails when the document does not parse as a JSON object.
    fn form_fields(&self) -> Result<Vec<FormField>, EditorError>;

    /// # Errors
    /// Fails for unparsable documents and read-only fields.
    fn set_form_field(&mut self, name: &str, input: &str, now_ms: u64) -> Result<(), EditorError>;
}

pub struct JsonEditor {
    options: EditorOptions,
    buffer: TextBuffer,
    validator: Validator,
    view: ViewModeController,
    highlighter: Box<dyn Highlighter>,
    projection: Projection,
    report: Option<ValidationReport>,
    error_highlight: Option<ErrorHighlight>,
    debouncer: ChangeDebouncer,
    handlers: Vec<(EditorEvent, Handler)>,
}

impl std::fmt::Debug for JsonEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonEditor")
            .field("buffer", &self.buffer)
            .field("validator", &self.validator)
            .field("mode", &self.view.mode())
            .field("highlighter", &self.highlighter.name())
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl Default for JsonEditor {
    fn default() -> Self {
        Self::new(EditorOptions::default())
    }
}

impl JsonEditor {
    pub fn new(options: EditorOptions) -> Self {
        Self::with_highlighter(options, default_highlighter(true))
    }

    pub fn with_highlighter(options: EditorOptions, highlighter: Box<dyn Highlighter>) -> Self {
        let validator = Validator::new(options.schema.as_ref());
        let mut editor = Self {
            buffer: TextBuffer::empty(),
            validator,
            view: ViewModeController::new(),
            highlighter,
            projection: Projection::empty(),
            report: None,
            error_highlight: None,
            debouncer: ChangeDebouncer::new(VALIDATION_DEBOUNCE_MS),
            handlers: Vec::new(),
            options,
        };
        if let Some(initial) = editor.options.initial_value.clone() {
            editor.set_value(initial);
        } else {
            editor.refresh_projection();
        }
        if editor.options.starting_view() == ViewMode::Table {
            // Failure leaves the editor in raw mode.
            let _ = TableRenderable::enter_table(&mut editor);
        }
        editor
    }

    pub const fn options(&self) -> &EditorOptions {
        &self.options
    }

    /// Replace the schema, rebuilding the validator.
    pub fn set_schema(&mut self, schema: Option<Value>) {
        self.validator = Validator::new(schema.as_ref());
        self.options.schema = schema;
        self.validate();
    }

    /// Register a handler for `event`.
    pub fn on(&mut self, event: EditorEvent, handler: impl FnMut(&Notification<'_>) + 'static) {
        self.handlers.push((event, Box::new(handler)));
    }

    fn emit(&mut self, notification: &Notification<'_>) {
        let event = notification.event();
        for (_, handler) in self.handlers.iter_mut().filter(|(e, _)| *e == event) {
            handler(notification);
        }
    }

    /// Replace the document and revalidate. Selection, error locations and
    /// table column widths are reset.
    pub fn set_value(&mut self, input: impl Into<EditorInput>) {
        let text = match input.into() {
            EditorInput::Text(text) => text,
            EditorInput::Json(value) => serialize_or_empty(&value),
        };
        self.replace_document(&text);
    }

    /// Serialize any value into the document.
    ///
    /// # Errors
    /// On serialization failure the document is emptied and the error
    /// returned.
    pub fn set_serializable<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EditorError> {
        match serde_json::to_string_pretty(value) {
            Ok(text) => {
                self.replace_document(&text);
                Ok(())
            }
            Err(err) => {
                let err = EditorError::Serialization(err.to_string());
                tracing::error!(%err, "document cleared");
                self.replace_document("");
                Err(err)
            }
        }
    }

    fn replace_document(&mut self, text: &str) {
        self.buffer.reset(text);
        self.view.replace_document();
        self.sync_view(text);
        self.error_highlight = None;
        self.report = None;
        self.debouncer.cancel();
        self.refresh_projection();
        self.validate();
    }

    pub fn value(&self) -> String {
        self.buffer.text()
    }

    /// The document parsed on demand; `None` when it is not valid JSON.
    pub fn parsed_value(&self) -> Option<Value> {
        serde_json::from_str(&self.buffer.text()).ok()
    }

    pub const fn is_dirty(&self) -> bool {
        self.buffer.is_dirty()
    }

    pub const fn mark_saved(&mut self) {
        self.buffer.mark_clean();
    }

    pub const fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn highlighter_name(&self) -> &'static str {
        self.highlighter.name()
    }

    pub const fn report(&self) -> Option<&ValidationReport> {
        self.report.as_ref()
    }

    /// Lines (1-based) that carry a located error.
    pub fn error_lines(&self) -> Vec<usize> {
        self.report
            .iter()
            .flat_map(|r| r.errors.iter().filter_map(|e| e.line()))
            .collect()
    }

    pub fn error_highlight(&self, now_ms: u64) -> Option<ErrorHighlight> {
        self.error_highlight.filter(|h| h.is_active(now_ms))
    }

    /// Validate now, cancelling any pending debounced run.
    pub fn validate(&mut self) -> ValidationReport {
        self.debouncer.cancel();
        let report = self.validator.validate(&self.buffer);
        tracing::debug!(valid = report.is_valid, errors = report.errors.len(), "validated");
        self.report = Some(report.clone());
        self.emit(&Notification::Validated(&report));
        report
    }

    /// Focus left the editor.
    pub fn blur(&mut self) -> ValidationReport {
        self.validate()
    }

    /// Advance timers. Returns the report when the debounced validation
    /// fired on this tick.
    pub fn tick(&mut self, now_ms: u64) -> Option<ValidationReport> {
        if self.error_highlight.is_some_and(|h| !h.is_active(now_ms)) {
            self.error_highlight = None;
        }
        self.debouncer
            .take_ready(now_ms)
            .then(|| self.validate())
    }

    pub const fn validation_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Pretty-print the document.
    ///
    /// # Errors
    /// An unparsable document is left as is; the syntax error is returned
    /// and also recorded as the current validation report.
    pub fn format(&mut self, now_ms: u64) -> Result<bool, EditorError> {
        match ops::format_document(&mut self.buffer) {
            Ok(changed) => {
                if changed {
                    self.after_edit(now_ms);
                }
                Ok(changed)
            }
            Err(err) => {
                self.validate();
                Err(err)
            }
        }
    }

    /// Validate and, when the document passes, notify save handlers.
    ///
    /// # Errors
    /// Returns the first validation failure; handlers are not called.
    pub fn save(&mut self) -> Result<String, EditorError> {
        let report = self.validate();
        if let Some(err) = report.to_error() {
            return Err(err);
        }
        let text = self.buffer.text();
        self.emit(&Notification::Save(&text));
        Ok(text)
    }

    /// Insert a template at the cursor, replacing the selection.
    pub fn insert_snippet(&mut self, snippet: Snippet, now_ms: u64) {
        self.edit(EditOp::InsertText(snippet.text().to_string()), now_ms);
    }

    /// Add `"name": <snippet>` as the last member of the root object.
    ///
    /// Returns `false` when the document does not end with an object.
    pub fn insert_attribute(&mut self, name: &str, snippet: Snippet, now_ms: u64) -> bool {
        let Some((offset, needs_comma)) = snippet::closing_brace_insertion(&self.buffer.text())
        else {
            return false;
        };
        let member = snippet.member(name);
        let text = if needs_comma {
            format!(",\n  {member}")
        } else {
            format!("\n  {member}")
        };
        self.buffer.set_cursor(offset);
        self.edit(EditOp::InsertText(text), now_ms)
    }

    /// Double-click: select a quoted string's interior, else the word.
    pub fn handle_double_click(&mut self, offset: usize) -> bool {
        ops::select_quoted_text_at(&mut self.buffer, offset)
            || ops::select_word_at(&mut self.buffer, offset)
    }

    /// Select the character at `(line, column)` for a few seconds.
    pub fn highlight_error(&mut self, line: usize, column: usize, now_ms: u64) -> ErrorHighlight {
        let highlight = ops::highlight_error_location(&mut self.buffer, line, column, now_ms);
        self.error_highlight = Some(highlight);
        highlight
    }

    /// Jump to the first located error of the last report.
    pub fn highlight_first_error(&mut self, now_ms: u64) -> Option<ErrorHighlight> {
        let position = self
            .report
            .as_ref()?
            .errors
            .iter()
            .find_map(|e| e.position)?;
        Some(self.highlight_error(position.line, position.column, now_ms))
    }

    fn refresh_projection(&mut self) {
        self.projection = self.highlighter.project(&self.buffer.text());
    }

    /// Rebuild the table right away so a non-array document drops to raw.
    fn sync_view(&mut self, text: &str) {
        if self.view.mode() == ViewMode::Table
            && let Err(err) = self.view.refresh(text)
        {
            tracing::debug!(%err, "left table view after document change");
        }
    }

    fn after_edit(&mut self, now_ms: u64) {
        self.refresh_projection();
        self.view.invalidate();
        self.error_highlight = None;
        self.report = None;
        let text = self.buffer.text();
        self.sync_view(&text);
        self.emit(&Notification::Change(&text));
        self.debouncer.queue(now_ms);
    }
}

fn serialize_or_empty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|err| {
        tracing::error!(%err, "document cleared");
        String::new()
    })
}

impl TextEditable for JsonEditor {
    fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    fn edit(&mut self, op: EditOp, now_ms: u64) -> bool {
        let changed = match op {
            EditOp::InsertChar(ch) => {
                self.buffer.insert_char(ch);
                true
            }
            EditOp::InsertText(text) => {
                ops::insert_snippet(&mut self.buffer, &text);
                true
            }
            EditOp::Backspace => self.buffer.delete_back(),
            EditOp::Delete => self.buffer.delete_forward(),
            EditOp::Indent => {
                ops::indent(&mut self.buffer);
                true
            }
        };
        if changed {
            self.after_edit(now_ms);
        }
        changed
    }

    fn navigate(&mut self, motion: Motion) {
        match motion {
            Motion::Step(direction) => self.buffer.move_cursor(direction),
            Motion::LineStart => self.buffer.move_home(),
            Motion::LineEnd => self.buffer.move_end(),
            Motion::DocumentStart => self.buffer.move_to_start(),
            Motion::DocumentEnd => self.buffer.move_to_end(),
            Motion::To(offset) => self.buffer.set_cursor(offset),
        }
    }
}

impl TableRenderable for JsonEditor {
    fn view_mode(&self) -> ViewMode {
        self.view.mode()
    }

    fn enter_table(&mut self) -> Result<(), EditorError> {
        self.view.enter_table(&self.buffer.text())
    }

    fn enter_raw(&mut self) {
        self.view.enter_raw();
    }

    fn toggle_grouping(&mut self) -> bool {
        self.view.toggle_grouping()
    }

    fn resize_column(&mut self, column: usize, delta: isize) {
        self.view.resize_column(column, delta);
    }

    fn column_count(&self) -> usize {
        self.view.table().map_or(0, |t| t.columns.len())
    }

    fn column_info(&self, column: usize) -> Option<(&str, usize)> {
        let name = self.view.table()?.columns.get(column)?;
        let width = self.view.column_widths().get(column).copied()?;
        Some((name.as_str(), width))
    }

    fn table_lines(&mut self) -> Vec<String> {
        if self.view.refresh(&self.buffer.text()).is_err() {
            return Vec::new();
        }
        self.view.lines()
    }
}

impl FormRenderable for JsonEditor {
    fn form_fields(&self) -> Result<Vec<FormField>, EditorError> {
        let value = self.parsed_document()?;
        form::form_fields(&value, self.options.id_editable())
    }

    fn set_form_field(&mut self, name: &str, input: &str, now_ms: u64) -> Result<(), EditorError> {
        let mut value = self.parsed_document()?;
        form::apply_field(&mut value, name, input, self.options.id_editable())?;
        let text = serde_json::to_string_pretty(&value)
            .map_err(|err| EditorError::Serialization(err.to_string()))?;
        let cursor = self.buffer.cursor_line_column();
        self.buffer.splice(0, self.buffer.len(), &text);
        let offset = self.buffer.line_column_to_offset(cursor.line, cursor.column);
        self.buffer.set_cursor(offset);
        self.after_edit(now_ms);
        Ok(())
    }
}

impl JsonEditor {
    fn parsed_document(&self) -> Result<Value, EditorError> {
        serde_json::from_str(&self.buffer.text())
            .map_err(|err| crate::validate::syntax_error(&self.buffer, &err.to_string()))
    }

    /// The broker entity behind this document, if it came from one.
    pub fn entity_id(&self) -> Option<&str> {
        self.options.entity_id.as_deref()
    }

    /// Record that the document is stored as `id`. A created entity is
    /// updated from then on.
    pub fn bind_entity(&mut self, id: impl Into<String>) {
        self.options.entity_id = Some(id.into());
        if self.options.operation == Operation::Create {
            self.options.operation = Operation::Update;
        }
    }

    /// Adjust the configured height when the editor is resizable.
    pub fn resize(&mut self, delta: i32) -> bool {
        if !self.options.resizable {
            return false;
        }
        let height = i32::from(self.options.height)
            .saturating_add(delta)
            .clamp(MIN_HEIGHT, MAX_HEIGHT);
        self.options.height = u16::try_from(height).unwrap_or(self.options.height);
        true
    }

    /// Toolbar and view toggles for the host.
    pub fn toggle_view(&mut self) -> Result<ViewMode, EditorError> {
        match self.view.mode() {
            ViewMode::Raw => TableRenderable::enter_table(self).map(|()| ViewMode::Table),
            ViewMode::Table => {
                TableRenderable::enter_raw(self);
                Ok(ViewMode::Raw)
            }
        }
    }
}
