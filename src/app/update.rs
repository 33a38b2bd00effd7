use std::path::PathBuf;

use crate::app::Model;
use crate::app::model::{AttributePrompt, ToastLevel};
use crate::editor::{EditOp, JsonEditor, Motion, Snippet, TableRenderable, TextEditable};
use crate::view::ViewMode;

/// All possible events and actions in the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // Editing
    /// Apply a text edit to the active document
    Edit(EditOp),
    /// Move the cursor
    Move(Motion),
    /// Move the cursor one screen up or down
    Page(isize),
    /// Put the cursor at a 1-based line and column (mouse click)
    ClickAt(usize, usize),
    /// Select the quoted string or word at a 1-based line and column
    DoubleClickAt(usize, usize),
    /// Insert a template at the cursor
    InsertSnippet(Snippet),
    /// Start typing the name of a new attribute of the given kind
    StartAttribute(Snippet),
    /// Type into the attribute name prompt
    PromptInput(char),
    /// Delete from the attribute name prompt
    PromptBackspace,
    /// Insert the named attribute
    PromptSubmit,
    /// Abandon the attribute name prompt
    PromptCancel,
    /// Pretty-print the document
    Format,

    // Validation
    /// Validate now
    Validate,
    /// Terminal lost focus
    Blur,
    /// Select the first located error
    JumpToError,
    /// Validate and write the document to its file or broker entity
    Save,
    /// Fetch the active broker entity again
    ReloadEntity,

    // View
    /// Switch between raw text and table
    ToggleView,
    /// Toggle grouping rows by `type` in table mode
    ToggleGrouping,
    /// Pick the table column to resize
    SelectColumn(isize),
    /// Widen or narrow the selected table column
    ResizeColumn(isize),
    /// Grow or shrink the editor height
    ResizeEditor(i32),
    /// Scroll the body by n lines
    Scroll(isize),

    // Tabs
    /// Focus the next or previous tab
    CycleTab(isize),
    /// Close the active tab
    CloseTab,

    // Files
    /// An open file changed on disk
    FileChanged(PathBuf),
    /// Toggle file watching
    ToggleWatch,

    // Window
    /// Terminal resized
    Resize(u16, u16),
    /// Toggle help overlay
    ToggleHelp,
    /// Hide help overlay
    HideHelp,

    // Application
    /// Quit the application
    Quit,
}

impl Message {
    /// Whether the message changes the document text.
    pub const fn is_edit(&self) -> bool {
        matches!(
            self,
            Self::Edit(_) | Self::InsertSnippet(_) | Self::PromptSubmit | Self::Format
        )
    }
}

/// Pure function that updates the model based on a message.
///
/// File IO (save, reload, watching) happens afterwards in the event loop's
/// side-effect handler.
pub fn update(mut model: Model, msg: Message) -> Model {
    // Reset confirmation flags on any action other than the confirmed one.
    if !matches!(msg, Message::Quit | Message::Save | Message::CloseTab) {
        model.quit_confirmed = false;
    }
    if !matches!(msg, Message::Save) {
        model.save_confirmed = false;
    }
    let now = model.now_ms;

    match msg {
        Message::Edit(op) => {
            if let Some(editor) = editable(&mut model) {
                editor.edit(op, now);
            }
        }
        Message::Move(motion) => {
            if let Some(editor) = model.active_editor_mut() {
                editor.navigate(motion);
            }
        }
        Message::Page(direction) => {
            let rows = usize::from(model.body_height()).max(1);
            if let Some(editor) = model.active_editor_mut() {
                let step = if direction < 0 {
                    crate::editor::Direction::Up
                } else {
                    crate::editor::Direction::Down
                };
                for _ in 0..rows {
                    editor.navigate(Motion::Step(step));
                }
            }
        }
        Message::ClickAt(line, column) => {
            if let Some(editor) = model.active_editor_mut() {
                let offset = editor.buffer().line_column_to_offset(line, column);
                editor.navigate(Motion::To(offset));
            }
        }
        Message::DoubleClickAt(line, column) => {
            if let Some(editor) = model.active_editor_mut() {
                let offset = editor.buffer().line_column_to_offset(line, column);
                editor.handle_double_click(offset);
            }
        }
        Message::InsertSnippet(snippet) => {
            if let Some(editor) = editable(&mut model) {
                editor.insert_snippet(snippet, now);
            }
        }
        Message::StartAttribute(snippet) => {
            if editable(&mut model).is_some() {
                model.prompt = Some(AttributePrompt {
                    snippet,
                    name: String::new(),
                });
            }
        }
        Message::PromptInput(ch) => {
            if let Some(prompt) = model.prompt.as_mut() {
                prompt.name.push(ch);
            }
        }
        Message::PromptBackspace => {
            if let Some(prompt) = model.prompt.as_mut() {
                prompt.name.pop();
            }
        }
        Message::PromptSubmit => {
            if let Some(prompt) = model.prompt.take() {
                let name = prompt.name.trim();
                if name.is_empty() {
                    model.show_toast(ToastLevel::Warning, "Attribute name is empty");
                } else if let Some(editor) = editable(&mut model)
                    && !editor.insert_attribute(name, prompt.snippet, now)
                {
                    model.show_toast(ToastLevel::Warning, "Document is not an object");
                }
            }
        }
        Message::PromptCancel => model.prompt = None,
        Message::Format => {
            if let Some(editor) = editable(&mut model)
                && let Err(err) = editor.format(now)
            {
                model.show_toast(ToastLevel::Error, format!("Format failed: {err}"));
            }
        }
        Message::Validate | Message::Blur => {
            if let Some(editor) = model.active_editor_mut() {
                editor.validate();
                model.toast_report();
            }
        }
        Message::JumpToError => {
            let jumped = model
                .active_editor_mut()
                .and_then(|e| e.highlight_first_error(now));
            if jumped.is_none() {
                model.show_toast(ToastLevel::Info, "No located errors");
            }
        }
        Message::ToggleView => {
            if let Some(editor) = model.active_editor_mut() {
                match editor.toggle_view() {
                    Ok(ViewMode::Table) => model.table_column = 0,
                    Ok(ViewMode::Raw) => {}
                    Err(err) => model.show_toast(ToastLevel::Warning, err.to_string()),
                }
            }
        }
        Message::ToggleGrouping => {
            if let Some(editor) = model.active_editor_mut()
                && editor.view_mode() == ViewMode::Table
            {
                editor.toggle_grouping();
            }
        }
        Message::SelectColumn(step) => {
            let count = model
                .active_editor()
                .filter(|e| e.view_mode() == ViewMode::Table)
                .map_or(0, TableRenderable::column_count);
            if count > 0 {
                let next = model.table_column.saturating_add_signed(step);
                model.table_column = next.min(count - 1);
            }
        }
        Message::ResizeColumn(delta) => {
            let column = model.table_column;
            if let Some(editor) = model.active_editor_mut()
                && editor.view_mode() == ViewMode::Table
            {
                editor.resize_column(column, delta);
            }
        }
        Message::ResizeEditor(delta) => {
            if let Some(editor) = model.active_editor_mut()
                && !editor.resize(delta)
            {
                model.show_toast(ToastLevel::Info, "Editor is not resizable");
            }
        }
        Message::Scroll(lines) => {
            if let Some(tab) = model.workspace.active_mut() {
                let last = tab.editor.buffer().line_count().saturating_sub(1);
                tab.scroll = tab.scroll.saturating_add_signed(lines).min(last);
            }
            return model;
        }
        Message::CycleTab(step) => {
            model.workspace.cycle(step);
            model.table_column = 0;
        }
        Message::CloseTab => {
            if let Some(id) = model.workspace.registry().active() {
                let dirty = model.active_editor().is_some_and(JsonEditor::is_dirty);
                if dirty && !model.quit_confirmed {
                    model.quit_confirmed = true;
                    model.show_toast(
                        ToastLevel::Warning,
                        "Unsaved changes. Ctrl+W again to discard",
                    );
                } else {
                    model.close_tab(id);
                    model.quit_confirmed = false;
                }
            }
        }
        Message::ToggleWatch => {
            model.watch_enabled = !model.watch_enabled;
        }
        Message::Resize(width, height) => model.apply_resize(width, height),
        Message::ToggleHelp => model.help_visible = !model.help_visible,
        Message::HideHelp => model.help_visible = false,
        Message::Quit => {
            if model.has_unsaved() && !model.quit_confirmed {
                model.quit_confirmed = true;
                model.show_toast(ToastLevel::Warning, "Unsaved changes. Quit again to discard");
            } else {
                model.should_quit = true;
            }
        }
        // IO-driven; handled as side effects.
        Message::Save | Message::ReloadEntity | Message::FileChanged(_) => {}
    }

    model.ensure_cursor_visible();
    model
}

/// The active editor, unless it was opened read-only.
fn editable(model: &mut Model) -> Option<&mut JsonEditor> {
    let view_only = model
        .active_editor()
        .is_some_and(|e| e.options().operation == crate::editor::Operation::View);
    if view_only {
        model.show_toast(ToastLevel::Info, "Opened read-only");
        return None;
    }
    model.active_editor_mut()
}
