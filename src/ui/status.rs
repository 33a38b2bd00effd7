use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::{Model, ToastLevel};
use crate::editor::{JsonEditor, Operation, TableRenderable, TextEditable};
use crate::view::ViewMode;

const TOOLBAR_ITEMS: &[(&str, &str)] = &[
    ("F2", "Format"),
    ("F3", "Validate"),
    ("F4", "Table/Raw"),
    ("F5", "Group"),
    ("F6", "+Property"),
    ("F7", "+Relationship"),
    ("F8", "+GeoProperty"),
    ("^S", "Save"),
];

pub fn render_toolbar(model: &Model, frame: &mut Frame, area: Rect) {
    let key_style = Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let label_style = Style::default().fg(Color::White).bg(Color::Indexed(236));
    let read_only = model
        .active_editor()
        .is_some_and(|e| e.options().operation == Operation::View);

    let mut spans = Vec::new();
    for (key, label) in TOOLBAR_ITEMS {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(format!(" {label} "), label_style));
    }
    if read_only {
        spans.push(Span::styled(
            " read-only ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(label_style),
        area,
    );
}

pub fn render_prompt_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some(prompt) = model.prompt.as_ref() else {
        return;
    };
    let text = format!(
        "New {} attribute name: {}_  Enter: insert  Esc: cancel",
        prompt.snippet.label(),
        prompt.name
    );
    let bar = Paragraph::new(text).style(Style::default().bg(Color::Blue).fg(Color::White));
    frame.render_widget(bar, area);
}

fn view_label(editor: &JsonEditor, column: usize) -> String {
    match editor.view_mode() {
        ViewMode::Raw => "raw".to_string(),
        ViewMode::Table => editor.column_info(column).map_or_else(
            || "table".to_string(),
            |(name, width)| format!("table {name}:{width}"),
        ),
    }
}

fn validation_label(editor: &JsonEditor) -> String {
    if editor.validation_pending() {
        return "validating…".to_string();
    }
    editor
        .report()
        .map_or_else(String::new, crate::validate::ValidationReport::summary)
}

pub fn render_status_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some(tab) = model.workspace.active() else {
        let bar = Paragraph::new(" no document  F1:help")
            .style(Style::default().bg(Color::DarkGray).fg(Color::White));
        frame.render_widget(bar, area);
        return;
    };
    let editor = &tab.editor;
    let position = editor.buffer().cursor_line_column();
    let dirty = if editor.is_dirty() { " [+]" } else { "" };
    let watch_indicator = if model.watch_enabled {
        " [watching]"
    } else {
        ""
    };

    let status = format!(
        " {}{dirty}  Ln {}, Col {}  [{}]  {}{watch_indicator}  F1:help",
        tab.title,
        position.line,
        position.column,
        view_label(editor, model.table_column),
        validation_label(editor),
    );

    let invalid = editor.report().is_some_and(|r| !r.is_valid);
    let style = if invalid {
        Style::default().bg(Color::Indexed(52)).fg(Color::White)
    } else {
        Style::default().bg(Color::DarkGray).fg(Color::White)
    };
    frame.render_widget(Paragraph::new(status).style(style), area);
}

pub fn render_toast_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some((message, level)) = model.active_toast() else {
        return;
    };
    let (prefix, style) = match level {
        ToastLevel::Info => (
            "[info]",
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
        ToastLevel::Warning => (
            "[warn]",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ),
        ToastLevel::Error => ("[error]", Style::default().bg(Color::Red).fg(Color::White)),
    };
    let toast = Paragraph::new(format!("{prefix} {message}")).style(style);
    frame.render_widget(toast, area);
}
