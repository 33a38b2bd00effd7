use ratatui::prelude::*;
use ratatui::widgets::{Clear, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::app::Model;
use crate::editor::{JsonEditor, TableRenderable, TextEditable};
use crate::view::ViewMode;

use super::{overlays, status, style};

/// Screen regions for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Areas {
    pub tabs: Rect,
    pub toolbar: Option<Rect>,
    pub body: Rect,
    /// Banner or attribute prompt row.
    pub notice: Option<Rect>,
    pub status: Rect,
}

fn row(area: Rect, y: u16) -> Rect {
    Rect {
        y,
        height: 1,
        ..area
    }
}

pub fn layout(model: &Model, area: Rect) -> Areas {
    let show_toolbar = model
        .active_editor()
        .map_or(model.editor_options.show_toolbar, |e| e.options().show_toolbar);
    let has_notice = model.prompt.is_some() || model.active_toast().is_some();

    let tabs = row(area, area.y);
    let mut top = area.y + 1;
    let toolbar = show_toolbar.then(|| {
        top += 1;
        row(area, top - 1)
    });
    let bottom = area.y + area.height;
    let status = row(area, bottom.saturating_sub(1));
    let mut body_bottom = bottom.saturating_sub(1);
    let notice = has_notice.then(|| {
        body_bottom = body_bottom.saturating_sub(1);
        row(area, body_bottom)
    });
    let available = body_bottom.saturating_sub(top);
    let height = model
        .active_editor()
        .map_or(available, |e| available.min(e.options().height));
    Areas {
        tabs,
        toolbar,
        body: Rect {
            y: top,
            height,
            ..area
        },
        notice,
        status,
    }
}

pub fn body_area(model: &Model, area: Rect) -> Rect {
    layout(model, area).body
}

/// Columns taken by line numbers, zero when they are off.
pub fn gutter_width(editor: &JsonEditor) -> u16 {
    if editor.options().show_line_numbers {
        line_number_width(editor.buffer().line_count()) + 1
    } else {
        0
    }
}

/// Render the complete UI.
pub fn render(model: &mut Model, frame: &mut Frame) {
    let area = frame.area();
    let areas = layout(model, area);
    frame.render_widget(Clear, area);

    render_tab_bar(model, frame, areas.tabs);
    if let Some(toolbar) = areas.toolbar {
        status::render_toolbar(model, frame, toolbar);
    }
    let now = model.now_ms;
    if let Some(tab) = model.workspace.active_mut() {
        let scroll = tab.scroll;
        match tab.editor.view_mode() {
            ViewMode::Raw => render_raw(&tab.editor, scroll, now, frame, areas.body),
            ViewMode::Table => render_table(&mut tab.editor, scroll, frame, areas.body),
        }
    }
    if let Some(notice) = areas.notice {
        if model.prompt.is_some() {
            status::render_prompt_bar(model, frame, notice);
        } else {
            status::render_toast_bar(model, frame, notice);
        }
    }
    status::render_status_bar(model, frame, areas.status);

    if model.help_visible {
        overlays::render_help_overlay(model, frame, area);
    }
}

fn tab_label(model: &Model, idx: usize) -> String {
    let tab = &model.workspace.tabs()[idx];
    let dirty = if tab.editor.is_dirty() { "*" } else { "" };
    format!(" {}{dirty} ", tab.title)
}

fn render_tab_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let active = model.workspace.active_index();
    let spans: Vec<Span> = (0..model.workspace.len())
        .map(|idx| {
            let style = if Some(idx) == active {
                Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            Span::styled(tab_label(model, idx), style)
        })
        .collect();
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Index of the tab drawn under a screen cell.
pub fn tab_at_column(model: &Model, row: u16, column: u16) -> Option<usize> {
    if row != 0 {
        return None;
    }
    let column = usize::from(column);
    let mut x = 0;
    for idx in 0..model.workspace.len() {
        let width = tab_label(model, idx).width();
        if column < x + width {
            return Some(idx);
        }
        x += width;
    }
    None
}

/// Cursor, selection and error-flash positions as byte offsets.
struct Marks {
    cursor: usize,
    selection: std::ops::Range<usize>,
    error: Option<usize>,
}

impl Marks {
    fn apply(&self, base: Style, offset: usize) -> Style {
        if self.error == Some(offset) {
            style::error_mark_style(base)
        } else if offset == self.cursor {
            style::cursor_style(base)
        } else if self.selection.contains(&offset) {
            style::selection_style(base)
        } else {
            base
        }
    }
}

fn render_raw(editor: &JsonEditor, scroll: usize, now_ms: u64, frame: &mut Frame, area: Rect) {
    let buffer = editor.buffer();
    let selection = buffer.selection();
    let marks = Marks {
        cursor: buffer.cursor(),
        selection: selection.start..selection.end,
        error: editor.error_highlight(now_ms).map(|h| h.offset),
    };
    let error_lines = editor.error_lines();
    let gutter = gutter_width(editor);
    let end = (scroll + usize::from(area.height)).min(buffer.line_count());

    let content: Vec<Line> = (scroll..end)
        .map(|line_idx| {
            let mut spans = Vec::new();
            if gutter > 0 {
                let has_error = error_lines.contains(&(line_idx + 1));
                spans.push(Span::styled(
                    format!("{:>width$} ", line_idx + 1, width = usize::from(gutter - 1)),
                    style::gutter_style(has_error),
                ));
            }
            spans.extend(body_spans(editor, line_idx, &marks));
            Line::from(spans)
        })
        .collect();
    frame.render_widget(Paragraph::new(content), area);
}

/// Projection spans for one line with the cursor and selection overlaid.
fn body_spans(editor: &JsonEditor, line_idx: usize, marks: &Marks) -> Vec<Span<'static>> {
    let buffer = editor.buffer();
    let base: Vec<(String, Style)> = match editor.projection().line(line_idx) {
        Some(spans) if !spans.is_empty() => spans
            .iter()
            .map(|s| (s.text.clone(), style::style_for_span(s)))
            .collect(),
        _ => vec![(buffer.line_at(line_idx).unwrap_or_default(), Style::default())],
    };

    let mut out = Vec::new();
    let mut offset = buffer.line_start(line_idx);
    for (text, base_style) in base {
        let mut run = String::new();
        let mut run_style = base_style;
        for ch in text.chars() {
            let style = marks.apply(base_style, offset);
            if style != run_style && !run.is_empty() {
                out.push(Span::styled(std::mem::take(&mut run), run_style));
            }
            run_style = style;
            run.push(if ch == '\t' { ' ' } else { ch });
            offset += ch.len_utf8();
        }
        if !run.is_empty() {
            out.push(Span::styled(run, run_style));
        }
    }
    if marks.cursor == offset {
        out.push(Span::styled(" ", style::cursor_style(Style::default())));
    }
    out
}

fn render_table(editor: &mut JsonEditor, scroll: usize, frame: &mut Frame, area: Rect) {
    let lines = editor.table_lines();
    if lines.is_empty() {
        // The edit that broke the array already switched back to raw.
        return;
    }
    // Column names follow a top border; group labels have no border at all.
    let header: Vec<bool> = lines
        .iter()
        .enumerate()
        .map(|(idx, text)| {
            let after_top = idx > 0 && lines[idx - 1].starts_with('┌');
            after_top || !text.starts_with(['│', '┌', '├', '└'])
        })
        .collect();
    let content: Vec<Line> = lines
        .into_iter()
        .zip(header)
        .skip(scroll)
        .take(usize::from(area.height))
        .map(|(text, is_header)| {
            let style = if is_header {
                style::table_header_style()
            } else {
                style::table_style()
            };
            Line::styled(text, style)
        })
        .collect();
    frame.render_widget(Paragraph::new(content), area);
}

/// Calculate the width needed for line numbers.
pub const fn line_number_width(total_lines: usize) -> u16 {
    if total_lines < 10 {
        1
    } else if total_lines < 100 {
        2
    } else if total_lines < 1_000 {
        3
    } else if total_lines < 10_000 {
        4
    } else if total_lines < 100_000 {
        5
    } else {
        6
    }
}
