use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph};

use crate::app::Model;

const BINDINGS: &[(&str, &[(&str, &str)])] = &[
    (
        "Editing",
        &[
            ("Arrows, Home/End", "Move cursor"),
            ("Ctrl+Home/End", "Document start / end"),
            ("PageUp/PageDown", "Page"),
            ("Tab", "Indent two spaces"),
            ("Double-click", "Select word or string"),
            ("F2 / Ctrl-f", "Format document"),
            ("F3", "Validate now"),
            ("Ctrl-e", "Jump to first error"),
        ],
    ),
    (
        "Attributes",
        &[
            ("F6", "Add Property"),
            ("F7", "Add Relationship"),
            ("F8", "Add GeoProperty"),
            ("F9", "Insert Property template"),
        ],
    ),
    (
        "Table",
        &[
            ("F4 / Ctrl-t", "Toggle table view"),
            ("F5 / Ctrl-g", "Group rows by type"),
            ("Left/Right", "Select column"),
            ("< / >", "Narrow / widen column"),
            ("Esc", "Back to raw"),
        ],
    ),
    (
        "Tabs",
        &[
            ("Ctrl-PageDown/Up", "Next / previous tab"),
            ("Ctrl-w", "Close tab"),
            ("Ctrl-Up/Down", "Grow / shrink editor"),
        ],
    ),
    (
        "Other",
        &[
            ("Ctrl-s", "Validate and save"),
            ("Ctrl-l", "Reload entity from broker"),
            ("Ctrl-r", "Toggle watch"),
            ("Ctrl-q / Ctrl-c", "Quit"),
            ("F1", "Toggle help"),
        ],
    ),
];

pub fn render_help_overlay(model: &Model, frame: &mut Frame, area: Rect) {
    let popup_width = area.width.saturating_sub(12).max(48);
    let popup_height = area.height.saturating_sub(4).max(12);
    let popup = centered_popup_rect(popup_width, popup_height, area);

    let global_cfg = model
        .config_global_path
        .as_ref()
        .map_or_else(|| "<unknown>".to_string(), |p| p.display().to_string());
    let local_cfg = model
        .config_local_path
        .as_ref()
        .map_or_else(|| "<none>".to_string(), |p| p.display().to_string());

    let section_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let dim_style = Style::default().fg(Color::Indexed(245));

    let mut lines: Vec<Line> = Vec::new();
    for (section, keys) in BINDINGS {
        lines.push(Line::styled(*section, section_style));
        for (key, action) in *keys {
            lines.push(Line::raw(format!("  {key:<20}{action}")));
        }
        lines.push(Line::raw(""));
    }
    lines.push(Line::styled("Config", section_style));
    lines.push(Line::raw(format!("  Global: {global_cfg}")));
    lines.push(Line::raw(format!("  Local override: {local_cfg}")));

    let block = Block::default()
        .title("Help")
        .borders(Borders::ALL)
        .padding(Padding::horizontal(1))
        .style(Style::default().bg(Color::Black).fg(Color::White));

    frame.render_widget(Clear, popup);
    frame.render_widget(block, popup);

    // Border plus padding.
    let inner = Rect::new(
        popup.x + 2,
        popup.y + 1,
        popup.width.saturating_sub(4),
        popup.height.saturating_sub(2),
    );
    let content_height = inner.height.saturating_sub(1);
    let visible: Vec<Line> = lines
        .into_iter()
        .take(usize::from(content_height))
        .collect();
    frame.render_widget(
        Paragraph::new(visible),
        Rect::new(inner.x, inner.y, inner.width, content_height),
    );

    let footer_area = Rect::new(inner.x, inner.y + content_height, inner.width, 1);
    frame.render_widget(
        Paragraph::new(Line::styled("any key closes", dim_style)),
        footer_area,
    );
}

pub fn centered_popup_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w) / 2);
    let y = area.y + (area.height.saturating_sub(h) / 2);
    Rect::new(x, y, w, h)
}
