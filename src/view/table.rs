//! Tabular rendering of a JSON array of entities.

use serde_json::Value;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::error::EditorError;

pub const MIN_COLUMN_WIDTH: usize = 6;
pub const MAX_COLUMN_WIDTH: usize = 48;
/// Past this width, longer content only earns half a column per character.
pub const SOFT_COLUMN_WIDTH: usize = 24;
const WIDTH_SAMPLE_ROWS: usize = 64;

/// Column used for array elements that are not objects.
pub const SCALAR_COLUMN: &str = "(value)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableModel {
    pub columns: Vec<String>,
    /// One rendered cell per column, per row.
    pub rows: Vec<Vec<String>>,
    /// The row's `type` field, used for grouping.
    pub row_types: Vec<Option<String>>,
}

/// A labelled run of rows sharing the same `type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableGroup {
    pub label: String,
    pub rows: Vec<usize>,
}

impl TableModel {
    /// Build rows and columns from a parsed document.
    ///
    /// # Errors
    /// Fails unless `value` is an array.
    pub fn build(value: &Value) -> Result<Self, EditorError> {
        let Value::Array(items) = value else {
            return Err(EditorError::TableConstruction(format!(
                "document is {}, not an array",
                kind_name(value)
            )));
        };

        let mut columns: Vec<String> = Vec::new();
        for item in items {
            match item {
                Value::Object(map) => {
                    for key in map.keys() {
                        if !columns.iter().any(|c| c == key) {
                            columns.push(key.clone());
                        }
                    }
                }
                _ => {
                    if !columns.iter().any(|c| c == SCALAR_COLUMN) {
                        columns.push(SCALAR_COLUMN.to_string());
                    }
                }
            }
        }

        let rows = items
            .iter()
            .map(|item| {
                columns
                    .iter()
                    .map(|column| match item {
                        Value::Object(map) => map.get(column).map(cell_text).unwrap_or_default(),
                        other if column == SCALAR_COLUMN => cell_text(other),
                        _ => String::new(),
                    })
                    .collect()
            })
            .collect();
        let row_types = items
            .iter()
            .map(|item| item.get("type").and_then(Value::as_str).map(ToOwned::to_owned))
            .collect();

        Ok(Self {
            columns,
            rows,
            row_types,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows grouped by `type`, groups in first-appearance order.
    pub fn groups(&self) -> Vec<TableGroup> {
        let mut groups: Vec<TableGroup> = Vec::new();
        for (idx, ty) in self.row_types.iter().enumerate() {
            let label = ty.clone().unwrap_or_else(|| "(no type)".to_string());
            match groups.iter_mut().find(|g| g.label == label) {
                Some(group) => group.rows.push(idx),
                None => groups.push(TableGroup {
                    label,
                    rows: vec![idx],
                }),
            }
        }
        groups
    }

    /// Width estimate for one column from its header and sampled cells.
    pub fn estimate_width(&self, column: usize) -> usize {
        let header = self.columns.get(column).map_or(0, |c| display_width(c));
        let widest = self
            .rows
            .iter()
            .take(WIDTH_SAMPLE_ROWS)
            .filter_map(|row| row.get(column))
            .map(|cell| display_width(cell))
            .max()
            .unwrap_or(0)
            .max(header);
        bounded_width(widest)
    }
}

/// Clamp a content width into a column width with diminishing growth.
pub fn bounded_width(content: usize) -> usize {
    let grown = if content > SOFT_COLUMN_WIDTH {
        SOFT_COLUMN_WIDTH + (content - SOFT_COLUMN_WIDTH).div_ceil(2)
    } else {
        content
    };
    grown.clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
}

/// Display text of one cell. NGSI-LD properties show their unwrapped value.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Object(map)
            if map.get("type").and_then(Value::as_str) == Some("Property")
                && map.contains_key("value") =>
        {
            map.get("value").map(cell_text).unwrap_or_default()
        }
        other => other.to_string(),
    }
}

const fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Draw the table as box-drawing lines.
pub fn render_lines(model: &TableModel, widths: &[usize], grouped: bool) -> Vec<String> {
    if model.columns.is_empty() {
        return vec![format!("({} empty rows)", model.rows.len())];
    }
    let mut lines = Vec::new();
    if grouped {
        for group in model.groups() {
            lines.push(format!("{} ({})", group.label, group.rows.len()));
            render_rows(model, widths, &group.rows, &mut lines);
            lines.push(String::new());
        }
        lines.pop();
    } else {
        let all: Vec<usize> = (0..model.rows.len()).collect();
        render_rows(model, widths, &all, &mut lines);
    }
    lines
}

fn render_rows(model: &TableModel, widths: &[usize], rows: &[usize], lines: &mut Vec<String>) {
    lines.push(render_border(widths, '┌', '┬', '┐'));
    lines.push(render_row(&model.columns, widths));
    lines.push(render_border(widths, '├', '┼', '┤'));
    for &idx in rows {
        if let Some(row) = model.rows.get(idx) {
            lines.push(render_row(row, widths));
        }
    }
    lines.push(render_border(widths, '└', '┴', '┘'));
}

fn render_border(widths: &[usize], left: char, middle: char, right: char) -> String {
    let mut out = String::new();
    out.push(left);
    for (idx, width) in widths.iter().enumerate() {
        out.push_str(&"─".repeat(width + 2));
        if idx + 1 < widths.len() {
            out.push(middle);
        }
    }
    out.push(right);
    out
}

fn render_row(cells: &[String], widths: &[usize]) -> String {
    let mut out = String::new();
    out.push('│');
    for (idx, width) in widths.iter().enumerate() {
        let content = cells.get(idx).map_or("", String::as_str);
        let content = truncate_text(content, *width);
        let padding = width.saturating_sub(display_width(&content));
        out.push(' ');
        out.push_str(&content);
        out.push_str(&" ".repeat(padding));
        out.push_str(" │");
    }
    out
}

/// Cut `text` to `max_width` columns, marking the cut with an ellipsis.
fn truncate_text(text: &str, max_width: usize) -> String {
    let single_line: String = text.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();
    if display_width(&single_line) <= max_width {
        return single_line;
    }
    let mut out = String::new();
    let mut width = 0usize;
    for ch in single_line.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width + 1 > max_width {
            break;
        }
        out.push(ch);
        width += ch_width;
    }
    out.push('…');
    out
}

fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}
