//! Raw/table view state machine.
//!
//! The table is derived from the document text and never edited directly;
//! raw edits invalidate it and the next render rebuilds it.

mod table;

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::Value;

use crate::error::EditorError;

pub use table::{TableGroup, TableModel, cell_text};
use table::render_lines;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Raw,
    Table,
}

#[derive(Debug, Default)]
pub struct ViewModeController {
    mode: ViewMode,
    grouped: bool,
    table: Option<TableModel>,
    /// Widths the user set, keyed by column name; survive rebuilds of the
    /// same document, dropped on a full replace. Other columns are estimated
    /// on every build.
    widths: Vec<(String, usize)>,
    selected_rows: BTreeSet<usize>,
}

impl ViewModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn mode(&self) -> ViewMode {
        self.mode
    }

    pub const fn is_grouped(&self) -> bool {
        self.grouped
    }

    pub const fn table(&self) -> Option<&TableModel> {
        self.table.as_ref()
    }

    /// Switch to table mode for `text`.
    ///
    /// # Errors
    /// Returns [`EditorError::TableConstruction`] when `text` is not a JSON
    /// array; the controller is then in raw mode.
    pub fn enter_table(&mut self, text: &str) -> Result<(), EditorError> {
        match build(text) {
            Ok(model) => {
                self.table = Some(model);
                self.mode = ViewMode::Table;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, "staying in raw view");
                self.table = None;
                self.mode = ViewMode::Raw;
                Err(err)
            }
        }
    }

    pub fn enter_raw(&mut self) {
        self.mode = ViewMode::Raw;
        self.selected_rows.clear();
    }

    /// Flip grouping by `type`. Does not change the mode.
    pub const fn toggle_grouping(&mut self) -> bool {
        self.grouped = !self.grouped;
        self.grouped
    }

    /// The document was edited; drop the built table.
    pub fn invalidate(&mut self) {
        self.table = None;
    }

    /// The document was replaced wholesale; forget column widths too.
    pub fn replace_document(&mut self) {
        self.table = None;
        self.widths.clear();
        self.selected_rows.clear();
    }

    /// Rebuild an invalidated table while in table mode.
    ///
    /// # Errors
    /// Falls back to raw mode and returns the construction error when the
    /// document no longer parses as an array.
    pub fn refresh(&mut self, text: &str) -> Result<(), EditorError> {
        if self.mode == ViewMode::Table && self.table.is_none() {
            self.enter_table(text)?;
        }
        Ok(())
    }

    pub fn column_widths(&self) -> Vec<usize> {
        let Some(model) = &self.table else {
            return Vec::new();
        };
        model
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                self.widths
                    .iter()
                    .find(|(n, _)| n == name)
                    .map_or_else(|| model.estimate_width(idx), |(_, w)| *w)
            })
            .collect()
    }

    /// Widen or narrow a column, within the width bounds.
    pub fn resize_column(&mut self, column: usize, delta: isize) {
        let Some(name) = self.table.as_ref().and_then(|m| m.columns.get(column)).cloned() else {
            return;
        };
        let current = self.column_widths().get(column).copied().unwrap_or(0);
        let width = current
            .saturating_add_signed(delta)
            .clamp(table::MIN_COLUMN_WIDTH, table::MAX_COLUMN_WIDTH);
        match self.widths.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = width,
            None => self.widths.push((name, width)),
        }
    }

    pub fn toggle_row_selection(&mut self, row: usize) {
        if !self.selected_rows.remove(&row) {
            self.selected_rows.insert(row);
        }
    }

    pub const fn selected_rows(&self) -> &BTreeSet<usize> {
        &self.selected_rows
    }

    /// The table as text lines, empty outside table mode.
    pub fn lines(&self) -> Vec<String> {
        match (&self.table, self.mode) {
            (Some(model), ViewMode::Table) => {
                render_lines(model, &self.column_widths(), self.grouped)
            }
            _ => Vec::new(),
        }
    }
}

fn build(text: &str) -> Result<TableModel, EditorError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|err| EditorError::TableConstruction(format!("document does not parse: {err}")))?;
    TableModel::build(&value)
}
