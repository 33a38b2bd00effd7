use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::broker::BrokerLink;
use crate::editor::{EditorOptions, JsonEditor, Snippet, TextEditable};
use crate::workspace::{EditorId, Tab, WindowEvent, Workspace};

/// How long a banner stays up.
pub const TOAST_MS: u64 = 5_000;

/// Hash a byte slice for content comparison.
pub(super) fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    level: ToastLevel,
    message: String,
    expires_at: u64,
}

/// An attribute name being typed before the template is inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePrompt {
    pub snippet: Snippet,
    pub name: String,
}

/// The complete application state.
#[derive(Debug)]
pub struct Model {
    pub workspace: Workspace,
    /// Template for editors opened later.
    pub editor_options: EditorOptions,
    /// Milliseconds since the loop started; set before every update.
    pub now_ms: u64,
    pub terminal_size: (u16, u16),
    pub watch_enabled: bool,
    pub help_visible: bool,
    pub prompt: Option<AttributePrompt>,
    /// Column that `<` and `>` resize in table mode.
    pub table_column: usize,
    pub config_global_path: Option<PathBuf>,
    pub config_local_path: Option<PathBuf>,
    /// Where entity tabs load from and save to.
    pub broker: Option<BrokerLink>,
    pub should_quit: bool,
    pub(super) quit_confirmed: bool,
    pub(super) save_confirmed: bool,
    pub(super) disk_hashes: HashMap<EditorId, u64>,
    toast: Option<Toast>,
}

impl Model {
    pub fn new(editor_options: EditorOptions, terminal_size: (u16, u16)) -> Self {
        Self {
            editor_options,
            terminal_size,
            ..Self::default()
        }
    }

    /// Open `text` in a new tab.
    pub fn open_text(&mut self, title: impl Into<String>, path: Option<PathBuf>, text: &str) -> EditorId {
        let options = self.editor_options.clone().with_initial_value(text);
        let editor = JsonEditor::new(options);
        let summary = editor.report().map(crate::validate::ValidationReport::summary);
        let id = self.workspace.open(title, path, editor);
        if let Some(summary) = summary {
            tracing::debug!(id, %summary, "opened");
        }
        id
    }

    /// Read `path` into a new tab, or focus the tab that already has it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn open_file(&mut self, path: &Path) -> Result<EditorId> {
        if let Some(id) = self.workspace.find_by_path(path) {
            self.workspace.activate(id);
            return Ok(id);
        }
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let title = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let id = self.open_text(title, Some(path.to_path_buf()), &text);
        self.disk_hashes.insert(id, hash_bytes(&bytes));
        Ok(id)
    }

    /// Fetch an entity from the broker into a new tab, or focus the tab
    /// that already has it.
    ///
    /// # Errors
    /// Returns an error without a broker or when the fetch fails.
    pub fn open_entity(&mut self, entity_id: &str) -> Result<EditorId> {
        if let Some(id) = self
            .workspace
            .tabs()
            .iter()
            .find(|t| t.editor.entity_id() == Some(entity_id))
            .map(|t| t.id)
        {
            self.workspace.activate(id);
            return Ok(id);
        }
        let link = self.broker.as_ref().context("No broker configured")?;
        let value = link
            .fetch_entity(entity_id)
            .with_context(|| format!("Failed to load {entity_id}"))?;
        let mut editor = JsonEditor::new(self.editor_options.clone().with_entity_id(entity_id));
        editor.set_value(value);
        Ok(self.workspace.open(entity_id, None, editor))
    }

    /// Fetch the active tab's entity again. Unsaved edits are kept.
    ///
    /// # Errors
    /// Returns an error when the fetch fails.
    pub(super) fn reload_active_entity(&mut self) -> Result<bool> {
        let Some(tab) = self.workspace.active() else {
            return Ok(false);
        };
        let Some(entity_id) = tab.editor.entity_id().map(str::to_string) else {
            self.show_toast(ToastLevel::Info, "Not a broker entity");
            return Ok(false);
        };
        if tab.editor.is_dirty() {
            self.show_toast(ToastLevel::Warning, "Unsaved edits; save them before reloading");
            return Ok(false);
        }
        let link = self.broker.as_ref().context("No broker configured")?;
        let value = link
            .fetch_entity(&entity_id)
            .with_context(|| format!("Failed to load {entity_id}"))?;
        if let Some(editor) = self.active_editor_mut() {
            editor.set_value(value);
        }
        Ok(true)
    }

    /// Close a tab and forget its bookkeeping.
    pub fn close_tab(&mut self, id: EditorId) -> Option<Tab> {
        self.disk_hashes.remove(&id);
        self.workspace.close(id)
    }

    pub fn active_editor(&self) -> Option<&JsonEditor> {
        self.workspace.active().map(|t| &t.editor)
    }

    pub fn active_editor_mut(&mut self) -> Option<&mut JsonEditor> {
        self.workspace.active_mut().map(|t| &mut t.editor)
    }

    /// Whether any open tab has unsaved edits.
    pub fn has_unsaved(&self) -> bool {
        self.workspace.tabs().iter().any(|t| t.editor.is_dirty())
    }

    /// Rows available to the document body.
    pub fn body_height(&self) -> u16 {
        let (width, height) = self.terminal_size;
        crate::ui::body_area(self, ratatui::layout::Rect::new(0, 0, width, height)).height
    }

    /// Scroll the active tab so the cursor line is on screen.
    pub fn ensure_cursor_visible(&mut self) {
        let height = usize::from(self.body_height()).max(1);
        let Some(tab) = self.workspace.active_mut() else {
            return;
        };
        let line = tab.editor.buffer().cursor_line_column().line.saturating_sub(1);
        if line < tab.scroll {
            tab.scroll = line;
        } else if line >= tab.scroll + height {
            tab.scroll = line + 1 - height;
        }
    }

    /// Apply a terminal resize to every subscribed tab.
    pub(super) fn apply_resize(&mut self, width: u16, height: u16) {
        self.terminal_size = (width, height);
        for tab in self.workspace.subscribers_mut(WindowEvent::Resize) {
            let last = tab.editor.buffer().line_count().saturating_sub(1);
            tab.scroll = tab.scroll.min(last);
        }
        self.ensure_cursor_visible();
    }

    /// Advance editor timers and the banner. Returns whether anything
    /// visible changed.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        self.now_ms = now_ms;
        let mut changed = self.expire_toast(now_ms);
        let active = self.workspace.registry().active();
        for id in self.workspace.tick(now_ms) {
            changed = true;
            crate::perf::log_event("validate.debounced", format!("tab={id}"));
            if Some(id) == active {
                self.toast_report();
            }
        }
        changed
    }

    /// Banner for the active editor's latest report.
    pub(super) fn toast_report(&mut self) {
        let Some(report) = self.active_editor().and_then(JsonEditor::report) else {
            return;
        };
        let level = if !report.is_valid {
            ToastLevel::Error
        } else if report.warning.is_some() {
            ToastLevel::Warning
        } else {
            ToastLevel::Info
        };
        let summary = report.summary();
        self.show_toast(level, summary);
    }

    pub(super) fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: self.now_ms + TOAST_MS,
        });
    }

    pub(super) fn expire_toast(&mut self, now_ms: u64) -> bool {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.expires_at <= now_ms)
        {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, ToastLevel)> {
        self.toast
            .as_ref()
            .map(|toast| (toast.message.as_str(), toast.level))
    }

    /// Reload a tab whose file changed on disk. Unsaved edits are kept.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub(super) fn reload_from_disk(&mut self, path: &Path) -> Result<bool> {
        let Some(id) = self.workspace.find_by_path(path) else {
            return Ok(false);
        };
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let hash = hash_bytes(&bytes);
        if self.disk_hashes.get(&id) == Some(&hash) {
            return Ok(false);
        }
        let Some(tab) = self.workspace.get_mut(id) else {
            return Ok(false);
        };
        if tab.editor.is_dirty() {
            let title = tab.title.clone();
            self.show_toast(
                ToastLevel::Warning,
                format!("{title} changed on disk; keeping unsaved edits"),
            );
            return Ok(false);
        }
        tab.editor.set_value(String::from_utf8_lossy(&bytes).into_owned());
        self.disk_hashes.insert(id, hash);
        Ok(true)
    }

    /// Whether the file behind `id` changed since it was loaded or saved.
    pub(super) fn disk_changed(&self, id: EditorId, path: &Path) -> bool {
        let Some(known) = self.disk_hashes.get(&id) else {
            return false;
        };
        std::fs::read(path).is_ok_and(|bytes| hash_bytes(&bytes) != *known)
    }
}

// Implement Default for Model to allow std::mem::take
impl Default for Model {
    fn default() -> Self {
        Self {
            workspace: Workspace::new(),
            editor_options: EditorOptions::default(),
            now_ms: 0,
            terminal_size: (80, 24),
            watch_enabled: false,
            help_visible: false,
            prompt: None,
            table_column: 0,
            config_global_path: None,
            config_local_path: None,
            broker: None,
            should_quit: false,
            quit_confirmed: false,
            save_confirmed: false,
            disk_hashes: HashMap::new(),
            toast: None,
        }
    }
}
